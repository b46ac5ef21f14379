//! Practice and service directories, banners and the team page.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use db::models::{
    locale::Locale,
    news_banner::NewsBanner,
    practice::{Practice, PracticeTranslation},
    service::{Service, ServiceTranslation},
    team::{TeamMember, TeamTranslation},
    translation::pick_locale,
};
use serde::Serialize;
use sqlx::SqlitePool;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    listing::{Listing, ListQuery, filter_by_text, sort_listings},
    storage::ObjectStorage,
};

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct PracticeListing {
    pub id: Uuid,
    /// Slug of the translation shown.
    pub slug: String,
    pub locale: Locale,
    pub title: String,
    pub summary: Option<String>,
    pub icon_url: String,
    pub image_url: String,
    pub position: i32,
}

impl Listing for PracticeListing {
    fn title(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.summary.as_deref());
        fields
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn category_id(&self) -> Option<Uuid> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct ServiceListing {
    pub id: Uuid,
    pub practice_id: Option<Uuid>,
    pub slug: String,
    pub locale: Locale,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PracticeDetail {
    pub practice: PracticeListing,
    pub content: Option<String>,
    pub services: Vec<ServiceListing>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct BannerView {
    pub id: Uuid,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TeamMemberView {
    pub id: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

fn group_by<K, T, F>(items: Vec<T>, key: F) -> HashMap<K, Vec<T>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut map: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        map.entry(key(&item)).or_default().push(item);
    }
    map
}

#[derive(Clone)]
pub struct DirectoryService {
    pool: SqlitePool,
    storage: Arc<dyn ObjectStorage>,
}

impl DirectoryService {
    pub fn new(pool: SqlitePool, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { pool, storage }
    }

    fn practice_listing(
        &self,
        practice: &Practice,
        translations: &[PracticeTranslation],
        locale: Locale,
    ) -> Option<PracticeListing> {
        let t = pick_locale(translations, locale, |t| t.locale)?;
        Some(PracticeListing {
            id: practice.id,
            slug: t.slug.clone(),
            locale: t.locale,
            title: t.title.clone(),
            summary: t.summary.clone(),
            icon_url: self.storage.public_url(&practice.icon_key),
            image_url: self.storage.public_url(&practice.image_key),
            position: practice.position,
        })
    }

    /// Practices in display order, narrowed and re-sorted by `query` when it
    /// carries a search text or an explicit sort.
    pub async fn practices(
        &self,
        locale: Locale,
        query: Option<&ListQuery>,
    ) -> Result<Vec<PracticeListing>, sqlx::Error> {
        let practices = Practice::find_all(&self.pool).await?;
        let translations = group_by(PracticeTranslation::find_all(&self.pool).await?, |t| {
            t.practice_id
        });

        let listings: Vec<PracticeListing> = practices
            .iter()
            .filter_map(|p| {
                let entries = translations.get(&p.id)?;
                self.practice_listing(p, entries, locale)
            })
            .collect();

        let Some(query) = query else {
            return Ok(listings);
        };
        let mut matched = filter_by_text(&listings, &query.search);
        sort_listings(&mut matched, query.sort);
        Ok(matched.into_iter().cloned().collect())
    }

    /// Looks the practice up by its translated slug in `locale`, then by its
    /// canonical slug.
    pub async fn practice_detail(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<PracticeDetail>, sqlx::Error> {
        let practice = match PracticeTranslation::find_by_localized_slug(&self.pool, locale, slug)
            .await?
        {
            Some(t) => Practice::find_by_id(&self.pool, t.practice_id).await?,
            None => Practice::find_by_slug(&self.pool, slug).await?,
        };
        let Some(practice) = practice else {
            return Ok(None);
        };

        let translations = PracticeTranslation::find_by_practice(&self.pool, practice.id).await?;
        let Some(listing) = self.practice_listing(&practice, &translations, locale) else {
            return Ok(None);
        };
        let content = pick_locale(&translations, locale, |t| t.locale).and_then(|t| t.content.clone());
        let services = self.services(locale, Some(practice.id)).await?;

        Ok(Some(PracticeDetail {
            practice: listing,
            content,
            services,
        }))
    }

    pub async fn services(
        &self,
        locale: Locale,
        practice_id: Option<Uuid>,
    ) -> Result<Vec<ServiceListing>, sqlx::Error> {
        let services = match practice_id {
            Some(id) => Service::find_by_practice(&self.pool, id).await?,
            None => Service::find_all(&self.pool).await?,
        };
        let translations = group_by(ServiceTranslation::find_all(&self.pool).await?, |t| {
            t.service_id
        });

        Ok(services
            .iter()
            .filter_map(|s| {
                let entries = translations.get(&s.id)?;
                let t = pick_locale(entries, locale, |t| t.locale)?;
                Some(ServiceListing {
                    id: s.id,
                    practice_id: s.practice_id,
                    slug: t.slug.clone(),
                    locale: t.locale,
                    title: t.title.clone(),
                    summary: t.summary.clone(),
                    content: t.content.clone(),
                    position: s.position,
                })
            })
            .collect())
    }

    pub async fn banners(&self, locale: Locale) -> Result<Vec<BannerView>, sqlx::Error> {
        let banners = NewsBanner::find_active_by_locale(&self.pool, locale).await?;
        Ok(banners
            .into_iter()
            .map(|b| BannerView {
                id: b.id,
                image_url: self.storage.public_url(&b.image_key),
                link_url: b.link_url,
                position: b.position,
            })
            .collect())
    }

    pub async fn team(&self, locale: Locale) -> Result<Vec<TeamMemberView>, sqlx::Error> {
        let members = TeamMember::find_all(&self.pool).await?;
        let translations = group_by(TeamTranslation::find_all(&self.pool).await?, |t| t.member_id);

        Ok(members
            .iter()
            .filter_map(|m| {
                let t = pick_locale(translations.get(&m.id)?, locale, |t| t.locale)?;
                Some(TeamMemberView {
                    id: m.id,
                    name: t.name.clone(),
                    title: t.title.clone(),
                    bio: t.bio.clone(),
                    photo_url: m.photo_key.as_deref().map(|k| self.storage.public_url(k)),
                })
            })
            .collect())
    }
}
