//! Public news views: the grouped landing page, the archive, the flat post
//! list and single posts.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use db::models::{
    locale::Locale,
    post::{Post, PostStatus, PostTranslation},
    translation::pick_locale,
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    category_directory::{CategoryDirectory, CategoryDirectoryError, CategorySet},
    category_tree::{
        CategoryLabel, CategoryNode, CategoryTreeError, PostGroup, build_tree, direct_post_counts,
        group_by_root,
    },
    listing::{CategoryMatch, ListPage, ListQuery, Listing, Pagination},
    storage::ObjectStorage,
};

#[derive(Debug, Error)]
pub enum NewsError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    CategoryTree(#[from] CategoryTreeError),
    #[error(transparent)]
    Categories(#[from] CategoryDirectoryError),
}

/// A published post rendered in one locale.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct PostListing {
    pub id: Uuid,
    pub slug: String,
    /// Locale of the translation shown, which differs from the requested
    /// one when that translation is missing.
    pub locale: Locale,
    pub title: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub cover_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Listing for PostListing {
    fn title(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.excerpt.as_deref());
        fields.extend(self.category_name.as_deref());
        fields
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PostDetail {
    pub post: PostListing,
    pub content: Option<String>,
    pub available_locales: Vec<Locale>,
    /// Root first, ending at the post's own category.
    pub breadcrumbs: Vec<CategoryLabel>,
}

/// Joins posts with their translation for `locale` and their category name.
/// Posts without any translation are left out.
pub fn build_listings(
    posts: &[Post],
    translations: &[PostTranslation],
    labels: &HashMap<Uuid, CategoryLabel>,
    locale: Locale,
    storage: &dyn ObjectStorage,
) -> Vec<PostListing> {
    let mut by_post: HashMap<Uuid, Vec<&PostTranslation>> = HashMap::new();
    for t in translations {
        by_post.entry(t.post_id).or_default().push(t);
    }

    posts
        .iter()
        .filter_map(|post| {
            let entries = by_post.get(&post.id)?;
            let Some(translation) = pick_locale(entries, locale, |t| t.locale) else {
                warn!(post_id = %post.id, "Post has no translations");
                return None;
            };
            let label = post.category_id.and_then(|id| labels.get(&id));
            Some(PostListing {
                id: post.id,
                slug: post.slug.clone(),
                locale: translation.locale,
                title: translation.title.clone(),
                excerpt: translation.excerpt.clone(),
                category_id: post.category_id,
                category_name: label.map(|l| l.name.clone()),
                category_slug: label.map(|l| l.slug.clone()),
                cover_url: post.cover_image_key.as_deref().map(|k| storage.public_url(k)),
                published_at: post.published_at,
            })
        })
        .collect()
}

/// Everything the news pages of one locale are computed from.
pub struct NewsSnapshot {
    pub locale: Locale,
    pub posts: Vec<PostListing>,
    categories: Arc<CategorySet>,
    labels: HashMap<Uuid, CategoryLabel>,
}

impl NewsSnapshot {
    pub fn new(locale: Locale, posts: Vec<PostListing>, categories: Arc<CategorySet>) -> Self {
        let labels = categories.labels(locale);
        Self {
            locale,
            posts,
            categories,
            labels,
        }
    }

    /// Landing page: the filtered, sorted posts grouped by root category.
    pub fn grouped(&self, query: &ListQuery) -> Result<Vec<PostGroup<'_, PostListing>>, NewsError> {
        let posts = query.apply(&self.posts, &self.categories.forest, CategoryMatch::Hierarchical);
        Ok(group_by_root(
            &self.categories.forest,
            &self.labels,
            posts,
            self.locale,
        )?)
    }

    /// Selecting a category also selects everything below it.
    pub fn archive(&self, query: &ListQuery, pagination: Pagination) -> ListPage<'_, PostListing> {
        query.page(
            &self.posts,
            &self.categories.forest,
            CategoryMatch::Hierarchical,
            pagination,
        )
    }

    pub fn all_posts(&self, query: &ListQuery, pagination: Pagination) -> ListPage<'_, PostListing> {
        query.page(
            &self.posts,
            &self.categories.forest,
            CategoryMatch::Exact,
            pagination,
        )
    }

    pub fn category_tree(&self) -> Result<Vec<CategoryNode>, NewsError> {
        let counts = direct_post_counts(&self.posts);
        Ok(build_tree(&self.categories.categories, &self.labels, &counts)?)
    }
}

#[derive(Clone)]
pub struct NewsService {
    pool: SqlitePool,
    storage: Arc<dyn ObjectStorage>,
    categories: Arc<CategoryDirectory>,
}

impl NewsService {
    pub fn new(
        pool: SqlitePool,
        storage: Arc<dyn ObjectStorage>,
        categories: Arc<CategoryDirectory>,
    ) -> Self {
        Self {
            pool,
            storage,
            categories,
        }
    }

    pub async fn snapshot(&self, locale: Locale) -> Result<NewsSnapshot, NewsError> {
        let posts = Post::find_by_status(&self.pool, PostStatus::Published).await?;
        let translations =
            PostTranslation::find_by_post_status(&self.pool, PostStatus::Published).await?;
        let categories = self.categories.get().await?;
        let labels = categories.labels(locale);

        let listings = build_listings(&posts, &translations, &labels, locale, self.storage.as_ref());
        debug!(%locale, posts = listings.len(), "Loaded news snapshot");
        Ok(NewsSnapshot::new(locale, listings, categories))
    }

    /// Published posts only; drafts are invisible here.
    pub async fn post_by_slug(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<PostDetail>, NewsError> {
        let Some(post) = Post::find_by_slug(&self.pool, slug).await? else {
            return Ok(None);
        };
        if !post.is_published() {
            return Ok(None);
        }

        let translations = PostTranslation::find_by_post(&self.pool, post.id).await?;
        let categories = self.categories.get().await?;
        let labels = categories.labels(locale);

        let content = pick_locale(&translations, locale, |t| t.locale).and_then(|t| t.content.clone());
        let available_locales = translations.iter().map(|t| t.locale).collect();

        let breadcrumbs = match post.category_id {
            Some(leaf) => {
                let mut chain = categories.forest.ancestors(leaf)?;
                chain.reverse();
                chain.iter().filter_map(|id| labels.get(id).cloned()).collect()
            }
            None => Vec::new(),
        };

        let listing = build_listings(
            std::slice::from_ref(&post),
            &translations,
            &labels,
            locale,
            self.storage.as_ref(),
        )
        .into_iter()
        .next();

        Ok(listing.map(|post| PostDetail {
            post,
            content,
            available_locales,
            breadcrumbs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            post::{PostFields, PostTranslationInput},
            post_category::{CategoryTranslationInput, CreatePostCategory, PostCategory, PostCategoryTranslation},
        },
    };

    use super::*;
    use crate::services::{listing::SortKey, storage::MemoryObjectStorage};

    struct Fixture {
        service: NewsService,
        corporate: Uuid,
        mergers: Uuid,
        antitrust: Uuid,
    }

    async fn category(pool: &SqlitePool, slug: &str, parent: Option<Uuid>, names: &[(Locale, &str)]) -> Uuid {
        let id = Uuid::new_v4();
        let translations: Vec<CategoryTranslationInput> = names
            .iter()
            .map(|(locale, name)| CategoryTranslationInput {
                locale: *locale,
                name: name.to_string(),
                slug: format!("{slug}-{locale}"),
            })
            .collect();
        let data = CreatePostCategory {
            slug: slug.to_string(),
            parent_id: parent,
            position: None,
            translations,
        };
        PostCategory::create(pool, id, &data).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        PostCategoryTranslation::replace_for_category(&mut conn, id, &data.translations)
            .await
            .unwrap();
        id
    }

    async fn post(
        pool: &SqlitePool,
        slug: &str,
        category: Option<Uuid>,
        titles: &[(Locale, &str)],
        publish: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let fields = PostFields {
            slug: slug.to_string(),
            category_id: category,
            cover_image_key: Some(format!("posts/{slug}.jpg")),
        };
        Post::create(pool, id, &fields).await.unwrap();
        let entries: Vec<PostTranslationInput> = titles
            .iter()
            .map(|(locale, title)| PostTranslationInput {
                locale: *locale,
                title: title.to_string(),
                excerpt: Some(format!("About {title}")),
                content: Some(format!("<p>{title}</p>")),
            })
            .collect();
        let mut conn = pool.acquire().await.unwrap();
        PostTranslation::replace_for_post(&mut conn, id, &entries).await.unwrap();
        drop(conn);
        if publish {
            Post::set_status(pool, id, PostStatus::Published).await.unwrap();
        }
        id
    }

    async fn fixture() -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool.clone();
        let corporate = category(&pool, "corporate", None, &[(Locale::En, "Corporate"), (Locale::De, "Gesellschaftsrecht")]).await;
        let mergers = category(&pool, "mergers", Some(corporate), &[(Locale::En, "Mergers")]).await;
        let antitrust = category(&pool, "antitrust", Some(mergers), &[(Locale::En, "Antitrust")]).await;

        post(&pool, "merger-control", Some(antitrust), &[(Locale::En, "Merger control"), (Locale::De, "Fusionskontrolle")], true).await;
        post(&pool, "deal-review", Some(mergers), &[(Locale::En, "Deal review")], true).await;
        post(&pool, "general-news", None, &[(Locale::En, "Firm news")], true).await;
        post(&pool, "unfinished", Some(corporate), &[(Locale::En, "Draft thoughts")], false).await;

        let storage: Arc<dyn ObjectStorage> = Arc::new(MemoryObjectStorage::new());
        let categories = CategoryDirectory::new(pool.clone());
        Fixture {
            service: NewsService::new(pool, storage, categories),
            corporate,
            mergers,
            antitrust,
        }
    }

    #[tokio::test]
    async fn snapshot_contains_published_posts_only() {
        let f = fixture().await;
        let snapshot = f.service.snapshot(Locale::En).await.unwrap();
        assert_eq!(snapshot.posts.len(), 3);
        assert!(snapshot.posts.iter().all(|p| p.title != "Draft thoughts"));
    }

    #[tokio::test]
    async fn missing_translation_falls_back_to_default_locale() {
        let f = fixture().await;
        let snapshot = f.service.snapshot(Locale::De).await.unwrap();
        let merger = snapshot.posts.iter().find(|p| p.slug == "merger-control").unwrap();
        assert_eq!(merger.title, "Fusionskontrolle");
        assert_eq!(merger.locale, Locale::De);
        let deal = snapshot.posts.iter().find(|p| p.slug == "deal-review").unwrap();
        assert_eq!(deal.title, "Deal review");
        assert_eq!(deal.locale, Locale::En);
    }

    #[tokio::test]
    async fn grouped_view_places_deep_posts_under_their_root() {
        let f = fixture().await;
        let snapshot = f.service.snapshot(Locale::En).await.unwrap();
        let groups = snapshot.grouped(&ListQuery::default().sorted_by(SortKey::TitleAsc)).unwrap();

        assert_eq!(groups.len(), 2);
        let corporate = groups.iter().find(|g| g.root_id == Some(f.corporate)).unwrap();
        assert_eq!(corporate.name, "Corporate");
        assert_eq!(corporate.posts.len(), 2);
        let placeholder = groups.iter().find(|g| g.root_id.is_none()).unwrap();
        assert_eq!(placeholder.name, "Uncategorized");
        assert_eq!(placeholder.posts[0].slug, "general-news");
    }

    #[tokio::test]
    async fn archive_expands_selection_while_all_posts_matches_exactly() {
        let f = fixture().await;
        let snapshot = f.service.snapshot(Locale::En).await.unwrap();
        let query = ListQuery::default().with_categories(vec![f.mergers]);

        let archive = snapshot.archive(&query, Pagination::new(10));
        assert_eq!(archive.total, 2);

        let exact = snapshot.all_posts(&query, Pagination::new(10));
        assert_eq!(exact.total, 1);
        assert_eq!(exact.items[0].slug, "deal-review");
    }

    #[tokio::test]
    async fn category_tree_counts_descendant_posts() {
        let f = fixture().await;
        let snapshot = f.service.snapshot(Locale::En).await.unwrap();
        let tree = snapshot.category_tree().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, f.corporate);
        assert_eq!(tree[0].post_count, 2);
        assert_eq!(tree[0].children[0].children[0].id, f.antitrust);
        assert_eq!(tree[0].children[0].children[0].post_count, 1);
    }

    #[tokio::test]
    async fn post_detail_carries_breadcrumbs() {
        let f = fixture().await;
        let detail = f
            .service
            .post_by_slug("merger-control", Locale::En)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = detail.breadcrumbs.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Corporate", "Mergers", "Antitrust"]);
        assert_eq!(detail.content.as_deref(), Some("<p>Merger control</p>"));
        assert_eq!(detail.available_locales, vec![Locale::De, Locale::En]);
        assert_eq!(detail.post.cover_url.as_deref(), Some("memory://posts/merger-control.jpg"));

        assert!(f.service.post_by_slug("unfinished", Locale::En).await.unwrap().is_none());
        assert!(f.service.post_by_slug("nope", Locale::En).await.unwrap().is_none());
    }
}
