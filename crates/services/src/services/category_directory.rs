//! Process-wide copy of the category hierarchy, reloaded when an admin write
//! touches `post_categories`.

use std::{collections::HashMap, sync::Arc};

use db::models::{
    locale::Locale,
    post_category::{PostCategory, PostCategoryTranslation},
    table::ContentTable,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    category_tree::{CategoryForest, CategoryLabel, labels_for_locale},
    events::ChangeHub,
    loader::{LoadState, Loader, RetryPolicy},
    site_cache::SiteCache,
};

#[derive(Debug, Clone, Error)]
pub enum CategoryDirectoryError {
    #[error("category list unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug)]
pub struct CategorySet {
    pub categories: Vec<PostCategory>,
    pub translations: Vec<PostCategoryTranslation>,
    pub forest: CategoryForest,
}

impl CategorySet {
    pub async fn fetch(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let categories = PostCategory::find_all(pool).await?;
        let translations = PostCategoryTranslation::find_all(pool).await?;
        let forest = CategoryForest::from_categories(&categories);
        Ok(Self {
            categories,
            translations,
            forest,
        })
    }

    pub fn labels(&self, locale: Locale) -> HashMap<Uuid, CategoryLabel> {
        labels_for_locale(&self.translations, locale)
    }

    pub fn translations_of(&self, id: Uuid) -> Vec<PostCategoryTranslation> {
        self.translations
            .iter()
            .filter(|t| t.category_id == id)
            .cloned()
            .collect()
    }
}

/// Lock contention and pool exhaustion clear up on their own.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code == "5" || code == "6"),
        _ => false,
    }
}

pub struct CategoryDirectory {
    pool: SqlitePool,
    loader: Loader<Arc<CategorySet>>,
    retry: RetryPolicy,
}

impl CategoryDirectory {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            pool,
            loader: Loader::new("categories"),
            retry: RetryPolicy::default(),
        })
    }

    pub fn state(&self) -> LoadState<Arc<CategorySet>> {
        self.loader.state()
    }

    pub async fn reload(&self) -> bool {
        let pool = &self.pool;
        self.loader
            .load_with_retry(
                self.retry,
                move || async move { CategorySet::fetch(pool).await.map(Arc::new) },
                is_transient,
            )
            .await
    }

    /// The loaded set, loading it first when nothing is loaded yet.
    pub async fn get(&self) -> Result<Arc<CategorySet>, CategoryDirectoryError> {
        if let LoadState::Success(set) = self.loader.state() {
            return Ok(set);
        }
        if !self.loader.state().is_loading() {
            self.reload().await;
        }

        let mut updates = self.loader.subscribe();
        let settled = updates
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|e| CategoryDirectoryError::Unavailable(e.to_string()))?
            .clone();
        match settled {
            LoadState::Success(set) => Ok(set),
            LoadState::Error(reason) => Err(CategoryDirectoryError::Unavailable(reason)),
            LoadState::Idle | LoadState::Loading => Err(CategoryDirectoryError::Unavailable(
                "load did not start".to_string(),
            )),
        }
    }

    /// Reloads whenever `post_categories` changes, then drops the cached
    /// responses built from the previous set. Invalidating only after the
    /// reload keeps a rebuild from caching the old hierarchy.
    pub fn watch_changes(self: &Arc<Self>, hub: &ChangeHub, cache: SiteCache) -> JoinHandle<()> {
        let directory = Arc::clone(self);
        let mut changes = hub.subscribe();
        tokio::spawn(async move {
            loop {
                let lagged = match changes.recv().await {
                    Ok(change) if change.table == ContentTable::PostCategories => {
                        info!(id = %change.id, op = %change.op, "Category changed, reloading");
                        false
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Category directory lagged, reloading");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                directory.reload().await;
                if lagged {
                    cache.invalidate_all().await;
                } else {
                    cache.invalidate_table(ContentTable::PostCategories).await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use db::{
        DBService,
        models::post_category::{CategoryTranslationInput, CreatePostCategory},
    };

    use super::*;
    use crate::services::events::{ChangeOp, RowChange};

    async fn insert_category(pool: &SqlitePool, slug: &str, parent: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let data = CreatePostCategory {
            slug: slug.to_string(),
            parent_id: parent,
            position: None,
            translations: vec![CategoryTranslationInput {
                locale: Locale::En,
                name: slug.to_uppercase(),
                slug: slug.to_string(),
            }],
        };
        PostCategory::create(pool, id, &data).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        PostCategoryTranslation::replace_for_category(&mut conn, id, &data.translations)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn get_loads_on_first_use() {
        let db = DBService::new_in_memory().await.unwrap();
        let root = insert_category(&db.pool, "corporate", None).await;
        let child = insert_category(&db.pool, "mergers", Some(root)).await;

        let directory = CategoryDirectory::new(db.pool.clone());
        assert!(matches!(directory.state(), LoadState::Idle));

        let set = directory.get().await.unwrap();
        assert_eq!(set.categories.len(), 2);
        assert_eq!(set.forest.resolve_root(child).unwrap(), root);
        assert_eq!(set.labels(Locale::Fr)[&child].name, "MERGERS");
    }

    #[tokio::test]
    async fn change_events_trigger_reload() {
        let db = DBService::new_in_memory().await.unwrap();
        let hub = ChangeHub::default();
        let directory = CategoryDirectory::new(db.pool.clone());
        directory.get().await.unwrap();
        let cache = SiteCache::new(Duration::from_secs(60));
        cache
            .get_or_try_insert::<_, ()>("/api/categories".into(), async {
                Ok(serde_json::json!([]))
            })
            .await
            .unwrap();
        let task = directory.watch_changes(&hub, cache.clone());

        let mut states = directory.loader.subscribe();
        states.mark_unchanged();
        let id = insert_category(&db.pool, "tax", None).await;
        hub.publish(RowChange::new(ContentTable::PostCategories, ChangeOp::Insert, id));

        tokio::time::timeout(Duration::from_secs(2), async {
            states
                .wait_for(|s| s.data().is_some_and(|set| set.categories.len() == 1))
                .await
                .unwrap();
            while cache.get("/api/categories").await.is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        task.abort();
    }
}
