pub mod error;
pub mod routes;

use std::sync::Arc;

use db::DBService;
use services::services::{
    admin::AdminContext,
    category_directory::CategoryDirectory,
    config::Config,
    directory::DirectoryService,
    events::{ChangeHub, DraftCounter},
    news::NewsService,
    revalidation::{RevalidationClient, RevalidationToken},
    site_cache::SiteCache,
    storage::{LocalObjectStorage, ObjectStorage},
};
use tracing::info;

/// Everything a request handler reaches for, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: Arc<Config>,
    storage: Arc<dyn ObjectStorage>,
    changes: ChangeHub,
    categories: Arc<CategoryDirectory>,
    drafts: Arc<DraftCounter>,
    cache: SiteCache,
    token: RevalidationToken,
    frontend: Option<RevalidationClient>,
}

impl AppState {
    /// Opens the database and object store from `config`, then starts the
    /// background watchers that follow the change hub.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = DBService::new(&config.database_url).await?;
        let storage: Arc<dyn ObjectStorage> = Arc::new(LocalObjectStorage::new(
            config.storage_root.clone(),
            config.public_base_url.clone(),
        ));
        tokio::fs::create_dir_all(&config.storage_root).await?;
        Self::assemble(db, storage, config).await
    }

    pub async fn assemble(
        db: DBService,
        storage: Arc<dyn ObjectStorage>,
        config: Config,
    ) -> anyhow::Result<Self> {
        let changes = ChangeHub::default();
        let cache = SiteCache::new(config.cache_ttl());
        cache.watch_changes(&changes);
        let categories = CategoryDirectory::new(db.pool.clone());
        categories.watch_changes(&changes, cache.clone());
        let drafts = Arc::new(DraftCounter::spawn(db.pool.clone(), &changes).await?);

        let token = RevalidationToken::new(config.revalidate_secret.clone());
        let frontend = match &config.frontend_revalidate_url {
            Some(url) if !url.trim().is_empty() => {
                Some(RevalidationClient::new(url.trim(), token.clone())?)
            }
            _ => None,
        };
        info!(
            revalidate_endpoint = token.is_configured(),
            frontend_revalidation = frontend.is_some(),
            "Application state ready"
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            storage,
            changes,
            categories,
            drafts,
            cache,
            token,
            frontend,
        })
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn changes(&self) -> &ChangeHub {
        &self.changes
    }

    pub fn drafts(&self) -> &DraftCounter {
        &self.drafts
    }

    pub fn cache(&self) -> &SiteCache {
        &self.cache
    }

    pub fn token(&self) -> &RevalidationToken {
        &self.token
    }

    pub fn frontend(&self) -> Option<&RevalidationClient> {
        self.frontend.as_ref()
    }

    pub fn admin(&self) -> AdminContext {
        AdminContext::new(
            self.db.pool.clone(),
            self.storage.clone(),
            self.changes.clone(),
        )
    }

    pub fn news(&self) -> NewsService {
        NewsService::new(
            self.db.pool.clone(),
            self.storage.clone(),
            self.categories.clone(),
        )
    }

    pub fn directory(&self) -> DirectoryService {
        DirectoryService::new(self.db.pool.clone(), self.storage.clone())
    }
}
