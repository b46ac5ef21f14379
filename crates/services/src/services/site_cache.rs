//! Rendered public responses, keyed by request path and query.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use db::models::table::ContentTable;
use moka::future::Cache;
use serde_json::Value;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use super::events::ChangeHub;

const MAX_ENTRIES: u64 = 10_000;

/// Public path prefixes whose responses are built from `table`.
pub fn paths_for_table(table: ContentTable) -> &'static [&'static str] {
    match table {
        ContentTable::Posts => &["/api/news", "/api/posts"],
        ContentTable::PostCategories => &["/api/news", "/api/posts", "/api/categories"],
        ContentTable::Practices => &["/api/practices", "/api/services"],
        ContentTable::Services => &["/api/services", "/api/practices"],
        ContentTable::NewsBanners => &["/api/banners"],
        ContentTable::TeamMembers => &["/api/team"],
        ContentTable::Profiles | ContentTable::AccessRequests => &[],
    }
}

#[derive(Clone)]
pub struct SiteCache {
    inner: Cache<String, Arc<Value>>,
    /// Bumped by every invalidation. A response whose build overlapped one
    /// is served but not stored.
    epoch: Arc<AtomicU64>,
}

impl SiteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn key(path: &str, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{path}?{q}"),
            None => path.to_string(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Value>> {
        self.inner.get(key).await
    }

    /// Returns the cached value or runs `init`, caching only successes.
    pub async fn get_or_try_insert<F, E>(&self, key: String, init: F) -> Result<Arc<Value>, E>
    where
        F: Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.inner.get(&key).await {
            debug!(key, "Cache hit");
            return Ok(hit);
        }
        let started = self.epoch.load(Ordering::SeqCst);
        let value = Arc::new(init.await?);
        if self.epoch.load(Ordering::SeqCst) == started {
            self.inner.insert(key, value.clone()).await;
        } else {
            debug!(key, "Invalidated while building, not caching");
        }
        Ok(value)
    }

    /// Drops every entry whose key starts with `prefix`. Returns how many.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let stale: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in &stale {
            self.inner.invalidate(key.as_str()).await;
        }
        stale.len()
    }

    pub async fn invalidate_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Drops every response built from `table`.
    pub async fn invalidate_table(&self, table: ContentTable) -> usize {
        let mut dropped = 0;
        for prefix in paths_for_table(table) {
            dropped += self.invalidate_prefix(prefix).await;
        }
        dropped
    }

    /// Invalidates the affected public paths after each committed write.
    /// Category changes are left to the category directory, which
    /// invalidates once its reload has settled.
    pub fn watch_changes(&self, hub: &ChangeHub) -> JoinHandle<()> {
        let cache = self.clone();
        let mut changes = hub.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.table == ContentTable::PostCategories => {}
                    Ok(change) => {
                        let dropped = cache.invalidate_table(change.table).await;
                        debug!(table = %change.table, op = ?change.op, dropped, "Cache invalidated");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Cache watcher lagged, clearing everything");
                        cache.invalidate_all().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Change hub closed, cache watcher stopping");
                        break;
                    }
                }
            }
        })
    }
}
