//! Row change notifications emitted after committed admin writes.

use db::models::{post::Post, post::PostStatus, table::ContentTable};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::{Display, EnumString};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct RowChange {
    pub table: ContentTable,
    pub op: ChangeOp,
    pub id: Uuid,
}

impl RowChange {
    pub fn new(table: ContentTable, op: ChangeOp, id: Uuid) -> Self {
        Self { table, op, id }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<RowChange>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, change: RowChange) {
        // No subscribers is not an error; the change is simply unobserved.
        let receivers = self.sender.send(change).unwrap_or(0);
        debug!(table = %change.table, op = %change.op, id = %change.id, receivers, "Row change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RowChange> {
        self.sender.subscribe()
    }
}

/// Number of draft posts, kept current from `posts` change events.
pub struct DraftCounter {
    count: watch::Receiver<i64>,
    task: JoinHandle<()>,
}

impl DraftCounter {
    pub async fn spawn(pool: SqlitePool, hub: &ChangeHub) -> Result<Self, sqlx::Error> {
        let mut changes = hub.subscribe();
        let initial = Post::count_by_status(&pool, PostStatus::Draft).await?;
        let (sender, count) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.table == ContentTable::Posts => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Draft counter lagged behind change events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match Post::count_by_status(&pool, PostStatus::Draft).await {
                    Ok(drafts) => {
                        sender.send_if_modified(|current| {
                            let changed = *current != drafts;
                            *current = drafts;
                            changed
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to recount drafts"),
                }
            }
            info!("Draft counter stopped");
        });

        Ok(Self { count, task })
    }

    pub fn current(&self) -> i64 {
        *self.count.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.count.clone()
    }
}

impl Drop for DraftCounter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use db::{DBService, models::post::PostFields};

    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let hub = ChangeHub::new(4);
        hub.publish(RowChange::new(ContentTable::Posts, ChangeOp::Insert, Uuid::new_v4()));
    }

    #[tokio::test]
    async fn subscribers_receive_changes() {
        let hub = ChangeHub::default();
        let mut rx = hub.subscribe();
        let id = Uuid::new_v4();
        hub.publish(RowChange::new(ContentTable::Practices, ChangeOp::Update, id));
        let change = rx.recv().await.unwrap();
        assert_eq!(change.id, id);
        assert_eq!(change.op, ChangeOp::Update);
    }

    #[tokio::test]
    async fn draft_counter_follows_post_changes() {
        let db = DBService::new_in_memory().await.unwrap();
        let hub = ChangeHub::default();
        let counter = DraftCounter::spawn(db.pool.clone(), &hub).await.unwrap();
        assert_eq!(counter.current(), 0);

        let mut updates = counter.subscribe();
        let fields = PostFields {
            slug: "draft-one".into(),
            category_id: None,
            cover_image_key: None,
        };
        let post = Post::create(&db.pool, Uuid::new_v4(), &fields).await.unwrap();
        hub.publish(RowChange::new(ContentTable::Posts, ChangeOp::Insert, post.id));

        tokio::time::timeout(Duration::from_secs(2), updates.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.current(), 1);
    }
}
