//! Shared plumbing for the admin write services.

use std::sync::Arc;

use db::models::table::ContentTable;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use super::{
    events::{ChangeHub, ChangeOp, RowChange},
    form_validation::ValidationErrors,
    saga::{SagaError, WriteSaga},
    storage::{ObjectStorage, StorageError},
};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Saga(#[from] SagaError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("{0}")]
    Conflict(String),
}

impl AdminError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        AdminError::NotFound { entity, id }
    }
}

/// Database, object store and change hub every admin write needs.
#[derive(Clone)]
pub struct AdminContext {
    pub pool: SqlitePool,
    pub storage: Arc<dyn ObjectStorage>,
    pub changes: ChangeHub,
}

impl AdminContext {
    pub fn new(pool: SqlitePool, storage: Arc<dyn ObjectStorage>, changes: ChangeHub) -> Self {
        Self {
            pool,
            storage,
            changes,
        }
    }

    pub fn saga(&self, name: &'static str) -> WriteSaga<'_> {
        WriteSaga::new(name, &self.pool, self.storage.as_ref())
    }

    pub fn notify(&self, table: ContentTable, op: ChangeOp, id: Uuid) {
        self.changes.publish(RowChange::new(table, op, id));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use db::DBService;

    use super::*;
    use crate::services::storage::{ImageUpload, MemoryObjectStorage};

    pub async fn context() -> (AdminContext, Arc<MemoryObjectStorage>) {
        let db = DBService::new_in_memory().await.unwrap();
        let storage = Arc::new(MemoryObjectStorage::new());
        let ctx = AdminContext::new(db.pool, storage.clone(), ChangeHub::default());
        (ctx, storage)
    }

    pub fn png(name: &str) -> ImageUpload {
        ImageUpload::new(format!("{name}.png"), b"\x89PNG fake")
    }

    /// Makes `kind` statements on `table` fail for rows matching `when`.
    pub async fn block(pool: &SqlitePool, kind: &str, table: &str, when: &str) {
        let sql = format!(
            "CREATE TRIGGER block_{kind}_{table} BEFORE {kind} ON {table} WHEN {when} \
             BEGIN SELECT RAISE(ABORT, '{kind} on {table} blocked'); END"
        );
        sqlx::query(&sql).execute(pool).await.unwrap();
    }
}
