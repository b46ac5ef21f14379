//! Multi-step admin writes with compensating undo steps.
//!
//! Each completed step registers how to undo it. When a later step fails the
//! recorded compensations run newest first and the caller receives
//! [`SagaError::Aborted`] listing any compensation that itself failed.

use std::{fmt::Display, future::Future};

use bytes::Bytes;
use db::models::{
    post::{Post, PostTranslation, PostTranslationInput},
    post_category::{CategoryTranslationInput, PostCategory, PostCategoryTranslation},
    practice::{Practice, PracticeTranslation},
    service::{Service, ServiceTranslation},
    table::ContentTable,
    translation::LocalizedEntry,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::storage::{ImageUpload, ObjectStorage, object_key};

#[derive(Debug, Error)]
pub enum SagaError {
    #[error("{saga} failed at step '{step}': {cause}")]
    Aborted {
        saga: &'static str,
        step: &'static str,
        cause: String,
        compensation_failures: Vec<String>,
    },
}

impl SagaError {
    pub fn compensation_failures(&self) -> &[String] {
        match self {
            SagaError::Aborted {
                compensation_failures,
                ..
            } => compensation_failures,
        }
    }
}

/// Row state captured before an update, written back on abort.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Post(Post, Vec<PostTranslation>),
    Practice(Practice, Vec<PracticeTranslation>),
    Service(Service, Vec<ServiceTranslation>),
    Category(PostCategory, Vec<PostCategoryTranslation>),
}

impl Snapshot {
    pub fn describe(&self) -> String {
        match self {
            Snapshot::Post(p, _) => format!("post {}", p.id),
            Snapshot::Practice(p, _) => format!("practice {}", p.id),
            Snapshot::Service(s, _) => format!("service {}", s.id),
            Snapshot::Category(c, _) => format!("category {}", c.id),
        }
    }

    /// Writes the row and its translations back in one transaction.
    pub async fn restore(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        match self {
            Snapshot::Post(post, translations) => {
                Post::restore(&mut *tx, post).await?;
                let entries: Vec<PostTranslationInput> = translations
                    .iter()
                    .map(|t| PostTranslationInput {
                        locale: t.locale,
                        title: t.title.clone(),
                        excerpt: t.excerpt.clone(),
                        content: t.content.clone(),
                    })
                    .collect();
                PostTranslation::replace_for_post(&mut tx, post.id, &entries).await?;
            }
            Snapshot::Practice(practice, translations) => {
                Practice::restore(&mut *tx, practice).await?;
                let entries: Vec<LocalizedEntry> = translations
                    .iter()
                    .map(|t| LocalizedEntry {
                        locale: t.locale,
                        title: t.title.clone(),
                        slug: t.slug.clone(),
                        summary: t.summary.clone(),
                        content: t.content.clone(),
                    })
                    .collect();
                PracticeTranslation::replace_for_practice(&mut tx, practice.id, &entries).await?;
            }
            Snapshot::Service(service, translations) => {
                Service::restore(&mut *tx, service).await?;
                let entries: Vec<LocalizedEntry> = translations
                    .iter()
                    .map(|t| LocalizedEntry {
                        locale: t.locale,
                        title: t.title.clone(),
                        slug: t.slug.clone(),
                        summary: t.summary.clone(),
                        content: t.content.clone(),
                    })
                    .collect();
                ServiceTranslation::replace_for_service(&mut tx, service.id, &entries).await?;
            }
            Snapshot::Category(category, translations) => {
                PostCategory::update(
                    &mut *tx,
                    category.id,
                    &category.slug,
                    category.parent_id,
                    category.position,
                )
                .await?;
                let entries: Vec<CategoryTranslationInput> = translations
                    .iter()
                    .map(|t| CategoryTranslationInput {
                        locale: t.locale,
                        name: t.name.clone(),
                        slug: t.slug.clone(),
                    })
                    .collect();
                PostCategoryTranslation::replace_for_category(&mut tx, category.id, &entries)
                    .await?;
            }
        }
        tx.commit().await
    }
}

#[derive(Debug, Clone)]
pub enum Compensation {
    RemoveObject(String),
    DeleteRecord { table: ContentTable, id: Uuid },
    Restore(Box<Snapshot>),
}

impl Compensation {
    fn describe(&self) -> String {
        match self {
            Compensation::RemoveObject(key) => format!("remove object {key}"),
            Compensation::DeleteRecord { table, id } => format!("delete {table} row {id}"),
            Compensation::Restore(snapshot) => format!("restore {}", snapshot.describe()),
        }
    }
}

pub struct WriteSaga<'a> {
    name: &'static str,
    pool: &'a SqlitePool,
    storage: &'a dyn ObjectStorage,
    compensations: Vec<Compensation>,
    after_commit: Vec<String>,
    finished: bool,
}

impl<'a> WriteSaga<'a> {
    pub fn new(name: &'static str, pool: &'a SqlitePool, storage: &'a dyn ObjectStorage) -> Self {
        Self {
            name,
            pool,
            storage,
            compensations: Vec::new(),
            after_commit: Vec::new(),
            finished: false,
        }
    }

    pub fn pool(&self) -> &'a SqlitePool {
        self.pool
    }

    pub fn pending_compensations(&self) -> usize {
        self.compensations.len()
    }

    /// Runs one step. On failure every recorded compensation runs and the
    /// saga is finished.
    pub async fn step<T, E, F>(&mut self, step: &'static str, fut: F) -> Result<T, SagaError>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(err) => Err(self.abort(step, err).await),
        }
    }

    /// Uploads `image` under `bucket` and records its removal as the undo.
    pub async fn upload(
        &mut self,
        bucket: &str,
        image: &ImageUpload,
    ) -> Result<String, SagaError> {
        let bytes: Bytes = match image.decode() {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.abort("decode image", err).await),
        };
        let key = object_key(bucket, &image.file_name);
        let content_type = image.content_type();
        let storage = self.storage;
        self.step("upload image", storage.upload(&key, bytes, &content_type))
            .await?;
        self.compensations.push(Compensation::RemoveObject(key.clone()));
        Ok(key)
    }

    pub fn compensate_with(&mut self, compensation: Compensation) {
        self.compensations.push(compensation);
    }

    /// Removes `key` once the saga commits. Used for images replaced by an
    /// update, which must survive until the new row is in place.
    pub fn remove_after_commit(&mut self, key: impl Into<String>) {
        self.after_commit.push(key.into());
    }

    /// Undoes every completed step and returns the resulting error.
    pub async fn abort(&mut self, step: &'static str, cause: impl Display) -> SagaError {
        let cause = cause.to_string();
        warn!(saga = self.name, step, %cause, "Write failed, compensating");

        let mut compensation_failures = Vec::new();
        while let Some(compensation) = self.compensations.pop() {
            let description = compensation.describe();
            if let Err(e) = self.run(compensation).await {
                error!(saga = self.name, compensation = %description, error = %e, "Compensation failed");
                compensation_failures.push(format!("{description}: {e}"));
            }
        }
        self.after_commit.clear();
        self.finished = true;

        SagaError::Aborted {
            saga: self.name,
            step,
            cause,
            compensation_failures,
        }
    }

    async fn run(&self, compensation: Compensation) -> Result<(), String> {
        match compensation {
            Compensation::RemoveObject(key) => {
                self.storage.remove(&key).await.map_err(|e| e.to_string())
            }
            Compensation::DeleteRecord { table, id } => table
                .delete_by_id(self.pool, id)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Compensation::Restore(snapshot) => {
                snapshot.restore(self.pool).await.map_err(|e| e.to_string())
            }
        }
    }

    /// Drops the compensations and removes superseded objects best-effort.
    /// Superseded objects that cannot be removed are logged and left in
    /// place; the write itself already stands.
    pub async fn commit(mut self) {
        self.compensations.clear();
        self.finished = true;

        for key in std::mem::take(&mut self.after_commit) {
            if let Err(e) = self.storage.remove(&key).await {
                warn!(saga = self.name, key, error = %e, "Could not remove superseded object");
            }
        }
        info!(saga = self.name, "Write committed");
    }
}

impl Drop for WriteSaga<'_> {
    fn drop(&mut self) {
        if !self.finished && !self.compensations.is_empty() {
            error!(
                saga = self.name,
                pending = self.compensations.len(),
                "Saga dropped without commit or abort; completed steps were not undone"
            );
        }
    }
}
