use db::models::{
    locale::Locale,
    practice::{Practice, PracticeFields, PracticeTranslation},
    table::ContentTable,
    translation::LocalizedEntry,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    admin::{AdminContext, AdminError},
    events::ChangeOp,
    form_validation::ValidationErrors,
    saga::{Compensation, Snapshot},
    storage::{ImageUpload, PRACTICE_BUCKET},
};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct PracticeForm {
    pub translations: Vec<LocalizedEntry>,
    #[serde(default)]
    pub position: i32,
    /// Required on create, optional on update.
    pub icon: Option<ImageUpload>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PracticeRecord {
    pub practice: Practice,
    pub translations: Vec<PracticeTranslation>,
}

/// Localized entries must cover every locale, each with a title and slug.
pub(crate) fn check_localized_entries(errors: &mut ValidationErrors, entries: &[LocalizedEntry]) {
    errors.reject_duplicate_locales("translations", entries.iter().map(|e| e.locale));
    errors.require_locales("translations", entries.iter().map(|e| e.locale));
    for entry in entries {
        let prefix = format!("translations.{}", entry.locale);
        errors.require_text(&format!("{prefix}.title"), &entry.title);
        errors.require_slug(&format!("{prefix}.slug"), &entry.slug);
    }
}

/// Canonical slug: the default-locale translation's slug.
pub(crate) fn canonical_slug(entries: &[LocalizedEntry]) -> String {
    entries
        .iter()
        .find(|e| e.locale == Locale::default())
        .or_else(|| entries.first())
        .map(|e| e.slug.trim().to_string())
        .unwrap_or_default()
}

fn validate(form: &PracticeForm) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_localized_entries(&mut errors, &form.translations);
    errors
}

async fn write_translations(
    pool: &SqlitePool,
    id: Uuid,
    entries: &[LocalizedEntry],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    PracticeTranslation::replace_for_practice(&mut tx, id, entries).await?;
    tx.commit().await
}

#[derive(Clone)]
pub struct PracticeAdmin {
    ctx: AdminContext,
}

impl PracticeAdmin {
    pub fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> Result<Vec<PracticeRecord>, AdminError> {
        let practices = Practice::find_all(&self.ctx.pool).await?;
        let mut translations = PracticeTranslation::find_all(&self.ctx.pool).await?;
        Ok(practices
            .into_iter()
            .map(|practice| {
                let (mine, rest): (Vec<_>, Vec<_>) = translations
                    .drain(..)
                    .partition(|t| t.practice_id == practice.id);
                translations = rest;
                PracticeRecord {
                    practice,
                    translations: mine,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<PracticeRecord, AdminError> {
        let practice = Practice::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("practice", id))?;
        let translations = PracticeTranslation::find_by_practice(&self.ctx.pool, id).await?;
        Ok(PracticeRecord {
            practice,
            translations,
        })
    }

    /// Upload icon and cover, insert the practice, then write translations.
    pub async fn create(&self, form: PracticeForm) -> Result<PracticeRecord, AdminError> {
        let mut errors = validate(&form);
        let (Some(icon), Some(image)) = (&form.icon, &form.image) else {
            if form.icon.is_none() {
                errors.add("icon", "is required");
            }
            if form.image.is_none() {
                errors.add("image", "is required");
            }
            return Err(errors.into());
        };
        errors.into_result()?;

        let pool = &self.ctx.pool;
        let id = Uuid::new_v4();
        let mut saga = self.ctx.saga("practice.create");
        let icon_key = saga.upload(PRACTICE_BUCKET, icon).await?;
        let image_key = saga.upload(PRACTICE_BUCKET, image).await?;

        let fields = PracticeFields {
            slug: canonical_slug(&form.translations),
            icon_key,
            image_key,
            position: form.position,
        };
        saga.step("insert practice", Practice::create(pool, id, &fields))
            .await?;
        saga.compensate_with(Compensation::DeleteRecord {
            table: ContentTable::Practices,
            id,
        });
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(practice_id = %id, slug = %fields.slug, "Practice created");
        self.ctx.notify(ContentTable::Practices, ChangeOp::Insert, id);
        self.get(id).await
    }

    /// Replaces translations and, when given, the images. Superseded images
    /// are removed only after the update has committed.
    pub async fn update(&self, id: Uuid, form: PracticeForm) -> Result<PracticeRecord, AdminError> {
        validate(&form).into_result()?;
        let before = self.get(id).await?;
        let pool = &self.ctx.pool;

        let mut saga = self.ctx.saga("practice.update");
        let icon_key = match &form.icon {
            Some(icon) => {
                let key = saga.upload(PRACTICE_BUCKET, icon).await?;
                saga.remove_after_commit(before.practice.icon_key.clone());
                key
            }
            None => before.practice.icon_key.clone(),
        };
        let image_key = match &form.image {
            Some(image) => {
                let key = saga.upload(PRACTICE_BUCKET, image).await?;
                saga.remove_after_commit(before.practice.image_key.clone());
                key
            }
            None => before.practice.image_key.clone(),
        };

        let fields = PracticeFields {
            slug: canonical_slug(&form.translations),
            icon_key,
            image_key,
            position: form.position,
        };
        let updated = saga
            .step("update practice", Practice::update(pool, id, &fields))
            .await?;
        if updated.is_none() {
            saga.abort("update practice", "practice disappeared").await;
            return Err(AdminError::not_found("practice", id));
        }
        saga.compensate_with(Compensation::Restore(Box::new(Snapshot::Practice(
            before.practice,
            before.translations,
        ))));
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(practice_id = %id, "Practice updated");
        self.ctx.notify(ContentTable::Practices, ChangeOp::Update, id);
        self.get(id).await
    }

    /// Deletes the row (translations cascade) and then its images.
    pub async fn delete(&self, id: Uuid) -> Result<(), AdminError> {
        let before = self.get(id).await?;
        let mut saga = self.ctx.saga("practice.delete");
        saga.step(
            "delete practice",
            ContentTable::Practices.delete_by_id(&self.ctx.pool, id),
        )
        .await?;
        saga.remove_after_commit(before.practice.icon_key);
        saga.remove_after_commit(before.practice.image_key);
        saga.commit().await;

        info!(practice_id = %id, "Practice deleted");
        self.ctx.notify(ContentTable::Practices, ChangeOp::Delete, id);
        Ok(())
    }
}
