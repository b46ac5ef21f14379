use db::models::{
    practice::Practice,
    service::{Service, ServiceFields, ServiceTranslation},
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
    practice_admin::{canonical_slug, check_localized_entries},
    saga::{Compensation, Snapshot},
};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ServiceForm {
    pub practice_id: Option<Uuid>,
    #[serde(default)]
    pub position: i32,
    pub translations: Vec<LocalizedEntry>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ServiceRecord {
    pub service: Service,
    pub translations: Vec<ServiceTranslation>,
}

async fn write_translations(
    pool: &SqlitePool,
    id: Uuid,
    entries: &[LocalizedEntry],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    ServiceTranslation::replace_for_service(&mut tx, id, entries).await?;
    tx.commit().await
}

#[derive(Clone)]
pub struct ServiceAdmin {
    ctx: AdminContext,
}

impl ServiceAdmin {
    pub fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    async fn validate(&self, form: &ServiceForm) -> Result<(), AdminError> {
        let mut errors = ValidationErrors::new();
        check_localized_entries(&mut errors, &form.translations);
        if let Some(practice_id) = form.practice_id {
            if Practice::find_by_id(&self.ctx.pool, practice_id).await?.is_none() {
                errors.add("practice_id", "does not exist");
            }
        }
        Ok(errors.into_result()?)
    }

    pub async fn list(&self, practice_id: Option<Uuid>) -> Result<Vec<ServiceRecord>, AdminError> {
        let services = match practice_id {
            Some(id) => Service::find_by_practice(&self.ctx.pool, id).await?,
            None => Service::find_all(&self.ctx.pool).await?,
        };
        let translations = ServiceTranslation::find_all(&self.ctx.pool).await?;
        Ok(services
            .into_iter()
            .map(|service| ServiceRecord {
                translations: translations
                    .iter()
                    .filter(|t| t.service_id == service.id)
                    .cloned()
                    .collect(),
                service,
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<ServiceRecord, AdminError> {
        let service = Service::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("service", id))?;
        let translations = ServiceTranslation::find_by_service(&self.ctx.pool, id).await?;
        Ok(ServiceRecord {
            service,
            translations,
        })
    }

    pub async fn create(&self, form: ServiceForm) -> Result<ServiceRecord, AdminError> {
        self.validate(&form).await?;
        let pool = &self.ctx.pool;
        let id = Uuid::new_v4();
        let fields = ServiceFields {
            practice_id: form.practice_id,
            slug: canonical_slug(&form.translations),
            position: form.position,
        };

        let mut saga = self.ctx.saga("service.create");
        saga.step("insert service", Service::create(pool, id, &fields))
            .await?;
        saga.compensate_with(Compensation::DeleteRecord {
            table: ContentTable::Services,
            id,
        });
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(service_id = %id, slug = %fields.slug, "Service created");
        self.ctx.notify(ContentTable::Services, ChangeOp::Insert, id);
        self.get(id).await
    }

    pub async fn update(&self, id: Uuid, form: ServiceForm) -> Result<ServiceRecord, AdminError> {
        self.validate(&form).await?;
        let before = self.get(id).await?;
        let pool = &self.ctx.pool;
        let fields = ServiceFields {
            practice_id: form.practice_id,
            slug: canonical_slug(&form.translations),
            position: form.position,
        };

        let mut saga = self.ctx.saga("service.update");
        saga.step("update service", Service::update(pool, id, &fields))
            .await?;
        saga.compensate_with(Compensation::Restore(Box::new(Snapshot::Service(
            before.service,
            before.translations,
        ))));
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(service_id = %id, "Service updated");
        self.ctx.notify(ContentTable::Services, ChangeOp::Update, id);
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AdminError> {
        let removed = ContentTable::Services
            .delete_by_id(&self.ctx.pool, id)
            .await?;
        if removed == 0 {
            return Err(AdminError::not_found("service", id));
        }
        info!(service_id = %id, "Service deleted");
        self.ctx.notify(ContentTable::Services, ChangeOp::Delete, id);
        Ok(())
    }
}
