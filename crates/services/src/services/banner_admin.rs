use db::models::{
    locale::Locale,
    news_banner::{BannerFields, NewsBanner},
    table::ContentTable,
};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    admin::{AdminContext, AdminError},
    events::ChangeOp,
    form_validation::ValidationErrors,
    storage::{BANNER_BUCKET, ImageUpload},
};

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct BannerForm {
    pub locale: Locale,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Required on create.
    pub image: Option<ImageUpload>,
}

impl BannerForm {
    fn link(&self) -> Option<String> {
        self.link_url
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
    }

    fn validate(&self, creating: bool) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if creating && self.image.is_none() {
            errors.add("image", "is required");
        }
        if let Some(link) = self.link() {
            errors.check_link("link_url", &link);
        }
        errors.into_result()
    }
}

#[derive(Clone)]
pub struct BannerAdmin {
    ctx: AdminContext,
}

impl BannerAdmin {
    pub fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> Result<Vec<NewsBanner>, AdminError> {
        Ok(NewsBanner::find_all(&self.ctx.pool).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<NewsBanner, AdminError> {
        NewsBanner::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("banner", id))
    }

    pub async fn create(&self, form: BannerForm) -> Result<NewsBanner, AdminError> {
        form.validate(true)?;
        let Some(image) = &form.image else {
            return Err(AdminError::Conflict("banner image missing".to_string()));
        };

        let id = Uuid::new_v4();
        let mut saga = self.ctx.saga("banner.create");
        let image_key = saga.upload(BANNER_BUCKET, image).await?;
        let fields = BannerFields {
            locale: form.locale,
            image_key,
            link_url: form.link(),
            position: form.position,
            is_active: form.is_active,
        };
        let banner = saga
            .step("insert banner", NewsBanner::create(&self.ctx.pool, id, &fields))
            .await?;
        saga.commit().await;

        info!(banner_id = %id, locale = %form.locale, "Banner created");
        self.ctx.notify(ContentTable::NewsBanners, ChangeOp::Insert, id);
        Ok(banner)
    }

    pub async fn update(&self, id: Uuid, form: BannerForm) -> Result<NewsBanner, AdminError> {
        form.validate(false)?;
        let before = self.get(id).await?;

        let mut saga = self.ctx.saga("banner.update");
        let image_key = match &form.image {
            Some(image) => {
                let key = saga.upload(BANNER_BUCKET, image).await?;
                saga.remove_after_commit(before.image_key.clone());
                key
            }
            None => before.image_key.clone(),
        };
        let fields = BannerFields {
            locale: form.locale,
            image_key,
            link_url: form.link(),
            position: form.position,
            is_active: form.is_active,
        };
        let updated = saga
            .step("update banner", NewsBanner::update(&self.ctx.pool, id, &fields))
            .await?;
        let Some(banner) = updated else {
            saga.abort("update banner", "banner disappeared").await;
            return Err(AdminError::not_found("banner", id));
        };
        saga.commit().await;

        info!(banner_id = %id, "Banner updated");
        self.ctx.notify(ContentTable::NewsBanners, ChangeOp::Update, id);
        Ok(banner)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AdminError> {
        let before = self.get(id).await?;
        let mut saga = self.ctx.saga("banner.delete");
        saga.step(
            "delete banner",
            ContentTable::NewsBanners.delete_by_id(&self.ctx.pool, id),
        )
        .await?;
        saga.remove_after_commit(before.image_key);
        saga.commit().await;

        info!(banner_id = %id, "Banner deleted");
        self.ctx.notify(ContentTable::NewsBanners, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::admin::test_support::{block, context, png};

    fn form(link: Option<&str>, image: bool) -> BannerForm {
        BannerForm {
            locale: Locale::De,
            link_url: link.map(str::to_string),
            position: 0,
            is_active: true,
            image: image.then(|| png("banner")),
        }
    }

    #[tokio::test]
    async fn rejects_missing_image_and_relative_link() {
        let (ctx, _) = context().await;
        let admin = BannerAdmin::new(ctx);
        let Err(AdminError::Validation(errors)) = admin.create(form(Some("/news"), false)).await
        else {
            panic!("expected validation errors");
        };
        assert!(errors.has("image"));
        assert!(errors.has("link_url"));
    }

    #[tokio::test]
    async fn blank_link_is_stored_as_none() {
        let (ctx, storage) = context().await;
        let admin = BannerAdmin::new(ctx);
        let banner = admin.create(form(Some("  "), true)).await.unwrap();
        assert!(banner.link_url.is_none());
        assert!(storage.keys()[0].starts_with("banners/"));
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_image() {
        let (ctx, storage) = context().await;
        block(&ctx.pool, "INSERT", "news_banners", "1").await;
        let admin = BannerAdmin::new(ctx);
        let err = admin
            .create(form(Some("https://example.com"), true))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Saga(_)));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn update_without_image_keeps_existing_one() {
        let (ctx, storage) = context().await;
        let admin = BannerAdmin::new(ctx);
        let banner = admin.create(form(None, true)).await.unwrap();

        let mut change = form(Some("https://example.com/offer"), false);
        change.is_active = false;
        let updated = admin.update(banner.id, change).await.unwrap();
        assert_eq!(updated.image_key, banner.image_key);
        assert!(!updated.is_active);
        assert_eq!(storage.len(), 1);

        admin.delete(banner.id).await.unwrap();
        assert!(storage.is_empty());
    }
}
