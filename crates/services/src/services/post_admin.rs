use db::models::{
    post::{Post, PostFields, PostStatus, PostTranslation, PostTranslationInput},
    post_category::PostCategory,
    table::ContentTable,
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
    storage::{ImageUpload, POST_BUCKET},
};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct PostForm {
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub translations: Vec<PostTranslationInput>,
    pub cover: Option<ImageUpload>,
    /// Drops the current cover on update when no new one is sent.
    #[serde(default)]
    pub remove_cover: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PostRecord {
    pub post: Post,
    pub translations: Vec<PostTranslation>,
}

async fn write_translations(
    pool: &SqlitePool,
    id: Uuid,
    entries: &[PostTranslationInput],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    PostTranslation::replace_for_post(&mut tx, id, entries).await?;
    tx.commit().await
}

#[derive(Clone)]
pub struct PostAdmin {
    ctx: AdminContext,
}

impl PostAdmin {
    pub fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    async fn validate(&self, form: &PostForm) -> Result<(), AdminError> {
        let mut errors = ValidationErrors::new();
        errors.require_slug("slug", &form.slug);
        errors.reject_duplicate_locales("translations", form.translations.iter().map(|t| t.locale));
        errors.require_locales("translations", form.translations.iter().map(|t| t.locale));
        for t in &form.translations {
            errors.require_text(&format!("translations.{}.title", t.locale), &t.title);
        }
        if let Some(category_id) = form.category_id {
            if PostCategory::find_by_id(&self.ctx.pool, category_id).await?.is_none() {
                errors.add("category_id", "does not exist");
            }
        }
        Ok(errors.into_result()?)
    }

    pub async fn list(&self, status: Option<PostStatus>) -> Result<Vec<PostRecord>, AdminError> {
        let posts = match status {
            Some(status) => Post::find_by_status(&self.ctx.pool, status).await?,
            None => Post::find_all(&self.ctx.pool).await?,
        };
        let translations = PostTranslation::find_all(&self.ctx.pool).await?;
        Ok(posts
            .into_iter()
            .map(|post| PostRecord {
                translations: translations
                    .iter()
                    .filter(|t| t.post_id == post.id)
                    .cloned()
                    .collect(),
                post,
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<PostRecord, AdminError> {
        let post = Post::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("post", id))?;
        let translations = PostTranslation::find_by_post(&self.ctx.pool, id).await?;
        Ok(PostRecord { post, translations })
    }

    pub async fn draft_count(&self) -> Result<i64, AdminError> {
        Ok(Post::count_by_status(&self.ctx.pool, PostStatus::Draft).await?)
    }

    /// New posts always start as drafts.
    pub async fn create_draft(&self, form: PostForm) -> Result<PostRecord, AdminError> {
        self.validate(&form).await?;
        let pool = &self.ctx.pool;
        let id = Uuid::new_v4();

        let mut saga = self.ctx.saga("post.create");
        let cover_image_key = match &form.cover {
            Some(cover) => Some(saga.upload(POST_BUCKET, cover).await?),
            None => None,
        };
        let fields = PostFields {
            slug: form.slug.trim().to_string(),
            category_id: form.category_id,
            cover_image_key,
        };
        saga.step("insert post", Post::create(pool, id, &fields))
            .await?;
        saga.compensate_with(Compensation::DeleteRecord {
            table: ContentTable::Posts,
            id,
        });
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(post_id = %id, slug = %fields.slug, "Draft created");
        self.ctx.notify(ContentTable::Posts, ChangeOp::Insert, id);
        self.get(id).await
    }

    pub async fn update(&self, id: Uuid, form: PostForm) -> Result<PostRecord, AdminError> {
        self.validate(&form).await?;
        let before = self.get(id).await?;
        let pool = &self.ctx.pool;

        let mut saga = self.ctx.saga("post.update");
        let cover_image_key = match (&form.cover, form.remove_cover) {
            (Some(cover), _) => {
                let key = saga.upload(POST_BUCKET, cover).await?;
                if let Some(old) = &before.post.cover_image_key {
                    saga.remove_after_commit(old.clone());
                }
                Some(key)
            }
            (None, true) => {
                if let Some(old) = &before.post.cover_image_key {
                    saga.remove_after_commit(old.clone());
                }
                None
            }
            (None, false) => before.post.cover_image_key.clone(),
        };
        let fields = PostFields {
            slug: form.slug.trim().to_string(),
            category_id: form.category_id,
            cover_image_key,
        };

        let updated = saga
            .step("update post", Post::update(pool, id, &fields))
            .await?;
        if updated.is_none() {
            saga.abort("update post", "post disappeared").await;
            return Err(AdminError::not_found("post", id));
        }
        saga.compensate_with(Compensation::Restore(Box::new(Snapshot::Post(
            before.post,
            before.translations,
        ))));
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(post_id = %id, "Post updated");
        self.ctx.notify(ContentTable::Posts, ChangeOp::Update, id);
        self.get(id).await
    }

    pub async fn set_status(&self, id: Uuid, status: PostStatus) -> Result<PostRecord, AdminError> {
        Post::set_status(&self.ctx.pool, id, status)
            .await?
            .ok_or_else(|| AdminError::not_found("post", id))?;
        info!(post_id = %id, %status, "Post status changed");
        self.ctx.notify(ContentTable::Posts, ChangeOp::Update, id);
        self.get(id).await
    }

    pub async fn publish(&self, id: Uuid) -> Result<PostRecord, AdminError> {
        self.set_status(id, PostStatus::Published).await
    }

    pub async fn unpublish(&self, id: Uuid) -> Result<PostRecord, AdminError> {
        self.set_status(id, PostStatus::Draft).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AdminError> {
        let before = self.get(id).await?;
        let mut saga = self.ctx.saga("post.delete");
        saga.step("delete post", ContentTable::Posts.delete_by_id(&self.ctx.pool, id))
            .await?;
        if let Some(cover) = before.post.cover_image_key {
            saga.remove_after_commit(cover);
        }
        saga.commit().await;

        info!(post_id = %id, "Post deleted");
        self.ctx.notify(ContentTable::Posts, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::models::locale::Locale;

    use super::*;
    use crate::services::admin::test_support::{block, context, png};

    fn form(slug: &str) -> PostForm {
        titled(slug, "Update")
    }

    fn titled(slug: &str, title: &str) -> PostForm {
        PostForm {
            slug: slug.to_string(),
            category_id: None,
            translations: Locale::ALL
                .iter()
                .map(|l| PostTranslationInput {
                    locale: *l,
                    title: format!("{title} {l}"),
                    excerpt: None,
                    content: Some("<p>body</p>".into()),
                })
                .collect(),
            cover: None,
            remove_cover: false,
        }
    }

    #[tokio::test]
    async fn validation_reports_slug_titles_and_category() {
        let (ctx, _) = context().await;
        let admin = PostAdmin::new(ctx);
        let mut bad = form("Bad slug");
        bad.translations[1].title = " ".into();
        bad.category_id = Some(Uuid::new_v4());

        let Err(AdminError::Validation(errors)) = admin.create_draft(bad).await else {
            panic!("expected validation errors");
        };
        assert!(errors.has("slug"));
        assert!(errors.has("translations.de.title"));
        assert!(errors.has("category_id"));
    }

    #[tokio::test]
    async fn draft_publish_cycle_updates_counts_and_notifies() {
        let (ctx, _) = context().await;
        let mut changes = ctx.changes.subscribe();
        let admin = PostAdmin::new(ctx);

        let draft = admin.create_draft(form("quarterly-update")).await.unwrap();
        assert_eq!(draft.post.status, PostStatus::Draft);
        assert_eq!(admin.draft_count().await.unwrap(), 1);

        let published = admin.publish(draft.post.id).await.unwrap();
        assert!(published.post.published_at.is_some());
        assert_eq!(admin.draft_count().await.unwrap(), 0);

        admin.unpublish(draft.post.id).await.unwrap();
        assert_eq!(admin.list(Some(PostStatus::Draft)).await.unwrap().len(), 1);

        let ops: Vec<ChangeOp> = (0..3).map(|_| changes.try_recv().unwrap().op).collect();
        assert_eq!(ops, vec![ChangeOp::Insert, ChangeOp::Update, ChangeOp::Update]);
    }

    #[tokio::test]
    async fn failed_update_restores_post_and_keeps_old_cover() {
        let (ctx, storage) = context().await;
        let admin = PostAdmin::new(ctx.clone());
        let mut first = form("client-alert");
        first.cover = Some(png("cover"));
        let created = admin.create_draft(first).await.unwrap();
        let old_cover = created.post.cover_image_key.clone().unwrap();

        block(&ctx.pool, "INSERT", "post_translations", "NEW.title LIKE 'Revised%'").await;
        let mut second = titled("client-alert-v2", "Revised");
        second.cover = Some(png("cover-v2"));
        assert!(matches!(
            admin.update(created.post.id, second).await,
            Err(AdminError::Saga(_))
        ));

        let after = admin.get(created.post.id).await.unwrap();
        assert_eq!(after.post.slug, "client-alert");
        assert_eq!(after.post.cover_image_key.as_deref(), Some(old_cover.as_str()));
        assert_eq!(storage.keys(), vec![old_cover]);
    }

    #[tokio::test]
    async fn remove_cover_clears_key_and_object() {
        let (ctx, storage) = context().await;
        let admin = PostAdmin::new(ctx);
        let mut first = form("with-cover");
        first.cover = Some(png("cover"));
        let created = admin.create_draft(first).await.unwrap();

        let mut second = form("with-cover");
        second.remove_cover = true;
        let updated = admin.update(created.post.id, second).await.unwrap();
        assert!(updated.post.cover_image_key.is_none());
        assert!(storage.is_empty());
    }
}
