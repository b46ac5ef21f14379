use db::models::{
    locale::Locale,
    post_category::{
        CategoryTranslationInput, CreatePostCategory, PostCategory, PostCategoryTranslation,
    },
    table::ContentTable,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    admin::{AdminContext, AdminError},
    category_directory::CategorySet,
    category_tree::CategoryForest,
    events::ChangeOp,
    form_validation::ValidationErrors,
    saga::{Compensation, Snapshot},
};

const CYCLE_MESSAGE: &str = "would make the category its own ancestor";

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CategoryForm {
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: i32,
    pub translations: Vec<CategoryTranslationInput>,
}

impl CategoryForm {
    fn canonical_slug(&self) -> String {
        self.translations
            .iter()
            .find(|t| t.locale == Locale::default())
            .or_else(|| self.translations.first())
            .map(|t| t.slug.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CategoryRecord {
    pub category: PostCategory,
    pub translations: Vec<PostCategoryTranslation>,
}

async fn write_translations(
    pool: &SqlitePool,
    id: Uuid,
    entries: &[CategoryTranslationInput],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    PostCategoryTranslation::replace_for_category(&mut tx, id, entries).await?;
    tx.commit().await
}

enum ParentWrite {
    Updated,
    Missing,
    Cycle,
}

/// Updates the row and re-checks the new parent chain in one transaction.
/// The write comes first so the transaction holds the write lock while the
/// links are read; a concurrent re-parent sees this one or fails.
async fn update_checked(
    pool: &SqlitePool,
    id: Uuid,
    slug: &str,
    parent_id: Option<Uuid>,
    position: i32,
) -> Result<ParentWrite, sqlx::Error> {
    let mut tx = pool.begin().await?;
    if PostCategory::update(&mut *tx, id, slug, parent_id, position)
        .await?
        .is_none()
    {
        return Ok(ParentWrite::Missing);
    }
    if parent_id.is_some() {
        let forest = CategoryForest::from_categories(&PostCategory::find_all(&mut *tx).await?);
        if forest.resolve_root(id).is_err() {
            return Ok(ParentWrite::Cycle);
        }
    }
    tx.commit().await?;
    Ok(ParentWrite::Updated)
}

#[derive(Clone)]
pub struct CategoryAdmin {
    ctx: AdminContext,
}

impl CategoryAdmin {
    pub fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    /// `editing` is the category being updated, if any; its new parent must
    /// not sit inside its own subtree.
    async fn validate(&self, form: &CategoryForm, editing: Option<Uuid>) -> Result<(), AdminError> {
        let mut errors = ValidationErrors::new();
        errors.reject_duplicate_locales("translations", form.translations.iter().map(|t| t.locale));
        errors.require_locales("translations", form.translations.iter().map(|t| t.locale));
        for t in &form.translations {
            let prefix = format!("translations.{}", t.locale);
            errors.require_text(&format!("{prefix}.name"), &t.name);
            errors.require_slug(&format!("{prefix}.slug"), &t.slug);
        }

        if let Some(parent_id) = form.parent_id {
            let set = CategorySet::fetch(&self.ctx.pool).await?;
            if !set.forest.contains(parent_id) {
                errors.add("parent_id", "does not exist");
            } else if let Some(id) = editing {
                if set.forest.would_create_cycle(id, parent_id) {
                    errors.add("parent_id", CYCLE_MESSAGE);
                }
            }
        }
        Ok(errors.into_result()?)
    }

    pub async fn list(&self) -> Result<Vec<CategoryRecord>, AdminError> {
        let set = CategorySet::fetch(&self.ctx.pool).await?;
        Ok(set
            .categories
            .iter()
            .map(|category| CategoryRecord {
                translations: set.translations_of(category.id),
                category: category.clone(),
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryRecord, AdminError> {
        let category = PostCategory::find_by_id(&self.ctx.pool, id)
            .await?
            .ok_or_else(|| AdminError::not_found("category", id))?;
        let translations = PostCategoryTranslation::find_by_category(&self.ctx.pool, id).await?;
        Ok(CategoryRecord {
            category,
            translations,
        })
    }

    pub async fn create(&self, form: CategoryForm) -> Result<CategoryRecord, AdminError> {
        self.validate(&form, None).await?;
        let pool = &self.ctx.pool;
        let id = Uuid::new_v4();
        let data = CreatePostCategory {
            slug: form.canonical_slug(),
            parent_id: form.parent_id,
            position: Some(form.position),
            translations: form.translations.clone(),
        };

        let mut saga = self.ctx.saga("category.create");
        saga.step("insert category", PostCategory::create(pool, id, &data))
            .await?;
        saga.compensate_with(Compensation::DeleteRecord {
            table: ContentTable::PostCategories,
            id,
        });
        saga.step(
            "write translations",
            write_translations(pool, id, &data.translations),
        )
        .await?;
        saga.commit().await;

        info!(category_id = %id, slug = %data.slug, parent_id = ?data.parent_id, "Category created");
        self.ctx.notify(ContentTable::PostCategories, ChangeOp::Insert, id);
        self.get(id).await
    }

    pub async fn update(&self, id: Uuid, form: CategoryForm) -> Result<CategoryRecord, AdminError> {
        let before = self.get(id).await?;
        self.validate(&form, Some(id)).await?;
        let pool = &self.ctx.pool;
        let slug = form.canonical_slug();

        let mut saga = self.ctx.saga("category.update");
        let written = saga
            .step(
                "update category",
                update_checked(pool, id, &slug, form.parent_id, form.position),
            )
            .await?;
        match written {
            ParentWrite::Updated => {}
            ParentWrite::Missing => {
                saga.abort("update category", "category disappeared").await;
                return Err(AdminError::not_found("category", id));
            }
            ParentWrite::Cycle => {
                saga.abort("update category", "parent chain loops").await;
                let mut errors = ValidationErrors::new();
                errors.add("parent_id", CYCLE_MESSAGE);
                return Err(errors.into());
            }
        }
        saga.compensate_with(Compensation::Restore(Box::new(Snapshot::Category(
            before.category,
            before.translations,
        ))));
        saga.step(
            "write translations",
            write_translations(pool, id, &form.translations),
        )
        .await?;
        saga.commit().await;

        info!(category_id = %id, "Category updated");
        self.ctx.notify(ContentTable::PostCategories, ChangeOp::Update, id);
        self.get(id).await
    }

    /// Children move up to the deleted node's parent; posts filed directly
    /// under it become uncategorized.
    pub async fn delete(&self, id: Uuid) -> Result<(), AdminError> {
        let before = self.get(id).await?;
        let mut tx = self.ctx.pool.begin().await?;
        let moved =
            PostCategory::reparent_children(&mut *tx, id, before.category.parent_id).await?;
        ContentTable::PostCategories
            .delete_by_id(&mut *tx, id)
            .await?;
        tx.commit().await?;

        info!(category_id = %id, children_moved = moved, "Category deleted");
        self.ctx.notify(ContentTable::PostCategories, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::models::post::{Post, PostFields};

    use super::*;
    use crate::services::admin::test_support::{block, context};

    fn form(name: &str, parent_id: Option<Uuid>) -> CategoryForm {
        CategoryForm {
            parent_id,
            position: 0,
            translations: Locale::ALL
                .iter()
                .map(|l| CategoryTranslationInput {
                    locale: *l,
                    name: format!("{name} {l}"),
                    slug: format!("{}-{l}", name.to_lowercase()),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn rejects_unknown_parent_and_missing_names() {
        let (ctx, _) = context().await;
        let admin = CategoryAdmin::new(ctx);
        let mut bad = form("Tax", Some(Uuid::new_v4()));
        bad.translations[2].name = String::new();

        let Err(AdminError::Validation(errors)) = admin.create(bad).await else {
            panic!("expected validation errors");
        };
        assert!(errors.has("parent_id"));
        assert!(errors.has("translations.fr.name"));
    }

    #[tokio::test]
    async fn update_cannot_move_category_under_its_descendant() {
        let (ctx, _) = context().await;
        let admin = CategoryAdmin::new(ctx);
        let root = admin.create(form("Corporate", None)).await.unwrap();
        let child = admin
            .create(form("Mergers", Some(root.category.id)))
            .await
            .unwrap();

        let Err(AdminError::Validation(errors)) = admin
            .update(root.category.id, form("Corporate", Some(child.category.id)))
            .await
        else {
            panic!("expected cycle rejection");
        };
        assert!(errors.has("parent_id"));

        let Err(AdminError::Validation(errors)) = admin
            .update(root.category.id, form("Corporate", Some(root.category.id)))
            .await
        else {
            panic!("expected self-parent rejection");
        };
        assert!(errors.has("parent_id"));
    }

    #[tokio::test]
    async fn concurrent_cross_reparenting_never_persists_a_cycle() {
        let (ctx, _) = context().await;
        let pool = ctx.pool.clone();
        let admin = CategoryAdmin::new(ctx);
        let a = admin.create(form("Tax", None)).await.unwrap();
        let b = admin.create(form("Labour", None)).await.unwrap();

        let (ra, rb) = tokio::join!(
            admin.update(a.category.id, form("Tax", Some(b.category.id))),
            admin.update(b.category.id, form("Labour", Some(a.category.id)))
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
        let Some(AdminError::Validation(errors)) = ra.err().or(rb.err()) else {
            panic!("expected the second re-parent to be rejected");
        };
        assert!(errors.has("parent_id"));

        let set = CategorySet::fetch(&pool).await.unwrap();
        set.forest.validate().unwrap();
    }

    #[tokio::test]
    async fn delete_reattaches_children_and_uncategorizes_posts() {
        let (ctx, _) = context().await;
        let pool = ctx.pool.clone();
        let admin = CategoryAdmin::new(ctx);
        let root = admin.create(form("Corporate", None)).await.unwrap();
        let middle = admin
            .create(form("Mergers", Some(root.category.id)))
            .await
            .unwrap();
        let leaf = admin
            .create(form("Antitrust", Some(middle.category.id)))
            .await
            .unwrap();
        let post = Post::create(
            &pool,
            Uuid::new_v4(),
            &PostFields {
                slug: "deal-review".into(),
                category_id: Some(middle.category.id),
                cover_image_key: None,
            },
        )
        .await
        .unwrap();

        admin.delete(middle.category.id).await.unwrap();

        let leaf = admin.get(leaf.category.id).await.unwrap();
        assert_eq!(leaf.category.parent_id, Some(root.category.id));
        let post = Post::find_by_id(&pool, post.id).await.unwrap().unwrap();
        assert_eq!(post.category_id, None);
    }

    #[tokio::test]
    async fn failed_translation_write_restores_previous_parent() {
        let (ctx, _) = context().await;
        let admin = CategoryAdmin::new(ctx.clone());
        let a = admin.create(form("Tax", None)).await.unwrap();
        let b = admin.create(form("Labour", None)).await.unwrap();

        block(
            &ctx.pool,
            "INSERT",
            "post_category_translations",
            "NEW.name LIKE 'Employment%'",
        )
        .await;
        let mut moved = form("Employment", Some(a.category.id));
        moved.translations.iter_mut().for_each(|t| t.slug = format!("labour-{}", t.locale));
        assert!(matches!(
            admin.update(b.category.id, moved).await,
            Err(AdminError::Saga(_))
        ));

        let after = admin.get(b.category.id).await.unwrap();
        assert_eq!(after.category.parent_id, None);
        assert_eq!(after.translations.len(), 3);
        assert!(after.translations.iter().all(|t| t.name.starts_with("Labour")));
    }
}
