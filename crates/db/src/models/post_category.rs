use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::locale::Locale;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct PostCategory {
    pub id: Uuid,
    pub parent_id: Option<Uuid>, // None for a root category
    pub slug: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct PostCategoryTranslation {
    pub category_id: Uuid,
    pub locale: Locale,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CategoryTranslationInput {
    pub locale: Locale,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePostCategory {
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub position: Option<i32>,
    pub translations: Vec<CategoryTranslationInput>,
}

impl PostCategory {
    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PostCategory>(
            r#"SELECT id, parent_id, slug, position, created_at
               FROM post_categories
               ORDER BY position ASC, slug ASC"#,
        )
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostCategory>(
            r#"SELECT id, parent_id, slug, position, created_at
               FROM post_categories
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreatePostCategory,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PostCategory>(
            r#"INSERT INTO post_categories (id, parent_id, slug, position, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, parent_id, slug, position, created_at"#,
        )
        .bind(id)
        .bind(data.parent_id)
        .bind(&data.slug)
        .bind(data.position.unwrap_or(0))
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        slug: &str,
        parent_id: Option<Uuid>,
        position: i32,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PostCategory>(
            r#"UPDATE post_categories
               SET slug = $2, parent_id = $3, position = $4
               WHERE id = $1
               RETURNING id, parent_id, slug, position, created_at"#,
        )
        .bind(id)
        .bind(slug)
        .bind(parent_id)
        .bind(position)
        .fetch_optional(executor)
        .await
    }

    /// Re-parents the direct children of `id` onto `new_parent` so deleting a
    /// middle node keeps its subtree attached.
    pub async fn reparent_children<'e, E>(
        executor: E,
        id: Uuid,
        new_parent: Option<Uuid>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE post_categories SET parent_id = $2 WHERE parent_id = $1")
            .bind(id)
            .bind(new_parent)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl PostCategoryTranslation {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostCategoryTranslation>(
            r#"SELECT category_id, locale, name, slug
               FROM post_category_translations"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_category(
        pool: &SqlitePool,
        category_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostCategoryTranslation>(
            r#"SELECT category_id, locale, name, slug
               FROM post_category_translations
               WHERE category_id = $1
               ORDER BY locale"#,
        )
        .bind(category_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes every translation of `category_id` and inserts `entries`.
    /// Callers run this inside a transaction.
    pub async fn replace_for_category(
        conn: &mut SqliteConnection,
        category_id: Uuid,
        entries: &[CategoryTranslationInput],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM post_category_translations WHERE category_id = $1")
            .bind(category_id)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"INSERT INTO post_category_translations (category_id, locale, name, slug)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(category_id)
            .bind(entry.locale)
            .bind(&entry.name)
            .bind(&entry.slug)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
