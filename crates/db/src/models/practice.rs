use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{locale::Locale, translation::LocalizedEntry};

/// A practice area ("Corporate", "Litigation", ...) with an icon and a cover
/// image held in object storage.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Practice {
    pub id: Uuid,
    pub slug: String,
    pub icon_key: String,
    pub image_key: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct PracticeTranslation {
    pub practice_id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PracticeFields {
    pub slug: String,
    pub icon_key: String,
    pub image_key: String,
    pub position: i32,
}

impl Practice {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Practice>(
            r#"SELECT id, slug, icon_key, image_key, position, created_at, updated_at
               FROM practices
               ORDER BY position ASC, slug ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Practice>(
            r#"SELECT id, slug, icon_key, image_key, position, created_at, updated_at
               FROM practices
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Practice>(
            r#"SELECT id, slug, icon_key, image_key, position, created_at, updated_at
               FROM practices
               WHERE slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        fields: &PracticeFields,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Practice>(r#"INSERT INTO practices (id, slug, icon_key, image_key, position, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $6)
               RETURNING id, slug, icon_key, image_key, position, created_at, updated_at"#)
        .bind(id)
        .bind(&fields.slug)
        .bind(&fields.icon_key)
        .bind(&fields.image_key)
        .bind(fields.position)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        fields: &PracticeFields,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Practice>(r#"UPDATE practices
               SET slug = $2, icon_key = $3, image_key = $4, position = $5, updated_at = $6
               WHERE id = $1
               RETURNING id, slug, icon_key, image_key, position, created_at, updated_at"#)
        .bind(id)
        .bind(&fields.slug)
        .bind(&fields.icon_key)
        .bind(&fields.image_key)
        .bind(fields.position)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    pub async fn restore<'e, E>(executor: E, snapshot: &Practice) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE practices
               SET slug = $2, icon_key = $3, image_key = $4, position = $5, updated_at = $6
               WHERE id = $1"#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.slug)
        .bind(&snapshot.icon_key)
        .bind(&snapshot.image_key)
        .bind(snapshot.position)
        .bind(snapshot.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

impl PracticeTranslation {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PracticeTranslation>(
            "SELECT practice_id, locale, title, slug, summary, content FROM practice_translations",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_practice(
        pool: &SqlitePool,
        practice_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PracticeTranslation>(
            r#"SELECT practice_id, locale, title, slug, summary, content
               FROM practice_translations
               WHERE practice_id = $1
               ORDER BY locale"#,
        )
        .bind(practice_id)
        .fetch_all(pool)
        .await
    }

    /// Finds the practice whose translated slug in `locale` is `slug`.
    pub async fn find_by_localized_slug(
        pool: &SqlitePool,
        locale: Locale,
        slug: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PracticeTranslation>(
            r#"SELECT practice_id, locale, title, slug, summary, content
               FROM practice_translations
               WHERE locale = $1 AND slug = $2"#,
        )
        .bind(locale)
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn replace_for_practice(
        conn: &mut SqliteConnection,
        practice_id: Uuid,
        entries: &[LocalizedEntry],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM practice_translations WHERE practice_id = $1")
            .bind(practice_id)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"INSERT INTO practice_translations (practice_id, locale, title, slug, summary, content)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(practice_id)
            .bind(entry.locale)
            .bind(&entry.title)
            .bind(&entry.slug)
            .bind(&entry.summary)
            .bind(&entry.content)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
