use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{locale::Locale, translation::LocalizedEntry};

/// A concrete service offered under a practice area.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Service {
    pub id: Uuid,
    pub practice_id: Option<Uuid>,
    pub slug: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct ServiceTranslation {
    pub service_id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceFields {
    pub practice_id: Option<Uuid>,
    pub slug: String,
    pub position: i32,
}

impl Service {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"SELECT id, practice_id, slug, position, created_at, updated_at
               FROM services
               ORDER BY position ASC, slug ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_practice(
        pool: &SqlitePool,
        practice_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"SELECT id, practice_id, slug, position, created_at, updated_at
               FROM services
               WHERE practice_id = $1
               ORDER BY position ASC, slug ASC"#,
        )
        .bind(practice_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"SELECT id, practice_id, slug, position, created_at, updated_at
               FROM services
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        fields: &ServiceFields,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Service>(r#"INSERT INTO services (id, practice_id, slug, position, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $5)
               RETURNING id, practice_id, slug, position, created_at, updated_at"#)
        .bind(id)
        .bind(fields.practice_id)
        .bind(&fields.slug)
        .bind(fields.position)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        fields: &ServiceFields,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Service>(r#"UPDATE services
               SET practice_id = $2, slug = $3, position = $4, updated_at = $5
               WHERE id = $1
               RETURNING id, practice_id, slug, position, created_at, updated_at"#)
        .bind(id)
        .bind(fields.practice_id)
        .bind(&fields.slug)
        .bind(fields.position)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    pub async fn restore<'e, E>(executor: E, snapshot: &Service) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE services
               SET practice_id = $2, slug = $3, position = $4, updated_at = $5
               WHERE id = $1"#,
        )
        .bind(snapshot.id)
        .bind(snapshot.practice_id)
        .bind(&snapshot.slug)
        .bind(snapshot.position)
        .bind(snapshot.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

impl ServiceTranslation {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ServiceTranslation>(
            "SELECT service_id, locale, title, slug, summary, content FROM service_translations",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_service(
        pool: &SqlitePool,
        service_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ServiceTranslation>(
            r#"SELECT service_id, locale, title, slug, summary, content
               FROM service_translations
               WHERE service_id = $1
               ORDER BY locale"#,
        )
        .bind(service_id)
        .fetch_all(pool)
        .await
    }

    pub async fn replace_for_service(
        conn: &mut SqliteConnection,
        service_id: Uuid,
        entries: &[LocalizedEntry],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM service_translations WHERE service_id = $1")
            .bind(service_id)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"INSERT INTO service_translations (service_id, locale, title, slug, summary, content)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(service_id)
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
