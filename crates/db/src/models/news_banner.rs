use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::locale::Locale;

/// Promotional banner shown above the news list for one locale.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct NewsBanner {
    pub id: Uuid,
    pub locale: Locale,
    pub image_key: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BannerFields {
    pub locale: Locale,
    pub image_key: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
}

impl NewsBanner {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsBanner>(
            r#"SELECT id, locale, image_key, link_url, position, is_active, created_at
               FROM news_banners
               ORDER BY locale, position ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_active_by_locale(
        pool: &SqlitePool,
        locale: Locale,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsBanner>(r#"SELECT id, locale, image_key, link_url, position, is_active, created_at FROM news_banners
               WHERE locale = $1 AND is_active = 1
               ORDER BY position ASC, created_at DESC"#)
        .bind(locale)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsBanner>(
            r#"SELECT id, locale, image_key, link_url, position, is_active, created_at
               FROM news_banners
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        fields: &BannerFields,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, NewsBanner>(r#"INSERT INTO news_banners (id, locale, image_key, link_url, position, is_active, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, locale, image_key, link_url, position, is_active, created_at"#)
        .bind(id)
        .bind(fields.locale)
        .bind(&fields.image_key)
        .bind(&fields.link_url)
        .bind(fields.position)
        .bind(fields.is_active)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        fields: &BannerFields,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, NewsBanner>(r#"UPDATE news_banners
               SET locale = $2, image_key = $3, link_url = $4, position = $5, is_active = $6
               WHERE id = $1
               RETURNING id, locale, image_key, link_url, position, is_active, created_at"#)
        .bind(id)
        .bind(fields.locale)
        .bind(&fields.image_key)
        .bind(&fields.link_url)
        .bind(fields.position)
        .bind(fields.is_active)
        .fetch_optional(executor)
        .await
    }
}
