use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::locale::Locale;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct TeamMember {
    pub id: Uuid,
    pub photo_key: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct TeamTranslation {
    pub member_id: Uuid,
    pub locale: Locale,
    pub name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
}

impl TeamMember {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            "SELECT id, photo_key, position FROM team_members ORDER BY position ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        photo_key: Option<&str>,
        position: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"INSERT INTO team_members (id, photo_key, position) VALUES ($1, $2, $3)
               RETURNING id, photo_key, position"#,
        )
        .bind(id)
        .bind(photo_key)
        .bind(position)
        .fetch_one(pool)
        .await
    }
}

impl TeamTranslation {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamTranslation>(
            "SELECT member_id, locale, name, title, bio FROM team_translations",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn upsert(pool: &SqlitePool, entry: &TeamTranslation) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO team_translations (member_id, locale, name, title, bio)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT(member_id, locale) DO UPDATE SET
                   name = excluded.name,
                   title = excluded.title,
                   bio = excluded.bio"#,
        )
        .bind(entry.member_id)
        .bind(entry.locale)
        .bind(&entry.name)
        .bind(&entry.title)
        .bind(&entry.bio)
        .execute(pool)
        .await?;
        Ok(())
    }
}
