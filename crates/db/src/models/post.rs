use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::locale::Locale;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub status: PostStatus,
    pub category_id: Option<Uuid>, // Leaf category the post is filed under
    pub cover_image_key: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct PostTranslation {
    pub post_id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PostTranslationInput {
    pub locale: Locale,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
}

/// Column values written by create and update. Status changes go through
/// [`Post::set_status`].
#[derive(Debug, Clone)]
pub struct PostFields {
    pub slug: String,
    pub category_id: Option<Uuid>,
    pub cover_image_key: Option<String>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"SELECT id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at
               FROM posts
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"SELECT id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at
               FROM posts
               WHERE slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"SELECT id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at
               FROM posts
               ORDER BY created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_status(
        pool: &SqlitePool,
        status: PostStatus,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"SELECT id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at
               FROM posts
               WHERE status = $1
               ORDER BY published_at DESC, created_at DESC"#,
        )
        .bind(status)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_status(pool: &SqlitePool, status: PostStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn create<'e, E>(executor: E, id: Uuid, fields: &PostFields) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Post>(r#"INSERT INTO posts (id, slug, status, category_id, cover_image_key, created_at, updated_at)
               VALUES ($1, $2, 'draft', $3, $4, $5, $5)
               RETURNING id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at"#)
        .bind(id)
        .bind(&fields.slug)
        .bind(fields.category_id)
        .bind(&fields.cover_image_key)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        fields: &PostFields,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Post>(r#"UPDATE posts
               SET slug = $2, category_id = $3, cover_image_key = $4, updated_at = $5
               WHERE id = $1
               RETURNING id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at"#)
        .bind(id)
        .bind(&fields.slug)
        .bind(fields.category_id)
        .bind(&fields.cover_image_key)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    /// Moves the post to `status`. Publishing stamps `published_at` the first
    /// time; unpublishing keeps the original date.
    pub async fn set_status(
        pool: &SqlitePool,
        id: Uuid,
        status: PostStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Post>(r#"UPDATE posts
               SET status = $2,
                   published_at = CASE WHEN $2 = 'published' THEN COALESCE(published_at, $3) ELSE published_at END,
                   updated_at = $3
               WHERE id = $1
               RETURNING id, slug, status, category_id, cover_image_key, published_at, created_at, updated_at"#)
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    /// Writes every column of `snapshot` back, undoing an earlier update.
    pub async fn restore<'e, E>(executor: E, snapshot: &Post) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE posts
               SET slug = $2, status = $3, category_id = $4, cover_image_key = $5,
                   published_at = $6, updated_at = $7
               WHERE id = $1"#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.slug)
        .bind(snapshot.status)
        .bind(snapshot.category_id)
        .bind(&snapshot.cover_image_key)
        .bind(snapshot.published_at)
        .bind(snapshot.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

impl PostTranslation {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostTranslation>(
            "SELECT post_id, locale, title, excerpt, content FROM post_translations",
        )
        .fetch_all(pool)
        .await
    }

    /// Translations of posts currently in `status`.
    pub async fn find_by_post_status(
        pool: &SqlitePool,
        status: PostStatus,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostTranslation>(
            r#"SELECT t.post_id, t.locale, t.title, t.excerpt, t.content
               FROM post_translations t
               JOIN posts p ON p.id = t.post_id
               WHERE p.status = $1"#,
        )
        .bind(status)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_post(pool: &SqlitePool, post_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PostTranslation>(
            r#"SELECT post_id, locale, title, excerpt, content
               FROM post_translations
               WHERE post_id = $1
               ORDER BY locale"#,
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes every translation of `post_id` and inserts `entries`.
    /// Callers run this inside a transaction.
    pub async fn replace_for_post(
        conn: &mut SqliteConnection,
        post_id: Uuid,
        entries: &[PostTranslationInput],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM post_translations WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"INSERT INTO post_translations (post_id, locale, title, excerpt, content)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(post_id)
            .bind(entry.locale)
            .bind(&entry.title)
            .bind(&entry.excerpt)
            .bind(&entry.content)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn fields(slug: &str) -> PostFields {
        PostFields {
            slug: slug.to_string(),
            category_id: None,
            cover_image_key: None,
        }
    }

    #[tokio::test]
    async fn publish_stamps_date_once() {
        let db = DBService::new_in_memory().await.unwrap();
        let post = Post::create(&db.pool, Uuid::new_v4(), &fields("first-post"))
            .await
            .unwrap();
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.published_at.is_none());
        assert_eq!(Post::count_by_status(&db.pool, PostStatus::Draft).await.unwrap(), 1);

        let published = Post::set_status(&db.pool, post.id, PostStatus::Published)
            .await
            .unwrap()
            .unwrap();
        let first_date = published.published_at.expect("published_at set");

        let draft = Post::set_status(&db.pool, post.id, PostStatus::Draft)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(draft.published_at, Some(first_date));

        let again = Post::set_status(&db.pool, post.id, PostStatus::Published)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.published_at, Some(first_date));
        assert_eq!(Post::count_by_status(&db.pool, PostStatus::Draft).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_translations_swaps_all_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        let post = Post::create(&db.pool, Uuid::new_v4(), &fields("merger-update"))
            .await
            .unwrap();

        let entry = |locale, title: &str| PostTranslationInput {
            locale,
            title: title.to_string(),
            excerpt: None,
            content: None,
        };

        let mut tx = db.pool.begin().await.unwrap();
        PostTranslation::replace_for_post(
            &mut tx,
            post.id,
            &[entry(Locale::En, "Merger update"), entry(Locale::De, "Fusionsupdate")],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        PostTranslation::replace_for_post(&mut tx, post.id, &[entry(Locale::Fr, "Fusion")])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let rows = PostTranslation::find_by_post(&db.pool, post.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].locale, Locale::Fr);
    }

    #[tokio::test]
    async fn published_translations_skip_drafts() {
        let db = DBService::new_in_memory().await.unwrap();
        let live = Post::create(&db.pool, Uuid::new_v4(), &fields("live"))
            .await
            .unwrap();
        let draft = Post::create(&db.pool, Uuid::new_v4(), &fields("draft"))
            .await
            .unwrap();
        Post::set_status(&db.pool, live.id, PostStatus::Published)
            .await
            .unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        for (id, title) in [(live.id, "Live"), (draft.id, "Draft")] {
            let entry = PostTranslationInput {
                locale: Locale::En,
                title: title.to_string(),
                excerpt: None,
                content: None,
            };
            PostTranslation::replace_for_post(&mut tx, id, &[entry])
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let rows = PostTranslation::find_by_post_status(&db.pool, PostStatus::Published)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post_id, live.id);
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        Post::create(&db.pool, Uuid::new_v4(), &fields("same")).await.unwrap();
        let err = Post::create(&db.pool, Uuid::new_v4(), &fields("same")).await;
        assert!(err.is_err());
    }
}
