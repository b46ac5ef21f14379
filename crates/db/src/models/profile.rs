use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "profile_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProfileRole {
    Admin,
    Editor,
    #[default]
    Viewer,
}

/// Dashboard user. Credentials live with the identity provider; this table
/// only holds what the dashboard displays and the role it grants.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: ProfileRole,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at FROM profiles ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at FROM profiles WHERE email = $1 COLLATE NOCASE",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        email: &str,
        full_name: Option<&str>,
        role: ProfileRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Profile>(
            r#"INSERT INTO profiles (id, email, full_name, role, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, email, full_name, role, created_at"#,
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Changes the role unless that would leave no admin. The admin count is
    /// read inside the same statement, so concurrent demotions cannot both
    /// pass. `None` means the row is missing or is the last admin.
    pub async fn set_role(
        pool: &SqlitePool,
        id: Uuid,
        role: ProfileRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"UPDATE profiles SET role = $2
               WHERE id = $1
                 AND ($2 = 'admin'
                      OR role <> 'admin'
                      OR (SELECT COUNT(*) FROM profiles WHERE role = 'admin') > 1)
               RETURNING id, email, full_name, role, created_at"#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the profile unless it is the last admin. Returns the number of
    /// rows removed.
    pub async fn delete_unless_last_admin(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM profiles
               WHERE id = $1
                 AND (role <> 'admin'
                      OR (SELECT COUNT(*) FROM profiles WHERE role = 'admin') > 1)"#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
