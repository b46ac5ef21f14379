use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "access_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessRequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A visitor asking for dashboard access, reviewed by an admin.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct AccessRequest {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub message: Option<String>,
    pub status: AccessRequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAccessRequest {
    pub email: String,
    pub full_name: Option<String>,
    pub message: Option<String>,
}

impl AccessRequest {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(
            r#"SELECT id, email, full_name, message, status, created_at, reviewed_at
               FROM access_requests
               ORDER BY created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_status(
        pool: &SqlitePool,
        status: AccessRequestStatus,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(
            r#"SELECT id, email, full_name, message, status, created_at, reviewed_at
               FROM access_requests
               WHERE status = $1
               ORDER BY created_at DESC"#,
        )
        .bind(status)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(
            r#"SELECT id, email, full_name, message, status, created_at, reviewed_at
               FROM access_requests
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_pending_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(r#"SELECT id, email, full_name, message, status, created_at, reviewed_at FROM access_requests
               WHERE email = $1 COLLATE NOCASE AND status = 'pending'"#)
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateAccessRequest,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(r#"INSERT INTO access_requests (id, email, full_name, message, status, created_at)
               VALUES ($1, $2, $3, $4, 'pending', $5)
               RETURNING id, email, full_name, message, status, created_at, reviewed_at"#)
        .bind(id)
        .bind(data.email.trim())
        .bind(&data.full_name)
        .bind(&data.message)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Moves a pending request to `status`. Returns `None` when the request
    /// does not exist or was already reviewed.
    pub async fn review(
        pool: &SqlitePool,
        id: Uuid,
        status: AccessRequestStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AccessRequest>(r#"UPDATE access_requests
               SET status = $2, reviewed_at = $3
               WHERE id = $1 AND status = 'pending'
               RETURNING id, email, full_name, message, status, created_at, reviewed_at"#)
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }
}
