//! Startup and health-check verification of the content schema.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use ts_rs::TS;

/// Every table the public site and dashboard read from.
pub const CONTENT_TABLES: &[&str] = &[
    "post_categories",
    "post_category_translations",
    "posts",
    "post_translations",
    "practices",
    "practice_translations",
    "services",
    "service_translations",
    "news_banners",
    "profiles",
    "access_requests",
    "team_members",
    "team_translations",
];

#[derive(Debug, Clone, Serialize, TS)]
pub struct SchemaReport {
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl SchemaReport {
    pub fn is_healthy(&self) -> bool {
        self.migrations_applied > 0 && self.missing_tables.is_empty()
    }
}

pub async fn check_schema(pool: &SqlitePool) -> Result<SchemaReport, sqlx::Error> {
    let has_migrations = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?
        > 0;

    let (migrations_applied, latest_migration) = if has_migrations {
        let applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(pool)
        .await?;
        let latest = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await?;
        (applied, latest)
    } else {
        (0, None)
    };

    let present: Vec<String> =
        sqlx::query_scalar::<_, String>("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;
    let missing_tables: Vec<String> = CONTENT_TABLES
        .iter()
        .filter(|t| !present.iter().any(|p| p == *t))
        .map(|t| t.to_string())
        .collect();

    let report = SchemaReport {
        migrations_applied,
        latest_migration,
        missing_tables,
    };
    if report.is_healthy() {
        info!(migrations = report.migrations_applied, "Schema OK");
    } else {
        warn!(
            migrations = report.migrations_applied,
            missing = ?report.missing_tables,
            "Schema incomplete"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn migrated_database_is_healthy() {
        let db = DBService::new_in_memory().await.unwrap();
        let report = check_schema(&db.pool).await.unwrap();
        assert!(report.is_healthy(), "{report:?}");
        assert!(report.latest_migration.is_some());
    }

    #[tokio::test]
    async fn dropped_table_is_reported() {
        let db = DBService::new_in_memory().await.unwrap();
        sqlx::query("DROP TABLE team_translations")
            .execute(&db.pool)
            .await
            .unwrap();
        let report = check_schema(&db.pool).await.unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.missing_tables, vec!["team_translations".to_string()]);
    }
}
