use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Tables that carry an `id` primary key and can be targeted generically by
/// write compensations and change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentTable {
    Posts,
    PostCategories,
    Practices,
    Services,
    NewsBanners,
    Profiles,
    AccessRequests,
    TeamMembers,
}

impl ContentTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTable::Posts => "posts",
            ContentTable::PostCategories => "post_categories",
            ContentTable::Practices => "practices",
            ContentTable::Services => "services",
            ContentTable::NewsBanners => "news_banners",
            ContentTable::Profiles => "profiles",
            ContentTable::AccessRequests => "access_requests",
            ContentTable::TeamMembers => "team_members",
        }
    }

    fn delete_sql(&self) -> &'static str {
        match self {
            ContentTable::Posts => "DELETE FROM posts WHERE id = $1",
            ContentTable::PostCategories => "DELETE FROM post_categories WHERE id = $1",
            ContentTable::Practices => "DELETE FROM practices WHERE id = $1",
            ContentTable::Services => "DELETE FROM services WHERE id = $1",
            ContentTable::NewsBanners => "DELETE FROM news_banners WHERE id = $1",
            ContentTable::Profiles => "DELETE FROM profiles WHERE id = $1",
            ContentTable::AccessRequests => "DELETE FROM access_requests WHERE id = $1",
            ContentTable::TeamMembers => "DELETE FROM team_members WHERE id = $1",
        }
    }

    /// Deletes the row with `id`, returning the number of rows removed.
    pub async fn delete_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(self.delete_sql()).bind(id).execute(executor).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_match_display() {
        for table in [
            ContentTable::Posts,
            ContentTable::PostCategories,
            ContentTable::NewsBanners,
            ContentTable::AccessRequests,
        ] {
            assert_eq!(table.to_string(), table.as_str());
            assert!(table.delete_sql().contains(&format!("FROM {} WHERE", table.as_str())));
        }
    }
}
