use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::schema::SchemaCapabilities;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: String,
    pub user_chat_id: Option<i64>,
    pub merchant_chat_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: String,
    /// Always `None` on the legacy schema
    pub status_updated_at: Option<String>,
    pub status_updated_by: Option<String>,
}

impl Order {
    /// Inserts a new order, writing only the columns the schema has.
    pub async fn create(
        pool: &sqlx::SqlitePool,
        status: &str,
        user_chat_id: Option<i64>,
        merchant_chat_id: Option<i64>,
        capabilities: &SchemaCapabilities,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let user_chat_id = user_chat_id.filter(|_| capabilities.has_user_chat_id);
        let merchant_chat_id = merchant_chat_id.filter(|_| capabilities.has_merchant_chat_id);
        let created_at = capabilities.has_created_at.then(|| now.clone());

        let mut columns = vec!["id", "status", "updated_at"];
        if capabilities.has_user_chat_id {
            columns.push("user_chat_id");
        }
        if capabilities.has_merchant_chat_id {
            columns.push("merchant_chat_id");
        }
        if capabilities.has_created_at {
            columns.push("created_at");
        }
        let placeholders = columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!(
            "INSERT INTO orders ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let mut query_builder = sqlx::query(&query)
            .bind(&id)
            .bind(status)
            .bind(&now);
        if capabilities.has_user_chat_id {
            query_builder = query_builder.bind(user_chat_id);
        }
        if capabilities.has_merchant_chat_id {
            query_builder = query_builder.bind(merchant_chat_id);
        }
        if capabilities.has_created_at {
            query_builder = query_builder.bind(&now);
        }

        query_builder.execute(pool).await?;

        Ok(Order {
            id,
            status: status.to_string(),
            user_chat_id,
            merchant_chat_id,
            created_at,
            updated_at: now,
            status_updated_at: None,
            status_updated_by: None,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        order_id: &str,
        capabilities: &SchemaCapabilities,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM orders WHERE id = ?",
            select_columns(capabilities)
        );

        sqlx::query_as::<_, Order>(&query)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    /// Orders whose status is not one of `excluded_statuses`, oldest update first.
    pub async fn find_excluding_statuses(
        pool: &sqlx::SqlitePool,
        excluded_statuses: &[&str],
        capabilities: &SchemaCapabilities,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = if excluded_statuses.is_empty() {
            format!(
                "SELECT {} FROM orders ORDER BY updated_at",
                select_columns(capabilities)
            )
        } else {
            let placeholders = excluded_statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            format!(
                "SELECT {} FROM orders WHERE status NOT IN ({placeholders}) ORDER BY updated_at",
                select_columns(capabilities)
            )
        };

        let mut query_builder = sqlx::query_as::<_, Order>(&query);
        for status in excluded_statuses {
            query_builder = query_builder.bind(*status);
        }

        query_builder.fetch_all(pool).await
    }

    /// Writes the new status in a single statement and returns the affected row count.
    ///
    /// `status_updated_at` / `status_updated_by` are only written when the
    /// schema has them.
    pub async fn update_status(
        pool: &sqlx::SqlitePool,
        order_id: &str,
        new_status: &str,
        updated_by: &str,
        at: DateTime<Utc>,
        capabilities: &SchemaCapabilities,
    ) -> Result<u64, sqlx::Error> {
        let timestamp = at.to_rfc3339();

        let mut assignments = vec!["status = ?", "updated_at = ?"];
        if capabilities.has_status_updated_at {
            assignments.push("status_updated_at = ?");
        }
        if capabilities.has_status_updated_by {
            assignments.push("status_updated_by = ?");
        }
        let query = format!("UPDATE orders SET {} WHERE id = ?", assignments.join(", "));

        let mut query_builder = sqlx::query(&query)
            .bind(new_status)
            .bind(&timestamp);
        if capabilities.has_status_updated_at {
            query_builder = query_builder.bind(&timestamp);
        }
        if capabilities.has_status_updated_by {
            query_builder = query_builder.bind(updated_by);
        }

        let result = query_builder
            .bind(order_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }
}

/// Parses RFC 3339 as well as SQLite's `YYYY-MM-DD HH:MM:SS` form (assumed UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn select_columns(capabilities: &SchemaCapabilities) -> String {
    let optional = [
        (capabilities.has_user_chat_id, "user_chat_id"),
        (capabilities.has_merchant_chat_id, "merchant_chat_id"),
        (capabilities.has_created_at, "created_at"),
        (capabilities.has_status_updated_at, "status_updated_at"),
        (capabilities.has_status_updated_by, "status_updated_by"),
    ];

    let mut columns = vec!["id".to_string(), "status".to_string(), "updated_at".to_string()];
    for (present, column) in optional {
        columns.push(if present {
            column.to_string()
        } else {
            format!("NULL AS {column}")
        });
    }
    columns.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T10:00:00+00:00").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-05-01 10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_select_columns_for_minimal_schema() {
        let columns = select_columns(&SchemaCapabilities::default());
        assert!(columns.starts_with("id, status, updated_at"));
        assert!(columns.contains("NULL AS user_chat_id"));
        assert!(columns.contains("NULL AS merchant_chat_id"));
        assert!(columns.contains("NULL AS created_at"));
        assert!(columns.contains("NULL AS status_updated_at"));
        assert!(columns.contains("NULL AS status_updated_by"));

        let columns = select_columns(&SchemaCapabilities {
            has_user_chat_id: true,
            has_merchant_chat_id: true,
            has_created_at: true,
            has_status_updated_at: true,
            has_status_updated_by: true,
            has_status_log: true,
        });
        assert!(!columns.contains("NULL"));
    }
}
