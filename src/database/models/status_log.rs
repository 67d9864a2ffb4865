use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One applied status transition. Rows are only ever inserted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StatusChangeLogEntry {
    pub id: i64,
    pub order_id: String,
    pub from_status: String,
    pub to_status: String,
    pub updated_by: String,
    pub created_at: String,
}

impl StatusChangeLogEntry {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        order_id: &str,
        from_status: &str,
        to_status: &str,
        updated_by: &str,
        at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let created_at = at.to_rfc3339();

        let id = sqlx::query(
            r#"
            INSERT INTO order_status_logs (order_id, from_status, to_status, updated_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(order_id)
        .bind(from_status)
        .bind(to_status)
        .bind(updated_by)
        .bind(&created_at)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Ok(StatusChangeLogEntry {
            id,
            order_id: order_id.to_string(),
            from_status: from_status.to_string(),
            to_status: to_status.to_string(),
            updated_by: updated_by.to_string(),
            created_at,
        })
    }

    pub async fn find_by_order(
        pool: &sqlx::SqlitePool,
        order_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StatusChangeLogEntry>(
            "SELECT id, order_id, from_status, to_status, updated_by, created_at FROM order_status_logs WHERE order_id = ? ORDER BY id"
        )
        .bind(order_id)
        .fetch_all(pool)
        .await
    }
}
