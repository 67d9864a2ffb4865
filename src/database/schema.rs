use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::utils::logging::log_database_operation;

/// Optional parts of the `orders` schema, probed once at startup.
///
/// Only `id`, `status` and `updated_at` are guaranteed on `orders`; older
/// deployments have no `order_status_logs` table either. Readers and writers
/// consult these flags instead of inspecting the schema on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCapabilities {
    pub has_user_chat_id: bool,
    pub has_merchant_chat_id: bool,
    pub has_created_at: bool,
    pub has_status_updated_at: bool,
    pub has_status_updated_by: bool,
    pub has_status_log: bool,
}

impl SchemaCapabilities {
    pub async fn probe(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let order_columns = table_columns(pool, "orders").await?;
        let has_status_log = table_exists(pool, "order_status_logs").await?;

        let has_column = |name: &str| order_columns.iter().any(|c| c == name);

        let capabilities = Self {
            has_user_chat_id: has_column("user_chat_id"),
            has_merchant_chat_id: has_column("merchant_chat_id"),
            has_created_at: has_column("created_at"),
            has_status_updated_at: has_column("status_updated_at"),
            has_status_updated_by: has_column("status_updated_by"),
            has_status_log,
        };

        log_database_operation(
            "PROBE",
            "orders",
            Some(&format!(
                "user_chat_id={}, merchant_chat_id={}, created_at={}, status_updated_at={}, status_updated_by={}, order_status_logs={}",
                capabilities.has_user_chat_id,
                capabilities.has_merchant_chat_id,
                capabilities.has_created_at,
                capabilities.has_status_updated_at,
                capabilities.has_status_updated_by,
                capabilities.has_status_log
            )),
        );

        Ok(capabilities)
    }
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await
}
