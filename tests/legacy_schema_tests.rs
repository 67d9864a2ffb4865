//! Older deployments: `orders` without the status audit columns, no
//! `order_status_logs` and no `entities` table. The minimal shape has only
//! `id`, `status` and `updated_at`.

use anyhow::Result;
use chrono::{Duration, Utc};
use order_status_service::database::{connection::DatabaseManager, models::Order};
use order_status_service::error::OrderStatusError;
use order_status_service::services::notification::LogNotifier;
use order_status_service::services::order_status::OrderStatusService;
use order_status_service::services::status_config::ConfigSource;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const LEGACY_ORDERS_TABLE: &str = r#"
    CREATE TABLE orders (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        user_chat_id INTEGER,
        merchant_chat_id INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const MINIMAL_ORDERS_TABLE: &str =
    "CREATE TABLE orders (id TEXT PRIMARY KEY, status TEXT NOT NULL, updated_at TEXT NOT NULL)";

async fn setup_service_with(orders_table: &str) -> Result<(OrderStatusService, DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("legacy.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db = DatabaseManager::new(&database_url).await?;
    sqlx::query(orders_table).execute(&db.pool).await?;

    let service = OrderStatusService::new(db.pool.clone(), Arc::new(LogNotifier)).await?;
    Ok((service, db, temp_dir))
}

async fn setup_legacy_service() -> Result<(OrderStatusService, DatabaseManager, TempDir)> {
    setup_service_with(LEGACY_ORDERS_TABLE).await
}

async fn backdate(db: &DatabaseManager, order_id: &str, seconds: i64) -> Result<()> {
    sqlx::query("UPDATE orders SET updated_at = ? WHERE id = ?")
        .bind((Utc::now() - Duration::seconds(seconds)).to_rfc3339())
        .bind(order_id)
        .execute(&db.pool)
        .await?;
    Ok(())
}

async fn status_of(service: &OrderStatusService, db: &DatabaseManager, order_id: &str) -> Result<String> {
    Order::find_by_id(&db.pool, order_id, &service.capabilities())
        .await?
        .map(|order| order.status)
        .ok_or_else(|| anyhow::anyhow!("order missing"))
}

#[tokio::test]
async fn test_legacy_capabilities() -> Result<()> {
    let (service, _db, _temp_dir) = setup_legacy_service().await?;

    let capabilities = service.capabilities();
    assert!(!capabilities.has_status_updated_at);
    assert!(!capabilities.has_status_updated_by);
    assert!(!capabilities.has_status_log);

    Ok(())
}

#[tokio::test]
async fn test_legacy_config_uses_defaults() -> Result<()> {
    let (service, _db, _temp_dir) = setup_legacy_service().await?;

    let resolved = service.resolve_status_config("pending").await;
    assert_eq!(resolved.source, ConfigSource::Default);
    assert!(service.can_transition_to("attempting", "pending").await);
    assert!(!service.can_transition_to("cancelled", "pending").await);
    assert_eq!(service.get_all_status_configs().await.len(), 11);

    Ok(())
}

#[tokio::test]
async fn test_legacy_transition_updates_status_only() -> Result<()> {
    let (service, db, _temp_dir) = setup_legacy_service().await?;
    let order = Order::create(&db.pool, "pending", None, None, &service.capabilities()).await?;

    assert!(service.transition_status(&order.id, "confirmed", "merchant_42").await?);

    let updated = Order::find_by_id(&db.pool, &order.id, &service.capabilities())
        .await?
        .ok_or_else(|| anyhow::anyhow!("order missing"))?;
    assert_eq!(updated.status, "confirmed");
    assert!(updated.status_updated_by.is_none());
    assert!(service.status_history(&order.id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_legacy_illegal_transition() -> Result<()> {
    let (service, db, _temp_dir) = setup_legacy_service().await?;
    let order = Order::create(&db.pool, "confirmed", None, None, &service.capabilities()).await?;

    let result = service.transition_status(&order.id, "evaluated", "merchant_42").await;
    assert!(matches!(result, Err(OrderStatusError::IllegalTransition { .. })));

    Ok(())
}

#[tokio::test]
async fn test_legacy_timeout_sweep() -> Result<()> {
    let (service, db, _temp_dir) = setup_legacy_service().await?;
    let order = Order::create(&db.pool, "attempting", None, None, &service.capabilities()).await?;
    backdate(&db, &order.id, 400).await?;

    assert_eq!(service.handle_timeout_orders().await?, 1);

    let updated = Order::find_by_id(&db.pool, &order.id, &service.capabilities())
        .await?
        .ok_or_else(|| anyhow::anyhow!("order missing"))?;
    assert_eq!(updated.status, "merchant_unavailable");

    Ok(())
}

#[tokio::test]
async fn test_minimal_orders_table_transition() -> Result<()> {
    let (service, db, _temp_dir) = setup_service_with(MINIMAL_ORDERS_TABLE).await?;
    sqlx::query("INSERT INTO orders (id, status, updated_at) VALUES ('O1', 'attempting', ?)")
        .bind(Utc::now().to_rfc3339())
        .execute(&db.pool)
        .await?;

    assert!(service.transition_status("O1", "pending", "merchant_42").await?);

    let updated = Order::find_by_id(&db.pool, "O1", &service.capabilities())
        .await?
        .ok_or_else(|| anyhow::anyhow!("order missing"))?;
    assert_eq!(updated.status, "pending");
    assert!(updated.user_chat_id.is_none());
    assert!(updated.created_at.is_none());

    let result = service.transition_status("O1", "evaluated", "merchant_42").await;
    assert!(matches!(result, Err(OrderStatusError::IllegalTransition { .. })));

    Ok(())
}

#[tokio::test]
async fn test_minimal_orders_table_timeout_sweep() -> Result<()> {
    let (service, db, _temp_dir) = setup_service_with(MINIMAL_ORDERS_TABLE).await?;
    let stale = Order::create(&db.pool, "attempting", Some(7), Some(8), &service.capabilities()).await?;
    let fresh = Order::create(&db.pool, "attempting", None, None, &service.capabilities()).await?;
    backdate(&db, &stale.id, 400).await?;

    let timed_out = service.check_timeout_orders().await?;
    assert_eq!(timed_out.len(), 1);
    assert_eq!(timed_out[0].order_id, stale.id);

    assert_eq!(service.handle_timeout_orders().await?, 1);

    assert_eq!(status_of(&service, &db, &stale.id).await?, "merchant_unavailable");
    assert_eq!(status_of(&service, &db, &fresh.id).await?, "attempting");

    Ok(())
}
