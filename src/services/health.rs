use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::database::connection::DatabaseManager;
use crate::database::schema::SchemaCapabilities;
use crate::services::order_status::{OrderStatusService, TransitionPolicy};
use crate::services::timeout::{LastSweep, SweepReport};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub order_status: OrderStatusHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

/// Schema shape and validation mode the status manager is running with
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderStatusHealth {
    pub schema: SchemaCapabilities,
    pub transition_policy: TransitionPolicy,
    /// From the last completed timeout sweep; `None` until one has run
    pub last_timeout_sweep: Option<SweepReport>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub orders: Arc<OrderStatusService>,
    pub last_sweep: LastSweep,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>, orders: Arc<OrderStatusService>, last_sweep: LastSweep) -> Self {
        let state = AppState {
            db,
            orders,
            last_sweep,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();

    let db_healthy = state.db.ping().await.is_ok();
    let response_time_ms = start.elapsed().as_millis() as u64;

    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    let db_status = if db_healthy { "healthy" } else { "unhealthy" };

    let health_response = HealthResponse {
        status: db_status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: db_status.to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        order_status: OrderStatusHealth {
            schema: state.orders.capabilities(),
            transition_policy: state.orders.policy(),
            last_timeout_sweep: state.last_sweep.get().await,
        },
        uptime_seconds: uptime,
    };

    if db_healthy {
        Ok(Json(health_response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match state.db.ping().await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Order;
    use crate::services::notification::LogNotifier;
    use crate::services::timeout::TimeoutService;
    use axum_test::TestServer;
    use tempfile::TempDir;

    async fn create_test_health_service() -> (HealthService, TimeoutService, Arc<DatabaseManager>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let db = Arc::new(
            DatabaseManager::new(&db_url)
                .await
                .expect("Failed to create test database")
        );
        db.run_migrations().await.expect("Failed to run migrations");

        let orders = Arc::new(
            OrderStatusService::new(db.pool.clone(), Arc::new(LogNotifier))
                .await
                .expect("Failed to create order status service")
        );

        let timeout_service = TimeoutService::new(orders.clone(), "0 * * * * *")
            .await
            .expect("Failed to create timeout service");
        let health_service = HealthService::new(db.clone(), orders, timeout_service.last_sweep());

        (health_service, timeout_service, db, temp_dir)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (health_service, _timeout_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let health_response: HealthResponse = response.json();
        assert_eq!(health_response.status, "healthy");
        assert_eq!(health_response.database.status, "healthy");
        assert_eq!(health_response.version, env!("CARGO_PKG_VERSION"));
        assert!(health_response.order_status.schema.has_status_log);
        assert_eq!(health_response.order_status.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(health_response.order_status.last_timeout_sweep, None);
    }

    #[tokio::test]
    async fn test_health_reports_last_sweep() {
        let (health_service, timeout_service, db, _temp_dir) = create_test_health_service().await;
        let capabilities = SchemaCapabilities::probe(&db.pool).await.unwrap();
        let order = Order::create(&db.pool, "attempting", None, None, &capabilities)
            .await
            .unwrap();
        let stale = (Utc::now() - chrono::Duration::seconds(400)).to_rfc3339();
        sqlx::query("UPDATE orders SET updated_at = ? WHERE id = ?")
            .bind(&stale)
            .bind(&order.id)
            .execute(&db.pool)
            .await
            .unwrap();

        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        // Stale orders alone do not change the payload until a sweep runs
        let health_response: HealthResponse = server.get("/health").await.json();
        assert_eq!(health_response.order_status.last_timeout_sweep, None);

        assert_eq!(timeout_service.sweep_now().await, 1);

        let health_response: HealthResponse = server.get("/health").await.json();
        let report = health_response.order_status.last_timeout_sweep.unwrap();
        assert_eq!(report.timed_out_orders, 1);
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let (health_service, _timeout_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/ready").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let ready_response: String = response.json();
        assert_eq!(ready_response, "ready");
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let (health_service, _timeout_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/live").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let alive_response: String = response.json();
        assert_eq!(alive_response, "alive");
    }
}
