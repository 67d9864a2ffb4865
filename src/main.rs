//! # Order Status Service Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, builds
//! the order status manager, starts the timeout sweep and serves the health
//! endpoints.

use anyhow::Result;
use std::sync::Arc;
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_status_service::config::Config;
use order_status_service::database::connection::DatabaseManager;
use order_status_service::services::health::HealthService;
use order_status_service::services::notification::{LogNotifier, Notifier, TelegramNotifier};
use order_status_service::services::order_status::OrderStatusService;
use order_status_service::services::timeout::TimeoutService;
use order_status_service::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_status_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Order Status Service v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded - Database: {}, HTTP Port: {}, Transition policy: {:?}",
        config.database_url, config.http_port, config.transition_policy);

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => {
            info!("Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(Bot::new(token), config.admin_chat_id))
        }
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set - notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let orders = Arc::new(
        OrderStatusService::new(db_arc.pool.clone(), notifier)
            .await?
            .with_policy(config.transition_policy),
    );
    log_system_event(
        "Order status manager ready",
        Some(&format!("{:?}", orders.capabilities())),
    );

    info!("Initializing timeout service...");
    let mut timeout_service = match TimeoutService::new(orders.clone(), &config.timeout_check_schedule).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to create timeout service: {}", e);
            return Err(anyhow::anyhow!("Failed to create timeout service: {}", e));
        }
    };

    if let Err(e) = timeout_service.start().await {
        tracing::error!("Failed to start timeout service: {}", e);
        return Err(anyhow::anyhow!("Failed to start timeout service: {}", e));
    }

    let health_service = HealthService::new(db_arc.clone(), orders.clone(), timeout_service.last_sweep());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = timeout_service.stop().await {
        tracing::warn!("Error stopping timeout service: {}", e);
    }

    log_system_event("Application stopped", None);
    Ok(())
}
