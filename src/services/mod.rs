/// HTTP health endpoints
pub mod health;
/// Status change notifications
pub mod notification;
/// The order status manager
pub mod order_status;
/// Status metadata and the built-in transition table
pub mod status_config;
/// Scheduled timeout sweep
pub mod timeout;
