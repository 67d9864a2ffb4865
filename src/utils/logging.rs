use tracing::{debug, error, info, warn};

/// Logs an applied status transition
pub fn log_transition(order_id: &str, from: &str, to: &str, updated_by: &str) {
    info!(
        "TRANSITION: order {} {} -> {} by {}",
        order_id, from, to, updated_by
    );
}

/// Logs a transition refused by the status configuration
pub fn log_transition_rejected(order_id: &str, from: &str, to: &str, updated_by: &str) {
    warn!(
        "TRANSITION_REJECTED: order {} {} -> {} by {}",
        order_id, from, to, updated_by
    );
}

/// Logs configuration fallbacks (store unavailable, record malformed, no transition list)
pub fn log_config_fallback(status: &str, reason: &str) {
    warn!("CONFIG_FALLBACK: status '{}' - {}", status, reason);
}

pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    match details {
        Some(d) => error!("DB_ERROR: {} on {} failed: {} - {}", operation, table, error, d),
        None => error!("DB_ERROR: {} on {} failed: {}", operation, table, error),
    }
}

/// Logs an order that has exceeded its status timeout
pub fn log_timeout(order_id: &str, status: &str, elapsed_secs: i64, timeout_secs: i64) {
    warn!(
        "TIMEOUT: order {} in '{}' for {}s (limit {}s)",
        order_id, status, elapsed_secs, timeout_secs
    );
}

pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
