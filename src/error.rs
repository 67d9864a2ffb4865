use thiserror::Error;

/// Failures surfaced by [`OrderStatusService`](crate::services::order_status::OrderStatusService).
///
/// Only business-rule violations and storage errors reach the caller.
/// Missing configuration, log table problems and notification failures are
/// absorbed inside the service.
#[derive(Debug, Error)]
pub enum OrderStatusError {
    /// The referenced order does not exist.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// Identifier that was looked up
        order_id: String,
    },

    /// The target status is not reachable from the current one.
    #[error("Illegal status transition for order {order_id}: {from} -> {to}")]
    IllegalTransition {
        /// Order being transitioned
        order_id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The order table could not be read or written.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OrderStatusError {
    /// True for the two business-rule failures (`OrderNotFound`, `IllegalTransition`).
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            OrderStatusError::OrderNotFound { .. } | OrderStatusError::IllegalTransition { .. }
        )
    }
}
