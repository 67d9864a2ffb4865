//! Order Status Manager: gates and applies status transitions, exposes status
//! metadata and resolves orders that lingered too long in a status.
//!
//! Only [`OrderStatusError::OrderNotFound`], [`OrderStatusError::IllegalTransition`]
//! and storage errors on the `orders` table reach callers. Configuration
//! lookups, the change log and notifications degrade silently (with a log
//! line) so that missing metadata never blocks an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::models::{EntityStore, Order, StatusChangeLogEntry};
use crate::database::schema::SchemaCapabilities;
use crate::error::OrderStatusError;
use crate::services::notification::{dispatch_status_change, Notifier};
use crate::services::status_config::{
    default_status_config, default_status_configs, is_terminal, timeout_target, ConfigSource,
    ResolvedStatusConfig, StatusConfig, AUTO_TIMEOUT_ACTOR, STATUS_CONFIG_NAMESPACE,
    TERMINAL_STATUSES,
};
use crate::utils::logging::{
    log_config_fallback, log_database_error, log_timeout, log_transition, log_transition_rejected,
};

/// How [`OrderStatusService::can_transition_to`] treats a status without a `next_statuses` list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionPolicy {
    /// Missing list allows any target
    #[default]
    Permissive,
    /// Missing list allows nothing
    Strict,
}

/// An active order that has been in its status longer than the configured timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutInfo {
    pub order_id: String,
    pub status: String,
    pub updated_at: String,
    pub elapsed_seconds: i64,
    pub timeout_seconds: i64,
}

pub struct OrderStatusService {
    pool: SqlitePool,
    entities: EntityStore,
    notifier: Arc<dyn Notifier>,
    capabilities: SchemaCapabilities,
    policy: TransitionPolicy,
}

impl OrderStatusService {
    /// Probes the schema once; the result is reused for every write.
    pub async fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Result<Self, sqlx::Error> {
        let capabilities = SchemaCapabilities::probe(&pool).await?;

        Ok(Self {
            entities: EntityStore::new(pool.clone()),
            pool,
            notifier,
            capabilities,
            policy: TransitionPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn capabilities(&self) -> SchemaCapabilities {
        self.capabilities
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Store record, then built-in default, then the generic unknown shape.
    pub async fn resolve_status_config(&self, status: &str) -> ResolvedStatusConfig {
        match self.entities.get_entity(status, STATUS_CONFIG_NAMESPACE).await {
            Ok(Some(attributes)) => match StatusConfig::from_attributes(status, &attributes) {
                Ok(config) => {
                    return ResolvedStatusConfig {
                        config,
                        source: ConfigSource::Store,
                    }
                }
                Err(e) => log_config_fallback(status, &format!("malformed store record: {e}")),
            },
            Ok(None) => {}
            Err(e) => log_config_fallback(status, &format!("entity store unavailable: {e}")),
        }

        match default_status_config(status) {
            Some(config) => ResolvedStatusConfig {
                config,
                source: ConfigSource::Default,
            },
            None => ResolvedStatusConfig {
                config: StatusConfig::unknown(status),
                source: ConfigSource::Unknown,
            },
        }
    }

    pub async fn get_status_config(&self, status: &str) -> StatusConfig {
        self.resolve_status_config(status).await.config
    }

    /// Built-in defaults overlaid with every well-formed store record.
    pub async fn get_all_status_configs(&self) -> BTreeMap<String, StatusConfig> {
        let mut configs = default_status_configs();

        match self.entities.get_all_entities(STATUS_CONFIG_NAMESPACE).await {
            Ok(entities) => {
                for (status, attributes) in entities {
                    match StatusConfig::from_attributes(&status, &attributes) {
                        Ok(config) => {
                            configs.insert(status, config);
                        }
                        Err(e) => {
                            log_config_fallback(&status, &format!("malformed store record: {e}"))
                        }
                    }
                }
            }
            Err(e) => log_config_fallback("*", &format!("entity store unavailable: {e}")),
        }

        configs
    }

    pub async fn can_transition_to(&self, current: &str, target: &str) -> bool {
        let config = self.get_status_config(current).await;

        match config.allows(target) {
            Some(allowed) => allowed,
            None => {
                log_config_fallback(
                    current,
                    &format!("no next_statuses configured, applying {:?} policy", self.policy),
                );
                self.policy == TransitionPolicy::Permissive
            }
        }
    }

    /// Moves an order to `new_status`.
    ///
    /// Returns whether the `orders` row was updated. The change log entry and
    /// notifications are best-effort and never affect the result.
    pub async fn transition_status(
        &self,
        order_id: &str,
        new_status: &str,
        updated_by: &str,
    ) -> Result<bool, OrderStatusError> {
        let order = Order::find_by_id(&self.pool, order_id, &self.capabilities)
            .await?
            .ok_or_else(|| OrderStatusError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !self.can_transition_to(&order.status, new_status).await {
            log_transition_rejected(order_id, &order.status, new_status, updated_by);
            return Err(OrderStatusError::IllegalTransition {
                order_id: order_id.to_string(),
                from: order.status,
                to: new_status.to_string(),
            });
        }

        let now = Utc::now();
        let rows_affected = Order::update_status(
            &self.pool,
            order_id,
            new_status,
            updated_by,
            now,
            &self.capabilities,
        )
        .await?;

        if rows_affected == 0 {
            warn!("Status update for order {} affected no rows", order_id);
            return Ok(false);
        }

        log_transition(order_id, &order.status, new_status, updated_by);
        self.record_change(&order, new_status, updated_by, now).await;

        let config = self.get_status_config(new_status).await;
        dispatch_status_change(self.notifier.as_ref(), &order, new_status, &config).await;

        Ok(true)
    }

    async fn record_change(&self, order: &Order, new_status: &str, updated_by: &str, at: DateTime<Utc>) {
        if !self.capabilities.has_status_log {
            debug!("order_status_logs not present, change of order {} not persisted", order.id);
            return;
        }

        if let Err(e) = StatusChangeLogEntry::create(
            &self.pool,
            &order.id,
            &order.status,
            new_status,
            updated_by,
            at,
        )
        .await
        {
            log_database_error(
                "INSERT",
                "order_status_logs",
                &e.to_string(),
                Some(&format!("order {}", order.id)),
            );
        }
    }

    /// Changes recorded for an order, oldest first. Empty on the legacy schema.
    pub async fn status_history(&self, order_id: &str) -> Result<Vec<StatusChangeLogEntry>, OrderStatusError> {
        if !self.capabilities.has_status_log {
            return Ok(Vec::new());
        }
        Ok(StatusChangeLogEntry::find_by_order(&self.pool, order_id).await?)
    }

    pub async fn check_timeout_orders(&self) -> Result<Vec<TimeoutInfo>, OrderStatusError> {
        self.check_timeout_orders_at(Utc::now()).await
    }

    /// Timeout scan evaluated against an explicit clock.
    pub async fn check_timeout_orders_at(&self, now: DateTime<Utc>) -> Result<Vec<TimeoutInfo>, OrderStatusError> {
        let orders = Order::find_excluding_statuses(&self.pool, &TERMINAL_STATUSES, &self.capabilities).await?;
        let mut configs: BTreeMap<String, StatusConfig> = BTreeMap::new();
        let mut timed_out = Vec::new();

        for order in orders {
            if is_terminal(&order.status) {
                continue;
            }

            if !configs.contains_key(&order.status) {
                let config = self.get_status_config(&order.status).await;
                configs.insert(order.status.clone(), config);
            }
            let Some(timeout_seconds) = configs
                .get(&order.status)
                .and_then(StatusConfig::timeout_seconds)
            else {
                continue;
            };

            let Some(updated_at) = order.updated_at_utc() else {
                warn!("Order {} has unparseable updated_at '{}'", order.id, order.updated_at);
                continue;
            };

            let elapsed_seconds = (now - updated_at).num_seconds();
            if elapsed_seconds > timeout_seconds {
                timed_out.push(TimeoutInfo {
                    order_id: order.id,
                    status: order.status,
                    updated_at: order.updated_at,
                    elapsed_seconds,
                    timeout_seconds,
                });
            }
        }

        Ok(timed_out)
    }

    /// Applies the automatic transition for every timed-out order.
    ///
    /// Returns the number of timed-out orders evaluated, not the number moved.
    pub async fn handle_timeout_orders(&self) -> Result<usize, OrderStatusError> {
        let timed_out = self.check_timeout_orders().await?;

        for info in &timed_out {
            log_timeout(&info.order_id, &info.status, info.elapsed_seconds, info.timeout_seconds);

            let Some(target) = timeout_target(&info.status) else {
                debug!("No automatic action for order {} in '{}'", info.order_id, info.status);
                continue;
            };

            if !self.can_transition_to(&info.status, target).await {
                warn!(
                    "Automatic transition {} -> {} not allowed for order {}",
                    info.status, target, info.order_id
                );
                continue;
            }

            match self.transition_status(&info.order_id, target, AUTO_TIMEOUT_ACTOR).await {
                Ok(true) => info!("Order {} timed out, moved to {}", info.order_id, target),
                Ok(false) => warn!("Order {} timed out but was not updated", info.order_id),
                Err(e) => warn!("Failed to resolve timed-out order {}: {}", info.order_id, e),
            }
        }

        Ok(timed_out.len())
    }
}
