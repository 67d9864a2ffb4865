//! Status values, their display metadata and the built-in transition table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::database::models::EntityAttributes;

/// Entity-store namespace holding one entity per status value.
pub const STATUS_CONFIG_NAMESPACE: &str = "order_status_config";

/// Actor recorded for transitions applied by the timeout sweep.
pub const AUTO_TIMEOUT_ACTOR: &str = "auto_timeout";

pub const ATTEMPTING: &str = "attempting";
pub const PENDING: &str = "pending";
pub const CONFIRMED: &str = "confirmed";
pub const IN_PROGRESS: &str = "in_progress";
pub const COMPLETED: &str = "completed";
pub const CANCELLED: &str = "cancelled";
pub const REJECTED: &str = "rejected";
pub const NO_SHOW: &str = "no_show";
pub const MERCHANT_UNAVAILABLE: &str = "merchant_unavailable";
pub const DISPUTE: &str = "dispute";
pub const EVALUATED: &str = "evaluated";

/// Statuses never considered by the timeout scan.
pub const TERMINAL_STATUSES: [&str; 3] = [COMPLETED, CANCELLED, EVALUATED];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Seconds an order may stay in this status before the timeout sweep acts
    #[serde(default)]
    pub auto_timeout: Option<i64>,
    /// `None` means no list is configured; `Some(vec![])` means terminal
    #[serde(default)]
    pub next_statuses: Option<Vec<String>>,
}

fn default_color() -> String {
    "#6c757d".to_string()
}

/// Where a [`StatusConfig`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Store,
    Default,
    Unknown,
}

/// A status configuration tagged with the tier of the lookup chain that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatusConfig {
    pub config: StatusConfig,
    pub source: ConfigSource,
}

impl StatusConfig {
    /// Shape used for a status neither the store nor the defaults know about.
    pub fn unknown(status: &str) -> Self {
        Self {
            name: status.to_string(),
            description: String::new(),
            color: default_color(),
            auto_timeout: None,
            next_statuses: None,
        }
    }

    /// Builds a config from entity-store attributes; missing attributes take defaults.
    pub fn from_attributes(status: &str, attributes: &EntityAttributes) -> Result<Self, serde_json::Error> {
        let mut attributes = attributes.clone();
        attributes
            .entry("name")
            .or_insert_with(|| serde_json::Value::String(status.to_string()));
        serde_json::from_value(serde_json::Value::Object(attributes))
    }

    pub fn to_attributes(&self) -> EntityAttributes {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => EntityAttributes::new(),
        }
    }

    pub fn allows(&self, target: &str) -> Option<bool> {
        self.next_statuses
            .as_ref()
            .map(|next| next.iter().any(|status| status == target))
    }

    pub fn timeout_seconds(&self) -> Option<i64> {
        self.auto_timeout.filter(|seconds| *seconds > 0)
    }
}

pub fn is_terminal(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

/// Status the timeout sweep moves an order to, if any.
pub fn timeout_target(status: &str) -> Option<&'static str> {
    match status {
        ATTEMPTING => Some(MERCHANT_UNAVAILABLE),
        PENDING => Some(CANCELLED),
        _ => None,
    }
}

pub fn default_status_config(status: &str) -> Option<StatusConfig> {
    let (name, description, color, auto_timeout, next): (&str, &str, &str, Option<i64>, &[&str]) =
        match status {
            ATTEMPTING => (
                "Contacting merchant",
                "Waiting for the merchant to pick up the request",
                "#17a2b8",
                Some(300),
                &[PENDING, CANCELLED, MERCHANT_UNAVAILABLE],
            ),
            PENDING => (
                "Pending",
                "Waiting for merchant confirmation",
                "#ffc107",
                Some(86_400),
                &[CONFIRMED, REJECTED, CANCELLED],
            ),
            CONFIRMED => (
                "Confirmed",
                "Merchant accepted the booking",
                "#007bff",
                None,
                &[IN_PROGRESS, CANCELLED, NO_SHOW],
            ),
            IN_PROGRESS => (
                "In progress",
                "Service is being delivered",
                "#6610f2",
                None,
                &[COMPLETED, DISPUTE],
            ),
            COMPLETED => (
                "Completed",
                "Service delivered",
                "#28a745",
                None,
                &[EVALUATED, DISPUTE],
            ),
            CANCELLED => ("Cancelled", "Order was cancelled", "#dc3545", None, &[]),
            REJECTED => ("Rejected", "Merchant declined the booking", "#dc3545", None, &[]),
            NO_SHOW => ("No show", "Customer did not turn up", "#fd7e14", None, &[DISPUTE]),
            MERCHANT_UNAVAILABLE => (
                "Merchant unavailable",
                "Merchant did not respond in time",
                "#6c757d",
                None,
                &[ATTEMPTING, CANCELLED],
            ),
            DISPUTE => (
                "Dispute",
                "Outcome is being contested",
                "#e83e8c",
                None,
                &[COMPLETED, CANCELLED],
            ),
            EVALUATED => ("Evaluated", "Customer left a review", "#20c997", None, &[]),
            _ => return None,
        };

    Some(StatusConfig {
        name: name.to_string(),
        description: description.to_string(),
        color: color.to_string(),
        auto_timeout,
        next_statuses: Some(next.iter().map(|s| s.to_string()).collect()),
    })
}

pub fn default_status_configs() -> BTreeMap<String, StatusConfig> {
    [
        ATTEMPTING,
        PENDING,
        CONFIRMED,
        IN_PROGRESS,
        COMPLETED,
        CANCELLED,
        REJECTED,
        NO_SHOW,
        MERCHANT_UNAVAILABLE,
        DISPUTE,
        EVALUATED,
    ]
    .into_iter()
    .filter_map(|status| default_status_config(status).map(|config| (status.to_string(), config)))
    .collect()
}
