use anyhow::{anyhow, Result};
use std::env;

use crate::services::order_status::TransitionPolicy;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/orders.db";
const DEFAULT_TIMEOUT_SCHEDULE: &str = "0 * * * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_port: u16,
    /// Notifications are only logged when no token is configured
    pub telegram_bot_token: Option<String>,
    pub admin_chat_id: Option<i64>,
    /// Cron expression (with seconds) for the timeout sweep
    pub timeout_check_schedule: String,
    pub transition_policy: TransitionPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let database_url = if database_url.trim().is_empty() {
            DEFAULT_DATABASE_URL.to_string()
        } else {
            database_url
        };

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let admin_chat_id = match env::var("ADMIN_CHAT_ID") {
            Ok(value) if !value.trim().is_empty() => Some(
                value.trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid ADMIN_CHAT_ID"))?,
            ),
            _ => None,
        };

        let timeout_check_schedule = env::var("TIMEOUT_CHECK_SCHEDULE")
            .ok()
            .filter(|schedule| !schedule.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SCHEDULE.to_string());

        let transition_policy = match env::var("STRICT_TRANSITIONS") {
            Ok(value) => match value.trim().to_lowercase().as_str() {
                "" | "0" | "false" | "no" => TransitionPolicy::Permissive,
                "1" | "true" | "yes" => TransitionPolicy::Strict,
                _ => return Err(anyhow!("Invalid STRICT_TRANSITIONS")),
            },
            Err(_) => TransitionPolicy::Permissive,
        };

        Ok(Config {
            database_url,
            http_port,
            telegram_bot_token,
            admin_chat_id,
            timeout_check_schedule,
            transition_policy,
        })
    }
}
