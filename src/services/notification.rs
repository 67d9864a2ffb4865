use async_trait::async_trait;
use teloxide::{prelude::*, types::ParseMode};
use tracing::{info, warn};

use crate::database::models::Order;
use crate::services::status_config::StatusConfig;
use crate::utils::markdown::{escape_code, escape_markdown};

/// Recipients told about a status change. Implementations may fail freely;
/// [`dispatch_status_change`] never lets a failure escape.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()>;
    async fn notify_merchant(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()>;
    async fn notify_admin(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()>;
}

/// Calls every hook in turn and returns how many of them failed.
pub async fn dispatch_status_change(
    notifier: &dyn Notifier,
    order: &Order,
    new_status: &str,
    config: &StatusConfig,
) -> usize {
    let results = [
        ("user", notifier.notify_user(order, new_status, config).await),
        ("merchant", notifier.notify_merchant(order, new_status, config).await),
        ("admin", notifier.notify_admin(order, new_status, config).await),
    ];

    let mut failures = 0;
    for (recipient, result) in results {
        if let Err(e) = result {
            failures += 1;
            warn!(
                "NOTIFY_ERROR: {} notification for order {} ({}) failed: {}",
                recipient, order.id, new_status, e
            );
        }
    }
    failures
}

/// Writes notifications to the log only. Used when no bot token is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_user(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()> {
        info!("NOTIFY: user of order {} -> {} ({})", order.id, new_status, config.name);
        Ok(())
    }

    async fn notify_merchant(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()> {
        info!("NOTIFY: merchant of order {} -> {} ({})", order.id, new_status, config.name);
        Ok(())
    }

    async fn notify_admin(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()> {
        info!("NOTIFY: admin of order {} -> {} ({})", order.id, new_status, config.name);
        Ok(())
    }
}

/// Sends status updates as Telegram messages.
///
/// Users and merchants are reached through the chat ids stored on the order;
/// a hook whose chat id is missing is a no-op.
pub struct TelegramNotifier {
    bot: Bot,
    admin_chat_id: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, admin_chat_id: Option<i64>) -> Self {
        Self { bot, admin_chat_id }
    }

    async fn send(&self, chat_id: i64, text: String) -> anyhow::Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_user(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()> {
        let Some(chat_id) = order.user_chat_id else {
            return Ok(());
        };
        self.send(chat_id, format_user_message(order, new_status, config)).await
    }

    async fn notify_merchant(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()> {
        let Some(chat_id) = order.merchant_chat_id else {
            return Ok(());
        };
        self.send(chat_id, format_merchant_message(order, new_status, config)).await
    }

    async fn notify_admin(&self, order: &Order, new_status: &str, config: &StatusConfig) -> anyhow::Result<()> {
        let Some(chat_id) = self.admin_chat_id else {
            return Ok(());
        };
        self.send(chat_id, format_admin_message(order, new_status, config)).await
    }
}

pub fn format_user_message(order: &Order, new_status: &str, config: &StatusConfig) -> String {
    let mut text = format!(
        "📦 **Your order is now {}**\n\n🔗 Order ID: `{}`",
        escape_markdown(&config.name),
        escape_code(&order.id)
    );
    if !config.description.is_empty() {
        text.push_str(&format!("\n\nℹ️ {}", escape_markdown(&config.description)));
    }
    if new_status != config.name {
        text.push_str(&format!("\n🏷️ Status: `{}`", escape_code(new_status)));
    }
    text
}

pub fn format_merchant_message(order: &Order, new_status: &str, config: &StatusConfig) -> String {
    format!(
        "🛎️ **Order update: {}**\n\n🔗 Order ID: `{}`\n🏷️ Status: `{}`",
        escape_markdown(&config.name),
        escape_code(&order.id),
        escape_code(new_status)
    )
}

pub fn format_admin_message(order: &Order, new_status: &str, config: &StatusConfig) -> String {
    format!(
        "🛠️ **Order {}**: `{}` → `{}` \\({}\\)",
        escape_markdown(&order.id),
        escape_code(&order.status),
        escape_code(new_status),
        escape_markdown(&config.name)
    )
}
