/// Consistent log line formats
pub mod logging;
/// Telegram MarkdownV2 escaping
pub mod markdown;
