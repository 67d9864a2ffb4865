//! Telegram MarkdownV2 escaping for notification text.

const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes every MarkdownV2 special character so `text` renders literally.
///
/// # Example
/// ```
/// use order_status_service::utils::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("Pending (merchant)"), "Pending \\(merchant\\)");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes text placed inside a `` `code` `` span, where only `` ` `` and `\` are special.
pub fn escape_code(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}
