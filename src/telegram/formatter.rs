use crate::models::{Content, IncomingMessage};

/// `t.me` deep links address a group as this offset minus its chat id.
pub const DEEP_LINK_OFFSET: i64 = 1_000_000_000_000;

const EXCERPT_CHARS: usize = 20;

/// One notification line: linked bold sender name, then a text excerpt or
/// the kind of media that was sent.
pub fn format_notification_line(msg: &IncomingMessage) -> String {
    let name = msg
        .sender
        .as_ref()
        .map_or("", |sender| sender.first_name.as_str());

    let summary = match &msg.content {
        Content::Text(text) => escape_html(&excerpt(text)),
        Content::Media(kind) => format!("sent a {}", kind.label()),
        Content::Unsupported => "sent a error".to_string(),
    };

    format!(
        "<a href=\"{link}\"><b>{name}</b></a>: {summary}",
        link = message_link(msg.chat_id, msg.message_id),
        name = escape_html(name),
    )
}

pub fn message_link(chat_id: i64, message_id: i32) -> String {
    format!("http://t.me/{}/{message_id}", DEEP_LINK_OFFSET - chat_id)
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
