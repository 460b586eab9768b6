use serde::Deserialize;
use teloxide::types::{Message, MessageId};

/// Which of the two watch behaviours the coalescing engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Text and media to a fixed owner, lines accumulate into one message.
    #[default]
    Broadcast,
    /// Text only to the owner, each edit shows just the newest line.
    Mirror,
}

impl WatchMode {
    pub const fn watches_media(self) -> bool {
        matches!(self, Self::Broadcast)
    }

    pub const fn accumulates(self) -> bool {
        matches!(self, Self::Broadcast)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: u64,
    pub first_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Sticker,
    Voice,
    Document,
    Audio,
    Contact,
}

impl MediaKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Sticker => "sticker",
            Self::Voice => "voice",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Contact => "contact",
        }
    }

    /// Animations also carry a document, so the check order matters.
    fn of(msg: &Message) -> Option<Self> {
        if msg.photo().is_some() {
            Some(Self::Photo)
        } else if msg.video().is_some() {
            Some(Self::Video)
        } else if msg.animation().is_some() {
            Some(Self::Animation)
        } else if msg.sticker().is_some() {
            Some(Self::Sticker)
        } else if msg.voice().is_some() {
            Some(Self::Voice)
        } else if msg.document().is_some() {
            Some(Self::Document)
        } else if msg.audio().is_some() {
            Some(Self::Audio)
        } else if msg.contact().is_some() {
            Some(Self::Contact)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Media(MediaKind),
    Unsupported,
}

/// Client-independent view of an incoming message update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub message_id: i32,
    pub sender: Option<Sender>,
    pub content: Content,
}

impl From<&Message> for IncomingMessage {
    fn from(msg: &Message) -> Self {
        let chat_kind = if msg.chat.is_group() {
            ChatKind::Group
        } else if msg.chat.is_supergroup() {
            ChatKind::Supergroup
        } else if msg.chat.is_channel() {
            ChatKind::Channel
        } else {
            ChatKind::Private
        };

        let content = match (msg.text(), MediaKind::of(msg)) {
            (Some(text), _) => Content::Text(text.to_string()),
            (None, Some(kind)) => Content::Media(kind),
            (None, None) => Content::Unsupported,
        };

        Self {
            chat_id: msg.chat.id.0,
            chat_kind,
            message_id: msg.id.0,
            sender: msg.from.as_ref().map(|user| Sender {
                id: user.id.0,
                first_name: user.first_name.clone(),
            }),
            content,
        }
    }
}

/// What a submit did with the outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent(MessageId),
    Edited(MessageId),
}

impl Delivery {
    pub const fn message_id(self) -> MessageId {
        match self {
            Self::Sent(id) | Self::Edited(id) => id,
        }
    }
}
