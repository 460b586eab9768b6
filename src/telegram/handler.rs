use crate::models::{Content, IncomingMessage, WatchMode};
use crate::notifier::{Notifier, Outbox};
use crate::telegram::formatter::format_notification_line;
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Decides which incoming messages are worth a notification.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    following: HashSet<u64>,
    watch_media: bool,
}

impl WatchFilter {
    pub fn new(following: HashSet<u64>, mode: WatchMode) -> Self {
        Self {
            following,
            watch_media: mode.watches_media(),
        }
    }

    pub fn matches(&self, msg: &IncomingMessage) -> bool {
        if !msg.chat_kind.is_group() {
            return false;
        }
        let Some(sender) = &msg.sender else {
            return false;
        };
        if !self.following.contains(&sender.id) {
            return false;
        }
        match msg.content {
            Content::Text(_) => true,
            Content::Media(_) => self.watch_media,
            Content::Unsupported => false,
        }
    }
}

pub struct WatchHandler<O> {
    filter: WatchFilter,
    notifier: Notifier<O>,
}

impl<O: Outbox> WatchHandler<O> {
    pub fn new(filter: WatchFilter, notifier: Notifier<O>) -> Self {
        Self { filter, notifier }
    }

    pub fn notifier(&self) -> &Notifier<O> {
        &self.notifier
    }

    /// Always returns `Continue`: other handlers must still see the update,
    /// even when notifying failed.
    pub async fn on_message(&self, msg: &IncomingMessage) -> ControlFlow<()> {
        if !self.filter.matches(msg) {
            return ControlFlow::Continue(());
        }

        let sender = msg.sender.as_ref().map_or(0, |s| s.id);
        tracing::info!(
            sender,
            chat_id = msg.chat_id,
            message_id = msg.message_id,
            "Followed account posted"
        );

        let line = format_notification_line(msg);
        match self.notifier.submit(line).await {
            Ok(delivery) => {
                tracing::debug!(
                    message_id = delivery.message_id().0,
                    ?delivery,
                    "Notification delivered"
                );
            }
            Err(e) => {
                tracing::error!(sender, chat_id = msg.chat_id, "Notification failed: {e}");
            }
        }

        ControlFlow::Continue(())
    }
}
