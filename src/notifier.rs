use crate::error::NotifyError;
use crate::models::{Delivery, WatchMode};
use std::time::Duration;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Telegram rejects message bodies longer than this.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Sends and edits HTML notifications on behalf of the [`Notifier`].
pub trait Outbox: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send_html(
        &self,
        chat: ChatId,
        text: &str,
    ) -> impl Future<Output = Result<MessageId, Self::Error>> + Send;

    fn edit_html(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescePolicy {
    pub window: Duration,
    pub mode: WatchMode,
    pub refresh_on_edit: bool,
}

impl Default for CoalescePolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            mode: WatchMode::Broadcast,
            refresh_on_edit: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Plan {
    Send { body: String },
    Edit { message: MessageId, body: String },
}

#[derive(Debug, Default)]
pub struct NotificationState {
    last_send: Option<Instant>,
    pending_lines: Vec<String>,
    outbound: Option<MessageId>,
}

impl NotificationState {
    pub fn outbound(&self) -> Option<MessageId> {
        self.outbound
    }

    pub fn pending_lines(&self) -> &[String] {
        &self.pending_lines
    }

    /// An event is recent when strictly less than the window has passed
    /// since the last send.
    fn is_recent(&self, now: Instant, window: Duration) -> bool {
        self.last_send
            .is_some_and(|sent| now.saturating_duration_since(sent) < window)
    }

    fn plan(&self, now: Instant, policy: &CoalescePolicy, line: &str) -> Plan {
        let Some(message) = self.outbound.filter(|_| self.is_recent(now, policy.window)) else {
            return Plan::Send {
                body: line.to_string(),
            };
        };

        if !policy.mode.accumulates() {
            return Plan::Edit {
                message,
                body: line.to_string(),
            };
        }

        let mut body = self.pending_lines.join("\n");
        body.push('\n');
        body.push_str(line);
        if body.chars().count() > MAX_MESSAGE_CHARS {
            return Plan::Send {
                body: line.to_string(),
            };
        }
        Plan::Edit { message, body }
    }

    fn record_sent(&mut self, message: MessageId, line: String, now: Instant) {
        self.pending_lines = vec![line];
        self.outbound = Some(message);
        self.last_send = Some(now);
    }

    fn record_edited(&mut self, line: String, now: Instant, policy: &CoalescePolicy) {
        if policy.mode.accumulates() {
            self.pending_lines.push(line);
        } else {
            self.pending_lines = vec![line];
        }
        if policy.refresh_on_edit {
            self.last_send = Some(now);
        }
    }
}

/// Coalesces notification lines for one recipient: bursts inside the window
/// become edits of a single outbound message.
pub struct Notifier<O> {
    outbox: O,
    recipient: ChatId,
    policy: CoalescePolicy,
    state: Mutex<NotificationState>,
}

impl<O: Outbox> Notifier<O> {
    pub fn new(outbox: O, recipient: ChatId, policy: CoalescePolicy) -> Self {
        Self {
            outbox,
            recipient,
            policy,
            state: Mutex::new(NotificationState::default()),
        }
    }

    /// The lock stays held across the client call so concurrent handlers
    /// observe each other's sends.
    pub async fn submit(&self, line: String) -> Result<Delivery, NotifyError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        match state.plan(now, &self.policy, &line) {
            Plan::Send { body } => {
                let message = self
                    .outbox
                    .send_html(self.recipient, &body)
                    .await
                    .map_err(|e| NotifyError::Send(Box::new(e)))?;
                tracing::debug!(
                    chat_id = self.recipient.0,
                    message_id = message.0,
                    "Sent new notification"
                );
                state.record_sent(message, line, now);
                Ok(Delivery::Sent(message))
            }
            Plan::Edit { message, body } => {
                self.outbox
                    .edit_html(self.recipient, message, &body)
                    .await
                    .map_err(|e| NotifyError::Edit(Box::new(e)))?;
                tracing::debug!(
                    chat_id = self.recipient.0,
                    message_id = message.0,
                    lines = state.pending_lines.len() + 1,
                    "Edited notification"
                );
                state.record_edited(line, now, &self.policy);
                Ok(Delivery::Edited(message))
            }
        }
    }

    /// Runs `f` against the current state under the lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&NotificationState) -> R) -> R {
        f(&*self.state.lock().await)
    }
}
