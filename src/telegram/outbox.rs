use crate::notifier::Outbox;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};

impl Outbox for Bot {
    type Error = teloxide::RequestError;

    async fn send_html(&self, chat: ChatId, text: &str) -> Result<MessageId, Self::Error> {
        let msg = self
            .send_message(chat, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(msg.id)
    }

    async fn edit_html(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> Result<(), Self::Error> {
        self.edit_message_text(chat, message, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}
