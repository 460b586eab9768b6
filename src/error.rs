use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to send notification: {0}")]
    Send(#[source] BoxError),

    #[error("Failed to edit notification: {0}")]
    Edit(#[source] BoxError),
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Failed to start {session} session: {source}")]
    SessionStart {
        session: &'static str,
        #[source]
        source: teloxide::RequestError,
    },
}
