pub mod formatter;
pub mod handler;
pub mod outbox;
