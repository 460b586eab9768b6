pub mod error;
pub mod models;
pub mod notifier;
pub mod telegram;
