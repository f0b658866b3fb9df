//! Outbound notification channel.

pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::retry::Transient;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),
    #[error("notification endpoint returned HTTP {0}")]
    Http(u16),
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl Transient for NotifyError {
    fn is_transient(&self) -> bool {
        matches!(self, NotifyError::Transport(_) | NotifyError::Http(_))
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes messages to the log. Used when no chat is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(message = %text, "notification");
        Ok(())
    }
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Box<N> {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        (**self).send(text).await
    }
}
