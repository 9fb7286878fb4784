//! # notify-adapters
//!
//! Implementations of the `Notifier` port.
//!
//! - `LogNotifier`: writes the message to the tracing pipeline. Used when no
//!   outbound channel is configured.
//! - `TelegramNotifier`: Bot API `sendMessage`, behind `notify-telegram`.

#[cfg(feature = "notify-telegram")]
pub mod telegram;

#[cfg(feature = "notify-telegram")]
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use domains::{DomainResult, Notifier};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> DomainResult<()> {
        info!(target: "verdespace::notify", message = text, "notification");
        Ok(())
    }
}
