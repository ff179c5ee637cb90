pub mod telegram;

use anyhow::Result;

use crate::model::AlertKind;

pub use telegram::TelegramNotifier;

/// A formatted alert ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub ticker: String,
    pub kind: AlertKind,
    pub text: String,
}

/// Delivers alerts. `Ok(())` means delivered; retries live inside the implementation.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &AlertMessage) -> Result<()>;
}

/// Dry-run notifier: logs the alert and reports success.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, msg: &AlertMessage) -> Result<()> {
        tracing::info!(target: "notify", ticker = %msg.ticker, kind = %msg.kind, "alert (dry run):\n{}", msg.text);
        Ok(())
    }
}
