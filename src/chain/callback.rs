use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload handed to the notifier after a bridge transfer was submitted.
#[derive(Debug, Clone, Serialize)]
pub struct TransferEvent {
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount_int: u64,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("callback rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TransferNotifier: Send + Sync {
    async fn notify(&self, event: &TransferEvent) -> Result<(), CallbackError>;
}

/// Posts the event as JSON to a configured URL.
pub struct WebhookNotifier {
    http_client: HttpClient,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = HttpClient::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TransferNotifier for WebhookNotifier {
    async fn notify(&self, event: &TransferEvent) -> Result<(), CallbackError> {
        let resp = self.http_client.post(&self.url).json(event).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CallbackError::Rejected(format!("{} returned {}", self.url, status)));
        }
        info!(tx_hash = %event.tx_hash, "transfer callback delivered");
        Ok(())
    }
}

/// Used when no callback URL is configured.
pub struct LogNotifier;

#[async_trait]
impl TransferNotifier for LogNotifier {
    async fn notify(&self, event: &TransferEvent) -> Result<(), CallbackError> {
        info!(
            tx_hash = %event.tx_hash,
            from = %event.from_address,
            to = %event.to_address,
            amount_int = event.amount_int,
            amount = %event.amount,
            "bridge transfer submitted"
        );
        Ok(())
    }
}
