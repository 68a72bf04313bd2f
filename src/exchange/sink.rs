//! Exchange publication.
//!
//! # Responsibilities
//! - Hand a completed `Exchange` to whatever consumes it downstream
//! - Report transport and encoding failures without retrying
//!
//! # Sinks
//! - `LogSink`: JSON document on the `shadow_proxy::exchange` tracing target
//! - `HttpSink`: JSON document POSTed to a collector endpoint
//! - `ChannelSink`: in-process `mpsc` channel
//! - `NullSink`: discards

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::exchange::Exchange;

/// Errors from publishing an exchange.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The downstream transport rejected or never received the exchange.
    #[error("publish failed: {0}")]
    Connection(String),

    /// The exchange could not be encoded.
    #[error("failed to encode exchange: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Accepts completed exchanges for asynchronous publication.
#[async_trait]
pub trait ExchangeSink: Send + Sync {
    async fn publish(&self, exchange: Exchange) -> Result<(), PublishError>;
}

/// Emits each exchange as a JSON document through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl ExchangeSink for LogSink {
    async fn publish(&self, exchange: Exchange) -> Result<(), PublishError> {
        let document = serde_json::to_string(&exchange)?;
        tracing::info!(target: "shadow_proxy::exchange", exchange = %document, "Exchange recorded");
        Ok(())
    }
}

/// Drops every exchange.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

#[async_trait]
impl ExchangeSink for NullSink {
    async fn publish(&self, _exchange: Exchange) -> Result<(), PublishError> {
        Ok(())
    }
}

/// POSTs each exchange as JSON to a collector URL.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ExchangeSink for HttpSink {
    async fn publish(&self, exchange: Exchange) -> Result<(), PublishError> {
        let body = serde_json::to_vec(&exchange)?;
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Connection(format!(
                "collector {} returned {}",
                self.url, status
            )));
        }
        Ok(())
    }
}

/// Forwards each exchange into a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Exchange>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Exchange>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ExchangeSink for ChannelSink {
    async fn publish(&self, exchange: Exchange) -> Result<(), PublishError> {
        self.tx
            .send(exchange)
            .await
            .map_err(|_| PublishError::Connection("exchange channel closed".to_string()))
    }
}
