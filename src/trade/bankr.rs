//! Bankr execute endpoint.
//!
//! POSTs `{prompt, wallet, chain}` where `prompt` is the intent text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::TradeSink;
use crate::config::{AppConfig, TradeConfig};
use crate::types::{PolyEdgeError, TradeIntent};

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    prompt: &'a str,
    wallet: Option<&'a str>,
    chain: &'a str,
}

pub struct BankrSink {
    http: Client,
    url: String,
    wallet: Option<String>,
    chain: String,
}

impl BankrSink {
    pub fn new(url: impl Into<String>, wallet: Option<String>, chain: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Bankr HTTP client")?;

        Ok(Self {
            http,
            url: url.into(),
            wallet,
            chain: chain.into(),
        })
    }

    /// Wallet address is read from the env var named in config.
    pub fn from_config(url: &str, config: &TradeConfig) -> Result<Self> {
        Self::new(url, AppConfig::resolve_optional(&config.wallet_env), config.chain.clone())
    }
}

#[async_trait]
impl TradeSink for BankrSink {
    async fn deliver(&self, intent: &TradeIntent) -> Result<(), PolyEdgeError> {
        let body = ExecuteRequest {
            prompt: &intent.text,
            wallet: self.wallet.as_deref(),
            chain: &self.chain,
        };

        debug!(url = %self.url, market_id = %intent.market_id, "Posting trade intent");

        let resp = self.http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PolyEdgeError::TradeSink(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PolyEdgeError::TradeSink(format!("HTTP {status}: {text}")));
        }
        Ok(())
    }
}
