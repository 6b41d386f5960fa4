//! Polymarket Gamma feed.
//!
//! Market discovery only: the listing endpoint is free and
//! unauthenticated. Records are passed through as raw JSON so the
//! normalizer can apply its own fallbacks field by field.
//!
//! Gamma API: https://gamma-api.polymarket.com

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use super::MarketFeed;
use crate::config::FeedConfig;
use crate::types::PolyEdgeError;

pub struct GammaFeed {
    http: Client,
    base_url: String,
    limit: u32,
}

impl GammaFeed {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Gamma HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
        })
    }

    /// Endpoint for the market listing.
    pub fn markets_url(&self) -> String {
        format!("{}/markets", self.base_url)
    }

    /// Pull the record list out of a response body.
    ///
    /// Accepts a bare array, or an object wrapping the array under
    /// `data` or `markets`.
    pub fn extract_records(body: Value) -> Result<Vec<Value>> {
        match body {
            Value::Array(items) => Ok(items),
            Value::Object(mut map) => {
                for key in ["data", "markets"] {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return Ok(items);
                    }
                }
                anyhow::bail!("Gamma response object has no market array")
            }
            other => anyhow::bail!("Unexpected Gamma response shape: {}", type_name(&other)),
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl MarketFeed for GammaFeed {
    async fn fetch_raw(&self) -> Result<Vec<Value>> {
        let url = self.markets_url();
        let limit = self.limit.to_string();
        debug!(url = %url, "Fetching markets from Gamma API");

        let resp = self.http
            .get(&url)
            .query(&[
                ("active", "true"),
                ("closed", "false"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("Gamma API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PolyEdgeError::Feed(format!("Gamma API error {status}: {body}")).into());
        }

        let body: Value = resp.json().await
            .context("Failed to parse Gamma markets response")?;
        let records = Self::extract_records(body)?;

        info!(count = records.len(), "Fetched raw Gamma markets");
        Ok(records)
    }

    fn name(&self) -> &str {
        "gamma"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
