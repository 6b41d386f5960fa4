//! Anthropic Claude advisory source, over the Messages API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{self, Pricing, SourceUsage, UsageMeter};
use super::{prompt, verdict, AdvisorySource};
use crate::types::{AdvisoryVerdict, Analysis, Market};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 600;

/// Sonnet list prices.
const PRICING: Pricing = Pricing { input_per_1k: 0.003, output_per_1k: 0.015 };

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<TextBlock>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct TextBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content.iter().filter_map(|b| b.text.as_deref()).collect()
    }
}

pub struct AnthropicAdvisor {
    http: Client,
    api_key: SecretString,
    api_url: String,
    model: String,
    max_tokens: u32,
    usage: UsageMeter,
}

impl AnthropicAdvisor {
    pub fn new(api_key: SecretString, model: Option<String>, max_tokens: Option<u32>) -> Result<Self> {
        Ok(Self {
            http: client::build_http("Anthropic")?,
            api_key,
            api_url: MESSAGES_URL.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            usage: UsageMeter::default(),
        })
    }

    /// Point the client at a different Messages endpoint (proxies, tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, user_message: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: prompt::system_prompt(),
            messages: [UserTurn { role: "user", content: user_message }],
        };

        let response = client::send_with_retry("Anthropic", || {
            self.http
                .post(&self.api_url)
                .header("x-api-key", self.api_key.expose_secret())
                .header("anthropic-version", API_VERSION)
                .json(&request)
        })
        .await?;

        let body: MessagesResponse = response.json().await
            .context("Failed to parse Anthropic response")?;
        self.usage.record(PRICING, body.usage.input_tokens, body.usage.output_tokens);
        Ok(body.text())
    }
}

#[async_trait]
impl AdvisorySource for AnthropicAdvisor {
    async fn advise(&self, market: &Market, analysis: &Analysis) -> Result<AdvisoryVerdict> {
        debug!(market_id = %market.id, model = %self.model, "Requesting Claude verdict");

        let text = self.complete(&prompt::build_prompt(market, analysis))
            .await
            .context("Anthropic API call failed")?;

        let parsed = verdict::parse_verdict(&text)?;
        info!(market_id = %market.id, verdict = %parsed, "Claude verdict received");
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn usage(&self) -> Option<SourceUsage> {
        Some(self.usage.report(self.name(), &self.model))
    }
}
