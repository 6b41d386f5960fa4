//! Google Gemini advisory source.
//!
//! Uses the `generateContent` REST endpoint with JSON response mode.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{self, Pricing, SourceUsage, UsageMeter};
use super::{prompt, verdict, AdvisorySource};
use crate::types::{AdvisoryVerdict, Analysis, Market};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_MAX_TOKENS: u32 = 600;

/// Flash list prices.
const PRICING: Pricing = Pricing { input_per_1k: 0.0003, output_per_1k: 0.0025 };

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [OutPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct OutPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<InPart>,
}

#[derive(Debug, Deserialize)]
struct InPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates.first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

pub struct GeminiAdvisor {
    http: Client,
    api_key: SecretString,
    api_base: String,
    model: String,
    max_tokens: u32,
    usage: UsageMeter,
}

impl GeminiAdvisor {
    pub fn new(api_key: SecretString, model: Option<String>, max_tokens: Option<u32>) -> Result<Self> {
        Ok(Self {
            http: client::build_http("Gemini")?,
            api_key,
            api_base: API_BASE.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            usage: UsageMeter::default(),
        })
    }

    /// Override the `.../v1beta` base (proxies, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(&self.model)
        )
    }

    async fn generate(&self, user_message: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: [Content { role: Some("user"), parts: [OutPart { text: user_message }] }],
            system_instruction: Content { role: None, parts: [OutPart { text: prompt::system_prompt() }] },
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
                response_mime_type: "application/json",
            },
        };
        let url = self.endpoint();

        let response = client::send_with_retry("Gemini", || {
            self.http
                .post(&url)
                .header("x-goog-api-key", self.api_key.expose_secret())
                .json(&request)
        })
        .await?;

        let body: GenerateResponse = response.json().await
            .context("Failed to parse Gemini response")?;
        let meta = &body.usage_metadata;
        self.usage.record(PRICING, meta.prompt_token_count, meta.candidates_token_count);
        Ok(body.text())
    }
}

#[async_trait]
impl AdvisorySource for GeminiAdvisor {
    async fn advise(&self, market: &Market, analysis: &Analysis) -> Result<AdvisoryVerdict> {
        debug!(market_id = %market.id, model = %self.model, "Requesting Gemini verdict");

        let text = self.generate(&prompt::build_prompt(market, analysis))
            .await
            .context("Gemini API call failed")?;

        let parsed = verdict::parse_verdict(&text)?;
        info!(market_id = %market.id, verdict = %parsed, "Gemini verdict received");
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn usage(&self) -> Option<SourceUsage> {
        Some(self.usage.report(self.name(), &self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::new("test-key".to_string())
    }

    #[test]
    fn test_defaults() {
        let advisor = GeminiAdvisor::new(key(), None, None).unwrap();
        assert_eq!(advisor.model_name(), DEFAULT_MODEL);
        assert_eq!(advisor.name(), "gemini");
        assert_eq!(advisor.usage().map(|u| u.calls), Some(0));
    }

    #[test]
    fn test_endpoint_encodes_model() {
        let advisor = GeminiAdvisor::new(key(), Some("gemini 2.5".into()), None)
            .unwrap()
            .with_api_base("http://localhost:1234/");
        assert_eq!(
            advisor.endpoint(),
            "http://localhost:1234/models/gemini%202.5:generateContent"
        );
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = GenerateRequest {
            contents: [Content { role: Some("user"), parts: [OutPart { text: "hi" }] }],
            system_instruction: Content { role: None, parts: [OutPart { text: "sys" }] },
            generation_config: GenerationConfig {
                max_output_tokens: 5,
                response_mime_type: "application/json",
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 5);
    }

    #[test]
    fn test_response_text_extraction() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"x\""},{"text":":1}"}]}}],"usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":4}}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "{\"x\":1}");
        assert_eq!(body.usage_metadata.candidates_token_count, 4);

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }
}
