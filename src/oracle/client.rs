//! HTTP plumbing shared by the advisory sources: client construction,
//! retry with exponential backoff, and usage accounting.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Retries after the first attempt, on 429 / 5xx / transport errors.
pub const MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

/// Whole-request timeout for one attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub fn build_http(source: &str) -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .with_context(|| format!("Failed to build {source} HTTP client"))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send the request built by `make_request`, retrying transient failures.
/// Returns the first successful response.
pub async fn send_with_retry<F>(source: &str, make_request: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = String::new();

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
            debug!(source, attempt, delay_ms = delay, "Retrying advisory API call");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match make_request().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                if !is_retryable(status) {
                    anyhow::bail!("{source} API error {status}: {error_text}");
                }
                warn!(source, status = %status, attempt, error = %error_text, "Retryable advisory API error");
                last_error = format!("HTTP {status}: {error_text}");
            }
            Err(e) => {
                warn!(source, attempt, error = %e, "Advisory request failed");
                last_error = format!("Request error: {e}");
            }
        }
    }

    anyhow::bail!("{source} API failed after {MAX_RETRIES} retries: {last_error}")
}

// ---------------------------------------------------------------------------
// Usage accounting
// ---------------------------------------------------------------------------

/// Approximate per-1K-token prices for a model.
#[derive(Debug, Clone, Copy)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Point-in-time usage of one advisory source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUsage {
    pub source: String,
    pub model: String,
    pub calls: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Default)]
pub struct UsageMeter {
    cost_micros: AtomicU64,
    calls: AtomicU64,
}

impl UsageMeter {
    pub fn record(&self, pricing: Pricing, input_tokens: u32, output_tokens: u32) {
        let cost = (input_tokens as f64 / 1000.0) * pricing.input_per_1k
            + (output_tokens as f64 / 1000.0) * pricing.output_per_1k;
        self.cost_micros.fetch_add((cost * 1_000_000.0) as u64, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Total cumulative cost in USD.
    pub fn cost(&self) -> f64 {
        self.cost_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Successful calls so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn report(&self, source: &str, model: &str) -> SourceUsage {
        SourceUsage {
            source: source.to_string(),
            model: model.to_string(),
            calls: self.calls(),
            cost_usd: self.cost(),
        }
    }
}
