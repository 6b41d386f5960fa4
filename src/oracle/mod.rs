//! Advisory oracle: multi-model consensus on a single market.
//!
//! Defines the `AdvisorySource` trait, implemented for Anthropic and
//! Gemini, and the `Oracle` that fans a market out to every configured
//! source, folds the surviving votes into one verdict, and falls back
//! to a heuristic verdict when nothing usable comes back.

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod prompt;
pub mod verdict;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use secrecy::SecretString;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{AppConfig, OracleConfig};
use crate::types::{AdvisoryVerdict, Analysis, Market, PolyEdgeError};

use anthropic::AnthropicAdvisor;
pub use client::SourceUsage;
use gemini::GeminiAdvisor;

/// An independent model that can judge a market.
#[async_trait]
pub trait AdvisorySource: Send + Sync {
    /// Produce a verdict for one market and its analysis.
    async fn advise(&self, market: &Market, analysis: &Analysis) -> Result<AdvisoryVerdict>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Calls and spend so far. Sources without metering report none.
    fn usage(&self) -> Option<SourceUsage> {
        None
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

pub struct Oracle {
    sources: Vec<Box<dyn AdvisorySource>>,
    source_timeout: Duration,
    rng: Mutex<StdRng>,
}

impl Oracle {
    pub fn new(sources: Vec<Box<dyn AdvisorySource>>, source_timeout: Duration) -> Self {
        Self {
            sources,
            source_timeout,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic fallback confidence, for tests and replays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Build the oracle from config. Sources whose API key is missing are
    /// left out; an oracle with no sources always answers with the fallback.
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let mut sources: Vec<Box<dyn AdvisorySource>> = Vec::new();

        if config.anthropic.enabled {
            match AppConfig::resolve_optional(&config.anthropic.api_key_env) {
                Some(key) => sources.push(Box::new(AnthropicAdvisor::new(
                    SecretString::new(key),
                    config.anthropic.model.clone(),
                    config.anthropic.max_tokens,
                )?)),
                None => warn!(env = %config.anthropic.api_key_env, "Anthropic key not set, source disabled"),
            }
        }

        if config.gemini.enabled {
            match AppConfig::resolve_optional(&config.gemini.api_key_env) {
                Some(key) => sources.push(Box::new(GeminiAdvisor::new(
                    SecretString::new(key),
                    config.gemini.model.clone(),
                    config.gemini.max_tokens,
                )?)),
                None => warn!(env = %config.gemini.api_key_env, "Gemini key not set, source disabled"),
            }
        }

        let oracle = Self::new(sources, Duration::from_secs(config.source_timeout_secs));
        info!(sources = ?oracle.source_names(), "Oracle ready");
        Ok(oracle)
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Usage of every metered source, in registration order.
    pub fn usage(&self) -> Vec<SourceUsage> {
        self.sources.iter().filter_map(|s| s.usage()).collect()
    }

    /// Total advisory spend across sources, in USD.
    pub fn total_cost(&self) -> f64 {
        self.usage().iter().map(|u| u.cost_usd).sum()
    }

    /// Heuristic verdict from the market and analysis alone.
    pub fn fallback(&self, market: &Market, analysis: &Analysis) -> AdvisoryVerdict {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        verdict::fallback_verdict(market, analysis, &mut *rng)
    }

    /// Ask every source concurrently and combine what comes back.
    ///
    /// A source that errors, returns an unusable verdict, or runs past the
    /// per-source timeout simply casts no vote. Never fails.
    pub async fn consult(&self, market: &Market, analysis: &Analysis) -> AdvisoryVerdict {
        let calls = self.sources.iter().map(|source| async move {
            let outcome = tokio::time::timeout(self.source_timeout, source.advise(market, analysis)).await;
            match outcome {
                Ok(Ok(v)) => Some(v),
                Ok(Err(e)) => {
                    let err = PolyEdgeError::Advisory {
                        source_name: source.name().to_string(),
                        message: format!("{e:#}"),
                    };
                    warn!(market_id = %market.id, error = %err, "Advisory source failed");
                    None
                }
                Err(_) => {
                    warn!(
                        market_id = %market.id,
                        source = source.name(),
                        timeout_secs = self.source_timeout.as_secs(),
                        "Advisory source timed out"
                    );
                    None
                }
            }
        });

        let votes: Vec<AdvisoryVerdict> = join_all(calls).await.into_iter().flatten().collect();

        match verdict::aggregate(&votes) {
            Some(consensus) => {
                info!(
                    market_id = %market.id,
                    votes = votes.len(),
                    sources = self.sources.len(),
                    verdict = %consensus,
                    "Oracle consensus"
                );
                consensus
            }
            None => {
                let fallback = self.fallback(market, analysis);
                info!(market_id = %market.id, verdict = %fallback, "No usable votes, heuristic verdict");
                fallback
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
