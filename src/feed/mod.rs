//! Upstream market feeds.
//!
//! Defines the `MarketFeed` trait and provides implementations for:
//! - Gamma: live Polymarket market listing over HTTP (no auth)
//! - Simulated: synthetic records for offline runs and demos
//!
//! Feeds return raw JSON records; the normalizer turns them into markets.

pub mod gamma;
pub mod normalizer;
pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Abstraction over read-only market sources.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Fetch the current batch of raw market records.
    async fn fetch_raw(&self) -> Result<Vec<Value>>;

    /// Feed name for logging and identification.
    fn name(&self) -> &str;
}
