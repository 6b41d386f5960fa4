//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, wallet address) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`. Every section
//! has defaults, so a sparse file still yields a runnable scanner.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

use crate::types::PolyEdgeError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub trade: TradeConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Which market source the refresh loop reads from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    #[default]
    Live,
    Simulation,
}

impl std::str::FromStr for FeedMode {
    type Err = PolyEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(FeedMode::Live),
            "simulation" | "sim" => Ok(FeedMode::Simulation),
            other => Err(PolyEdgeError::Config(format!("unknown feed mode: {other}"))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    #[serde(default)]
    pub mode: FeedMode,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f64,
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
    /// Markets generated per cycle in simulation mode.
    #[serde(default = "default_simulated_markets")]
    pub simulated_markets: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            mode: FeedMode::default(),
            refresh_interval_secs: default_refresh_interval(),
            edge_threshold: default_edge_threshold(),
            max_edges: default_max_edges(),
            simulated_markets: default_simulated_markets(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    #[serde(default = "default_feed_limit")]
    pub limit: u32,
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_url(),
            limit: default_feed_limit(),
            timeout_secs: default_feed_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    /// Upper bound on a single advisory source call, retries included.
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
    #[serde(default = "default_anthropic")]
    pub anthropic: AdvisorConfig,
    #[serde(default = "default_gemini")]
    pub gemini: AdvisorConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            source_timeout_secs: default_source_timeout(),
            anthropic: default_anthropic(),
            gemini: default_gemini(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub model: Option<String>,
    pub api_key_env: String,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradeConfig {
    /// Prefix addressing the copy-trading bot, e.g. "@bankrbot".
    #[serde(default = "default_handle")]
    pub handle: Option<String>,
    #[serde(default = "default_size")]
    pub default_size_usd: Decimal,
    /// Execute endpoint; `None` means intents are composed but not sent.
    #[serde(default)]
    pub execute_url: Option<String>,
    #[serde(default = "default_wallet_env")]
    pub wallet_env: String,
    #[serde(default = "default_chain")]
    pub chain: String,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            handle: default_handle(),
            default_size_usd: default_size(),
            execute_url: None,
            wallet_env: default_wallet_env(),
            chain: default_chain(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    60
}
fn default_edge_threshold() -> f64 {
    6.5
}
fn default_max_edges() -> usize {
    8
}
fn default_simulated_markets() -> usize {
    40
}
fn default_feed_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}
fn default_feed_limit() -> u32 {
    200
}
fn default_feed_timeout() -> u64 {
    30
}
fn default_source_timeout() -> u64 {
    45
}
fn default_anthropic() -> AdvisorConfig {
    AdvisorConfig {
        enabled: true,
        model: None,
        api_key_env: "ANTHROPIC_API_KEY".to_string(),
        max_tokens: Some(600),
    }
}
fn default_gemini() -> AdvisorConfig {
    AdvisorConfig {
        enabled: true,
        model: None,
        api_key_env: "GEMINI_API_KEY".to_string(),
        max_tokens: Some(600),
    }
}
fn default_handle() -> Option<String> {
    Some("@bankrbot".to_string())
}
fn default_size() -> Decimal {
    dec!(250)
}
fn default_wallet_env() -> String {
    "BANKR_WALLET_ADDRESS".to_string()
}
fn default_chain() -> String {
    "base".to_string()
}
fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    8080
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scanner cannot run with.
    pub fn validate(&self) -> Result<(), PolyEdgeError> {
        if self.scanner.refresh_interval_secs == 0 {
            return Err(PolyEdgeError::Config("refresh_interval_secs must be > 0".into()));
        }
        if self.oracle.source_timeout_secs == 0 {
            return Err(PolyEdgeError::Config("oracle.source_timeout_secs must be > 0".into()));
        }
        if !(0.0..=10.0).contains(&self.scanner.edge_threshold) {
            return Err(PolyEdgeError::Config(format!(
                "edge_threshold {} outside [0, 10]",
                self.scanner.edge_threshold
            )));
        }
        if self.trade.default_size_usd <= Decimal::ZERO {
            return Err(PolyEdgeError::InvalidSize(self.trade.default_size_usd));
        }
        Ok(())
    }

    /// Resolve a secret, treating an empty value the same as an unset one.
    pub fn resolve_optional(env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.trim().is_empty())
    }
}
