//! Shared types for the PolyEdge scanner.
//!
//! These types form the data model used across all modules.
//! Markets and analyses are recreated on every refresh; verdicts live
//! only while a consultation view is open.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A single price sample used for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Relative time label, e.g. "7m".
    pub time: String,
    pub price: f64,
}

/// Net direction of recent large-trade activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhaleFlow {
    Buy,
    Sell,
}

impl fmt::Display for WhaleFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhaleFlow::Buy => write!(f, "buy"),
            WhaleFlow::Sell => write!(f, "sell"),
        }
    }
}

impl std::str::FromStr for WhaleFlow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "bid" | "long" => Ok(WhaleFlow::Buy),
            "sell" | "ask" | "short" => Ok(WhaleFlow::Sell),
            _ => Err(anyhow::anyhow!("Unknown whale flow: {s}")),
        }
    }
}

/// A prediction market in canonical shape.
///
/// Invariants: `price` is in [0, 1]; volume, liquidity and counts are
/// non-negative; `id` is unique within one refresh batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    /// Probability of the YES outcome (0.0–1.0)
    pub price: f64,
    /// Trailing 24-hour traded volume in USD
    pub volume_24h: f64,
    /// Available depth in USD
    pub liquidity: f64,
    pub funding_rate: f64,
    pub whale_flow: WhaleFlow,
    pub whale_count_15m: u32,
    pub copy_trader_count: u32,
    /// Display-only series, oldest first.
    pub price_history: Vec<PricePoint>,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (YES: {:.1}¢ | vol: ${:.0} | liq: ${:.0} | whales: {} {})",
            self.question,
            self.price * 100.0,
            self.volume_24h,
            self.liquidity,
            self.whale_count_15m,
            self.whale_flow,
        )
    }
}

impl Market {
    /// A market where no scoring rule fires.
    pub fn neutral(id: &str, question: &str) -> Self {
        Market {
            id: id.to_string(),
            question: question.to_string(),
            price: 0.5,
            volume_24h: 10_000.0,
            liquidity: 200_000.0,
            funding_rate: 0.0,
            whale_flow: WhaleFlow::Buy,
            whale_count_15m: 0,
            copy_trader_count: 0,
            price_history: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis & edges
// ---------------------------------------------------------------------------

/// Result of running the rule battery over one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Sum of fired rule weights, clamped to [0, 10].
    pub score: f64,
    /// Labels of fired rules, in evaluation order.
    pub tags: Vec<String>,
}

/// A market whose score cleared the surfacing threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub market: Market,
    pub analysis: Analysis,
}

// ---------------------------------------------------------------------------
// Advisory verdict
// ---------------------------------------------------------------------------

/// Outcome a verdict (or trade) points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "YES", alias = "yes", alias = "Yes")]
    Yes,
    #[serde(rename = "NO", alias = "no", alias = "No")]
    No,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Yes => write!(f, "YES"),
            Direction::No => write!(f, "NO"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "YES" => Ok(Direction::Yes),
            "NO" => Ok(Direction::No),
            _ => Err(anyhow::anyhow!("Unknown direction: {s}")),
        }
    }
}

/// Coarse confidence tier. Ordered: `Low < Medium < High < Nuclear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conviction {
    Low,
    Medium,
    High,
    Nuclear,
}

impl Conviction {
    /// Tier for an aggregated 0–100 confidence score.
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            90..=u8::MAX => Conviction::Nuclear,
            80..=89 => Conviction::High,
            65..=79 => Conviction::Medium,
            _ => Conviction::Low,
        }
    }

    /// Tier for a 0–10 edge score (heuristic verdicts only).
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Conviction::Nuclear
        } else if score >= 8.5 {
            Conviction::High
        } else if score >= 7.5 {
            Conviction::Medium
        } else {
            Conviction::Low
        }
    }
}

impl fmt::Display for Conviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conviction::Low => write!(f, "LOW"),
            Conviction::Medium => write!(f, "MEDIUM"),
            Conviction::High => write!(f, "HIGH"),
            Conviction::Nuclear => write!(f, "NUCLEAR"),
        }
    }
}

impl std::str::FromStr for Conviction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Conviction::Low),
            "MEDIUM" | "MED" => Ok(Conviction::Medium),
            "HIGH" => Ok(Conviction::High),
            "NUCLEAR" => Ok(Conviction::Nuclear),
            _ => Err(anyhow::anyhow!("Unknown conviction: {s}")),
        }
    }
}

/// Consensus (or heuristic) judgment on a single market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryVerdict {
    pub direction: Direction,
    pub conviction: Conviction,
    pub target_price: f64,
    pub stop_loss: f64,
    /// 0–100
    pub confidence_score: u8,
    pub reasoning: Vec<String>,
}

impl fmt::Display for AdvisoryVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] target={:.1}¢ stop={:.1}¢ confidence={}%",
            self.direction,
            self.conviction,
            self.target_price * 100.0,
            self.stop_loss * 100.0,
            self.confidence_score,
        )
    }
}

// ---------------------------------------------------------------------------
// Trade intent
// ---------------------------------------------------------------------------

/// A composed copy-trading instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub market_id: String,
    pub question: String,
    pub outcome: Direction,
    pub size_usd: Decimal,
    /// The exact text handed to the sink.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for PolyEdge.
#[derive(Debug, thiserror::Error)]
pub enum PolyEdgeError {
    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Advisory source error ({source_name}): {message}")]
    Advisory { source_name: String, message: String },

    #[error("Malformed verdict: {0}")]
    MalformedVerdict(String),

    #[error("Trade sink error: {0}")]
    TradeSink(String),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Invalid trade size: {0}")]
    InvalidSize(Decimal),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
