//! Trade desk: composes copy-trading intents and hands them to a sink.
//!
//! The intent text is the whole contract with the sink. Delivery is a
//! single attempt; a failed delivery is reported back to the caller as a
//! notice and never retried.

pub mod bankr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::TradeConfig;
use crate::types::{Direction, Market, PolyEdgeError, TradeIntent};

pub use bankr::BankrSink;

/// Destination for composed trade intents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeSink: Send + Sync {
    async fn deliver(&self, intent: &TradeIntent) -> Result<(), PolyEdgeError>;
}

/// Build the intent text.
///
/// `buy $<size> <OUTCOME> shares on "<question>" Max slippage 0.5%.`,
/// prefixed with `handle` and a space when one is given.
pub fn compose_intent(handle: Option<&str>, question: &str, size_usd: Decimal, outcome: Direction) -> String {
    let body = format!(
        "buy ${} {} shares on \"{}\" Max slippage 0.5%.",
        size_usd.normalize(),
        outcome,
        question
    );
    match handle.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => format!("{h} {body}"),
        None => body,
    }
}

/// What happened to a submitted intent.
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub intent: TradeIntent,
    pub delivered: bool,
    /// Human-readable explanation when the intent was not delivered.
    pub notice: Option<String>,
}

// ---------------------------------------------------------------------------
// Desk
// ---------------------------------------------------------------------------

pub struct TradeDesk {
    handle: Option<String>,
    default_size: Decimal,
    sink: Option<Box<dyn TradeSink>>,
}

impl TradeDesk {
    pub fn new(handle: Option<String>, default_size: Decimal, sink: Option<Box<dyn TradeSink>>) -> Self {
        Self { handle, default_size, sink }
    }

    /// Desk wired to the Bankr execute endpoint when one is configured.
    pub fn from_config(config: &TradeConfig) -> anyhow::Result<Self> {
        let sink: Option<Box<dyn TradeSink>> = match &config.execute_url {
            Some(url) => Some(Box::new(BankrSink::from_config(url, config)?)),
            None => {
                info!("No trade execute_url configured, intents will be composed only");
                None
            }
        };
        Ok(Self::new(config.handle.clone(), config.default_size_usd, sink))
    }

    pub fn default_size(&self) -> Decimal {
        self.default_size
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Compose an intent for `market`. `size_usd` falls back to the desk default.
    pub fn compose(
        &self,
        market: &Market,
        outcome: Direction,
        size_usd: Option<Decimal>,
    ) -> Result<TradeIntent, PolyEdgeError> {
        let size_usd = size_usd.unwrap_or(self.default_size);
        if size_usd <= Decimal::ZERO {
            return Err(PolyEdgeError::InvalidSize(size_usd));
        }

        Ok(TradeIntent {
            market_id: market.id.clone(),
            question: market.question.clone(),
            outcome,
            size_usd,
            text: compose_intent(self.handle.as_deref(), &market.question, size_usd, outcome),
        })
    }

    /// Compose and deliver. Only composition errors are returned as `Err`;
    /// delivery problems end up in `TradeOutcome::notice`.
    pub async fn submit(
        &self,
        market: &Market,
        outcome: Direction,
        size_usd: Option<Decimal>,
    ) -> Result<TradeOutcome, PolyEdgeError> {
        let intent = self.compose(market, outcome, size_usd)?;

        let Some(sink) = &self.sink else {
            return Ok(TradeOutcome {
                intent,
                delivered: false,
                notice: Some("No execute endpoint configured; intent composed only".to_string()),
            });
        };

        match sink.deliver(&intent).await {
            Ok(()) => {
                info!(market_id = %intent.market_id, intent = %intent.text, "Trade intent delivered");
                Ok(TradeOutcome { intent, delivered: true, notice: None })
            }
            Err(e) => {
                warn!(market_id = %intent.market_id, error = %e, "Trade intent delivery failed");
                Ok(TradeOutcome {
                    intent,
                    delivered: false,
                    notice: Some(e.to_string()),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
