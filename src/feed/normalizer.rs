//! Market normalizer.
//!
//! Maps raw upstream records into the canonical `Market` shape. Never
//! fails: missing or garbled fields fall back to documented defaults,
//! and activity signals the upstream does not publish are synthesized
//! from the injected random source.

use rand::Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{Market, PricePoint, WhaleFlow};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PRICE: f64 = 0.5;
pub const DEFAULT_VOLUME: f64 = 0.0;
pub const DEFAULT_LIQUIDITY: f64 = 50_000.0;
pub const DEFAULT_QUESTION: &str = "Untitled market";

/// Number of samples in the synthesized chart series.
pub const HISTORY_LEN: usize = 20;
/// Half-width of the noise band around the current price.
const HISTORY_JITTER: f64 = 0.025;

const MAX_SYNTH_FUNDING: f64 = 0.05;
const MAX_SYNTH_WHALES: u32 = 5;
const MAX_SYNTH_COPY_TRADERS: u32 = 59;

const ID_KEYS: &[&str] = &["id", "conditionId", "condition_id"];
const QUESTION_KEYS: &[&str] = &["question", "title"];
const PRICE_KEYS: &[&str] = &["yes_price", "yesPrice"];
/// Last resort only: zero or stale on thin Gamma markets.
const LAST_TRADE_KEYS: &[&str] = &["lastTradePrice", "last_trade_price"];
const VOLUME_KEYS: &[&str] = &["volume_24h", "volume24hr", "volume24h", "volume"];
const LIQUIDITY_KEYS: &[&str] = &["liquidity", "liquidityNum"];
const FUNDING_KEYS: &[&str] = &["funding_rate", "fundingRate"];
const WHALE_FLOW_KEYS: &[&str] = &["whale_flow", "whaleFlow"];
const WHALE_COUNT_KEYS: &[&str] = &["whale_count_15m", "whaleCount15m"];
const COPY_TRADER_KEYS: &[&str] = &["copy_trader_count", "copyTraderCount"];

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one raw record. Any JSON value is accepted; non-objects
/// produce a fully defaulted market.
pub fn normalize<R: Rng + ?Sized>(raw: &Value, rng: &mut R) -> Market {
    let question = first_string(raw, QUESTION_KEYS)
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

    let id = first_string(raw, ID_KEYS)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| anonymous_id(&question));

    let price = first_number(raw, PRICE_KEYS)
        .or_else(|| outcome_yes_price(raw))
        .or_else(|| first_number(raw, LAST_TRADE_KEYS))
        .filter(|p| p.is_finite())
        .unwrap_or(DEFAULT_PRICE)
        .clamp(0.0, 1.0);

    let volume_24h = non_negative(first_number(raw, VOLUME_KEYS).unwrap_or(DEFAULT_VOLUME));
    let liquidity = non_negative(first_number(raw, LIQUIDITY_KEYS).unwrap_or(DEFAULT_LIQUIDITY));

    let funding_rate = first_number(raw, FUNDING_KEYS)
        .filter(|f| f.is_finite())
        .unwrap_or_else(|| rng.gen_range(-MAX_SYNTH_FUNDING..=MAX_SYNTH_FUNDING));

    let whale_flow = first_string(raw, WHALE_FLOW_KEYS)
        .and_then(|s| s.parse::<WhaleFlow>().ok())
        .unwrap_or_else(|| if rng.gen_bool(0.5) { WhaleFlow::Buy } else { WhaleFlow::Sell });

    let whale_count_15m = first_count(raw, WHALE_COUNT_KEYS)
        .unwrap_or_else(|| rng.gen_range(0..=MAX_SYNTH_WHALES));

    let copy_trader_count = first_count(raw, COPY_TRADER_KEYS)
        .unwrap_or_else(|| rng.gen_range(0..=MAX_SYNTH_COPY_TRADERS));

    let price_history = synthesize_history(price, rng);

    Market {
        id,
        question,
        price,
        volume_24h,
        liquidity,
        funding_rate,
        whale_flow,
        whale_count_15m,
        copy_trader_count,
        price_history,
    }
}

/// Normalize a whole payload, preserving upstream order.
pub fn normalize_batch<R: Rng + ?Sized>(records: &[Value], rng: &mut R) -> Vec<Market> {
    let markets: Vec<Market> = records.iter().map(|r| normalize(r, rng)).collect();
    debug!(count = markets.len(), "Normalized market batch");
    markets
}

/// Build a fixed-length series jittered around `price`, oldest first.
pub fn synthesize_history<R: Rng + ?Sized>(price: f64, rng: &mut R) -> Vec<PricePoint> {
    (0..HISTORY_LEN)
        .map(|i| PricePoint {
            time: format!("{i}m"),
            price: (price + rng.gen_range(-HISTORY_JITTER..=HISTORY_JITTER)).clamp(0.0, 1.0),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Id for a record the upstream published without one. Derived from the
/// question so the same market keeps its id across refreshes.
fn anonymous_id(question: &str) -> String {
    let digest = Sha256::digest(question.trim().as_bytes());
    format!("anon-{}", hex::encode(&digest[..8]))
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Interpret a JSON value as a number; numeric strings are accepted.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn first_number(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| raw.get(*k).and_then(as_number))
}

fn first_string(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match raw.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_count(raw: &Value, keys: &[&str]) -> Option<u32> {
    first_number(raw, keys)
        .filter(|n| n.is_finite())
        .map(|n| n.max(0.0).min(u32::MAX as f64) as u32)
}

/// Gamma encodes outcome prices either as a JSON array or as a string
/// holding one: `"[\"0.65\",\"0.35\"]"`. The first entry is YES.
fn outcome_yes_price(raw: &Value) -> Option<f64> {
    match raw.get("outcomePrices")? {
        Value::Array(items) => items.first().and_then(as_number),
        Value::String(s) => {
            let cleaned = s.replace(['[', ']', '"', '\\'], "");
            cleaned.split(',').next()?.trim().parse::<f64>().ok()
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
