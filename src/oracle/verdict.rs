//! Verdict parsing, heuristic fallback, and cross-source consensus.
//!
//! Everything here is synchronous and free of I/O; the async fan-out
//! lives in the parent module.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::types::{AdvisoryVerdict, Analysis, Conviction, Direction, Market, PolyEdgeError};

/// Target offset above the current price for heuristic verdicts.
const FALLBACK_TARGET_OFFSET: f64 = 0.08;
/// Stop offset below the current price for heuristic verdicts.
const FALLBACK_STOP_OFFSET: f64 = 0.05;
/// Bounds of the heuristic confidence draw.
pub const FALLBACK_CONFIDENCE_MIN: u8 = 65;
pub const FALLBACK_CONFIDENCE_MAX: u8 = 90;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Wire shape every advisory source must emit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVerdict {
    direction: String,
    conviction: String,
    target_price: f64,
    stop_loss: f64,
    confidence_score: f64,
    reasoning: Vec<String>,
}

/// Find the first well-formed JSON object embedded in free text.
///
/// Tries each `{` in turn and returns the first position from which a
/// complete object parses. Prose or code fences around it are ignored.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(i, _)| {
            let mut stream = serde_json::Deserializer::from_str(&text[i..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(Value::Object(map))) => Some(map),
                _ => None,
            }
        })
}

/// Parse a source's raw text output into a verdict.
pub fn parse_verdict(text: &str) -> Result<AdvisoryVerdict, PolyEdgeError> {
    let object = extract_json_object(text)
        .ok_or_else(|| PolyEdgeError::MalformedVerdict("no JSON object in response".into()))?;

    let wire: WireVerdict = serde_json::from_value(Value::Object(object))
        .map_err(|e| PolyEdgeError::MalformedVerdict(format!("schema mismatch: {e}")))?;

    let direction = wire.direction.parse::<Direction>()
        .map_err(|e| PolyEdgeError::MalformedVerdict(e.to_string()))?;

    for (field, value) in [
        ("targetPrice", wire.target_price),
        ("stopLoss", wire.stop_loss),
        ("confidenceScore", wire.confidence_score),
    ] {
        if !value.is_finite() {
            return Err(PolyEdgeError::MalformedVerdict(format!("{field} is not finite")));
        }
    }

    let confidence_score = wire.confidence_score.round().clamp(0.0, 100.0) as u8;
    // Unknown tier names are tolerated; the score decides instead.
    let conviction = wire.conviction.parse::<Conviction>()
        .unwrap_or_else(|_| Conviction::from_confidence(confidence_score));

    Ok(AdvisoryVerdict {
        direction,
        conviction,
        target_price: wire.target_price.clamp(0.0, 1.0),
        stop_loss: wire.stop_loss.clamp(0.0, 1.0),
        confidence_score,
        reasoning: wire.reasoning,
    })
}

// ---------------------------------------------------------------------------
// Heuristic fallback
// ---------------------------------------------------------------------------

/// Verdict computed from the market and its analysis alone.
///
/// Used when no advisory source is configured or every source failed.
pub fn fallback_verdict<R: Rng + ?Sized>(
    market: &Market,
    analysis: &Analysis,
    rng: &mut R,
) -> AdvisoryVerdict {
    AdvisoryVerdict {
        direction: if market.price >= 0.5 { Direction::Yes } else { Direction::No },
        conviction: Conviction::from_score(analysis.score),
        target_price: (market.price + FALLBACK_TARGET_OFFSET).min(1.0),
        stop_loss: (market.price - FALLBACK_STOP_OFFSET).max(0.0),
        confidence_score: rng.gen_range(FALLBACK_CONFIDENCE_MIN..=FALLBACK_CONFIDENCE_MAX),
        reasoning: analysis.tags.clone(),
    }
}

// ---------------------------------------------------------------------------
// Consensus
// ---------------------------------------------------------------------------

/// Pick the winning direction.
///
/// Majority vote. An even split goes to the side whose votes carry the
/// larger summed confidence, and failing that to the first vote cast.
pub fn winning_direction(votes: &[AdvisoryVerdict]) -> Option<Direction> {
    let first = votes.first()?.direction;

    let tally = |d: Direction| -> (usize, u32) {
        votes.iter()
            .filter(|v| v.direction == d)
            .fold((0, 0), |(n, c), v| (n + 1, c + v.confidence_score as u32))
    };
    let (yes_n, yes_c) = tally(Direction::Yes);
    let (no_n, no_c) = tally(Direction::No);

    let winner = match yes_n.cmp(&no_n) {
        std::cmp::Ordering::Greater => Direction::Yes,
        std::cmp::Ordering::Less => Direction::No,
        std::cmp::Ordering::Equal => match yes_c.cmp(&no_c) {
            std::cmp::Ordering::Greater => Direction::Yes,
            std::cmp::Ordering::Less => Direction::No,
            std::cmp::Ordering::Equal => first,
        },
    };
    Some(winner)
}

/// Combine independent source verdicts into one. `None` if there are no votes.
pub fn aggregate(votes: &[AdvisoryVerdict]) -> Option<AdvisoryVerdict> {
    let direction = winning_direction(votes)?;
    let n = votes.len() as f64;

    let agreeing = votes.iter().filter(|v| v.direction == direction).count() as f64;
    let confidence_score = (100.0 * agreeing / n).round() as u8;

    let target_price = votes.iter().map(|v| v.target_price).sum::<f64>() / n;
    let stop_loss = votes.iter().map(|v| v.stop_loss).sum::<f64>() / n;

    let mut seen = HashSet::new();
    let reasoning = votes.iter()
        .flat_map(|v| v.reasoning.iter())
        .filter(|r| seen.insert(r.as_str()))
        .cloned()
        .collect();

    Some(AdvisoryVerdict {
        direction,
        conviction: Conviction::from_confidence(confidence_score),
        target_price,
        stop_loss,
        confidence_score,
        reasoning,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
