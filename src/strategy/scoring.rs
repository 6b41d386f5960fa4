//! Edge scoring.
//!
//! A fixed battery of independent threshold rules. Each fired rule adds
//! its weight and appends its tag; the sum is clamped to [0, 10] only
//! after every rule has been evaluated.

use crate::types::{Analysis, Market, WhaleFlow};

/// Upper bound of the score scale.
pub const MAX_SCORE: f64 = 10.0;

/// One scoring rule.
pub struct Rule {
    pub tag: &'static str,
    pub weight: f64,
    pub fires: fn(&Market) -> bool,
}

/// The rule battery, in evaluation order.
pub const RULES: &[Rule] = &[
    Rule {
        tag: "Discounted momentum",
        weight: 6.0,
        fires: |m| m.price < 0.4 && m.funding_rate < 0.0 && m.whale_flow == WhaleFlow::Buy,
    },
    Rule {
        tag: "Overstretched exit",
        weight: 6.0,
        fires: |m| m.price > 0.75 && m.volume_24h < 100_000.0 && m.whale_flow == WhaleFlow::Sell,
    },
    Rule {
        tag: "Emerging volume",
        weight: 4.0,
        fires: |m| {
            m.volume_24h > 500_000.0
                && m.volume_24h < 5_000_000.0
                && m.price > 0.3
                && m.price < 0.7
        },
    },
    Rule {
        tag: "Liquidity squeeze",
        weight: 2.0,
        fires: |m| m.liquidity < 80_000.0,
    },
    Rule {
        tag: "Whale cluster",
        weight: 3.0,
        fires: |m| m.whale_count_15m >= 3,
    },
    // Stacks on top of the cluster rule.
    Rule {
        tag: "Whale swarm",
        weight: 2.0,
        fires: |m| m.whale_count_15m >= 5,
    },
    Rule {
        tag: "Copy momentum",
        weight: 2.0,
        fires: |m| m.copy_trader_count >= 30,
    },
    Rule {
        tag: "Funding arb",
        weight: 1.5,
        fires: |m| m.funding_rate.abs() > 0.02,
    },
];

/// Score a market against the rule battery.
pub fn score(market: &Market) -> Analysis {
    let mut raw = 0.0;
    let mut tags = Vec::new();

    for rule in RULES {
        if (rule.fires)(market) {
            raw += rule.weight;
            tags.push(rule.tag.to_string());
        }
    }

    Analysis {
        score: raw.clamp(0.0, MAX_SCORE),
        tags,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
