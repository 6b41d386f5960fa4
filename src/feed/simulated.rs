//! Simulated feed.
//!
//! Generates plausible raw records, including the activity fields that
//! the live feed lacks, so the scanner can run without network access.
//! Ids are stable across refreshes (`sim-000`, `sim-001`, ...).

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Mutex;

use super::MarketFeed;

const QUESTIONS: &[&str] = &[
    "Will BTC close above $100k this month?",
    "Will ETH flip $5k before June?",
    "Will the Fed cut rates at the next meeting?",
    "Will SOL outperform ETH this quarter?",
    "Will US CPI print above 3%?",
    "Will a spot XRP ETF be approved this year?",
    "Will the S&P 500 hit a new all-time high this week?",
    "Will gold trade above $3,000 by year end?",
];

pub struct SimulatedFeed {
    rng: Mutex<StdRng>,
    count: usize,
}

impl SimulatedFeed {
    pub fn new(count: usize) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            count,
        }
    }

    /// Deterministic feed for tests and demos.
    pub fn seeded(count: usize, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            count,
        }
    }

    fn record<R: Rng + ?Sized>(index: usize, rng: &mut R) -> Value {
        let question = QUESTIONS[index % QUESTIONS.len()];
        json!({
            "id": format!("sim-{index:03}"),
            "question": question,
            "yes_price": rng.gen_range(0.05..0.95),
            "volume_24h": rng.gen_range(5_000.0..6_000_000.0),
            "liquidity": rng.gen_range(20_000.0..400_000.0),
            "funding_rate": rng.gen_range(-0.05..=0.05),
            "whale_flow": if rng.gen_bool(0.5) { "buy" } else { "sell" },
            "whale_count_15m": rng.gen_range(0..=6),
            "copy_trader_count": rng.gen_range(0..=60),
        })
    }
}

#[async_trait]
impl MarketFeed for SimulatedFeed {
    async fn fetch_raw(&self) -> Result<Vec<Value>> {
        let mut rng = self.rng
            .lock()
            .map_err(|_| anyhow::anyhow!("Simulated feed RNG poisoned"))?;
        Ok((0..self.count).map(|i| Self::record(i, &mut *rng)).collect())
    }

    fn name(&self) -> &str {
        "simulation"
    }
}
