//! Refresh controller.
//!
//! One refresh: pick the feed for the current mode, fetch raw records,
//! normalize, drop duplicate ids, detect edges, and swap the snapshot.
//! Refreshes never overlap; a trigger that arrives while one is running
//! is skipped rather than queued.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::session::Session;
use crate::config::FeedMode;
use crate::feed::normalizer;
use crate::feed::MarketFeed;
use crate::strategy::EdgeDetector;
use crate::types::Market;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RefreshOutcome {
    Completed {
        generation: u64,
        markets: usize,
        edges: usize,
    },
    Skipped,
}

pub struct RefreshController {
    live: Box<dyn MarketFeed>,
    simulated: Box<dyn MarketFeed>,
    detector: EdgeDetector,
    session: Arc<Session>,
    rng: Mutex<StdRng>,
    in_flight: tokio::sync::Mutex<()>,
}

impl RefreshController {
    pub fn new(
        live: Box<dyn MarketFeed>,
        simulated: Box<dyn MarketFeed>,
        detector: EdgeDetector,
        session: Arc<Session>,
    ) -> Self {
        Self {
            live,
            simulated,
            detector,
            session,
            rng: Mutex::new(StdRng::from_entropy()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Deterministic synthesized fields, for tests and replays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Run one refresh cycle. A feed failure yields an empty snapshot.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_running) = self.in_flight.try_lock() else {
            info!("Refresh already in progress, skipping trigger");
            return RefreshOutcome::Skipped;
        };

        let mode = self.session.mode().await;
        let feed = match mode {
            FeedMode::Live => &self.live,
            FeedMode::Simulation => &self.simulated,
        };

        let raw = match feed.fetch_raw().await {
            Ok(records) => records,
            Err(e) => {
                warn!(feed = feed.name(), error = %format!("{e:#}"), "Feed fetch failed, empty market set this cycle");
                Vec::new()
            }
        };

        let markets = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            normalizer::normalize_batch(&raw, &mut *rng)
        };
        let markets = dedupe_by_id(markets);
        let edges = self.detector.find_edges(&markets);

        let (market_count, edge_count) = (markets.len(), edges.len());
        let generation = self.session.replace_snapshot(mode, markets, edges).await;

        info!(
            feed = feed.name(),
            generation,
            markets = market_count,
            edges = edge_count,
            "Refresh complete"
        );

        RefreshOutcome::Completed {
            generation,
            markets: market_count,
            edges: edge_count,
        }
    }
}

/// Keep the first market for each id, preserving order.
fn dedupe_by_id(markets: Vec<Market>) -> Vec<Market> {
    let mut seen = HashSet::new();
    let before = markets.len();
    let kept: Vec<Market> = markets.into_iter().filter(|m| seen.insert(m.id.clone())).collect();
    if kept.len() < before {
        debug!(dropped = before - kept.len(), "Dropped duplicate market ids");
    }
    kept
}
