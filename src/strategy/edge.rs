//! Edge selection.
//!
//! Scores every market in a batch, keeps those at or above the surfacing
//! threshold, and ranks them best-first. Ties keep upstream order.

use tracing::debug;

use super::scoring;
use crate::config::ScannerConfig;
use crate::types::{Edge, Market};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

pub struct EdgeConfig {
    /// Minimum score for a market to surface.
    pub threshold: f64,
    /// Maximum number of edges surfaced per refresh.
    pub max_edges: usize,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            threshold: 6.5,
            max_edges: 8,
        }
    }
}

impl From<&ScannerConfig> for EdgeConfig {
    fn from(cfg: &ScannerConfig) -> Self {
        Self {
            threshold: cfg.edge_threshold,
            max_edges: cfg.max_edges,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge detection
// ---------------------------------------------------------------------------

pub struct EdgeDetector {
    config: EdgeConfig,
}

impl EdgeDetector {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Score, filter, rank, and truncate.
    pub fn find_edges(&self, markets: &[Market]) -> Vec<Edge> {
        let mut edges: Vec<Edge> = markets
            .iter()
            .filter_map(|market| {
                let analysis = scoring::score(market);
                if analysis.score >= self.config.threshold {
                    debug!(
                        market_id = %market.id,
                        score = analysis.score,
                        tags = ?analysis.tags,
                        "Edge detected"
                    );
                    Some(Edge {
                        market: market.clone(),
                        analysis,
                    })
                } else {
                    None
                }
            })
            .collect();

        // sort_by is stable: equal scores keep upstream order
        edges.sort_by(|a, b| b.analysis.score.total_cmp(&a.analysis.score));
        edges.truncate(self.config.max_edges);

        edges
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
