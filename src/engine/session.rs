//! Per-session application state.
//!
//! Holds the current market snapshot, the feed mode, and the open
//! advisory consultation. Shared as `Arc<Session>` between the refresh
//! loop and the dashboard handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::FeedMode;
use crate::strategy::scoring;
use crate::types::{AdvisoryVerdict, Analysis, Edge, Market};

/// One refresh worth of markets and edges. Replaced wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub mode: FeedMode,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub markets: Vec<Market>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    fn empty(mode: FeedMode) -> Self {
        Self {
            generation: 0,
            mode,
            refreshed_at: None,
            markets: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.id == id)
    }
}

/// The currently open advisory view.
#[derive(Debug, Clone, Serialize)]
pub struct Consultation {
    pub ticket: Uuid,
    pub market_id: String,
    pub opened_at: DateTime<Utc>,
    pub verdict: Option<AdvisoryVerdict>,
}

pub struct Session {
    snapshot: RwLock<Arc<Snapshot>>,
    mode: RwLock<FeedMode>,
    consultation: RwLock<Option<Consultation>>,
}

impl Session {
    pub fn new(mode: FeedMode) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::empty(mode))),
            mode: RwLock::new(mode),
            consultation: RwLock::new(None),
        }
    }

    // -- Snapshot --------------------------------------------------------

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Swap in a new snapshot and return its generation number.
    pub async fn replace_snapshot(&self, mode: FeedMode, markets: Vec<Market>, edges: Vec<Edge>) -> u64 {
        let mut current = self.snapshot.write().await;
        let generation = current.generation + 1;
        *current = Arc::new(Snapshot {
            generation,
            mode,
            refreshed_at: Some(Utc::now()),
            markets,
            edges,
        });
        generation
    }

    /// Look up a market in the current snapshot along with its analysis.
    pub async fn market_with_analysis(&self, id: &str) -> Option<(Market, Analysis)> {
        let snapshot = self.snapshot().await;
        let market = snapshot.market(id)?.clone();
        let analysis = snapshot.edges.iter()
            .find(|e| e.market.id == id)
            .map(|e| e.analysis.clone())
            .unwrap_or_else(|| scoring::score(&market));
        Some((market, analysis))
    }

    // -- Mode ------------------------------------------------------------

    pub async fn mode(&self) -> FeedMode {
        *self.mode.read().await
    }

    /// Takes effect on the next refresh.
    pub async fn set_mode(&self, mode: FeedMode) {
        *self.mode.write().await = mode;
    }

    // -- Consultation ----------------------------------------------------

    /// Open a consultation for `market_id`, superseding any open one.
    pub async fn open_consultation(&self, market_id: &str) -> Uuid {
        let ticket = Uuid::new_v4();
        *self.consultation.write().await = Some(Consultation {
            ticket,
            market_id: market_id.to_string(),
            opened_at: Utc::now(),
            verdict: None,
        });
        debug!(%ticket, market_id, "Consultation opened");
        ticket
    }

    pub async fn close_consultation(&self) {
        if let Some(c) = self.consultation.write().await.take() {
            debug!(ticket = %c.ticket, market_id = %c.market_id, "Consultation closed");
        }
    }

    /// Store `verdict` if `ticket` is still the open consultation.
    /// Returns false when the result is stale and was dropped.
    pub async fn publish_verdict(&self, ticket: Uuid, verdict: AdvisoryVerdict) -> bool {
        let mut guard = self.consultation.write().await;
        match guard.as_mut() {
            Some(c) if c.ticket == ticket => {
                c.verdict = Some(verdict);
                true
            }
            _ => {
                debug!(%ticket, "Dropping stale verdict");
                false
            }
        }
    }

    pub async fn consultation(&self) -> Option<Consultation> {
        self.consultation.read().await.clone()
    }
}
