//! Core engine: refresh loop, session state, and on-demand actions.
//!
//! `Engine` ties the refresh controller to the oracle and the trade desk
//! so the binary and the dashboard drive the same operations.

pub mod refresh;
pub mod session;

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::oracle::Oracle;
use crate::trade::{TradeDesk, TradeOutcome};
use crate::types::{AdvisoryVerdict, Direction, PolyEdgeError};

pub use refresh::{RefreshController, RefreshOutcome};
pub use session::{Consultation, Session, Snapshot};

/// Result of an on-demand consultation.
#[derive(Debug, Clone, Serialize)]
pub struct ConsultResult {
    pub ticket: Uuid,
    pub market_id: String,
    /// False if the view was closed or superseded before the verdict arrived.
    pub published: bool,
    pub verdict: AdvisoryVerdict,
}

pub struct Engine {
    refresher: RefreshController,
    oracle: Oracle,
    desk: TradeDesk,
}

impl Engine {
    pub fn new(refresher: RefreshController, oracle: Oracle, desk: TradeDesk) -> Self {
        Self { refresher, oracle, desk }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.refresher.session()
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn desk(&self) -> &TradeDesk {
        &self.desk
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresher.refresh().await
    }

    /// Open a consultation on a market of the current snapshot and run the oracle.
    pub async fn consult(&self, market_id: &str) -> Result<ConsultResult, PolyEdgeError> {
        let session = self.session();
        let (market, analysis) = session
            .market_with_analysis(market_id)
            .await
            .ok_or_else(|| PolyEdgeError::MarketNotFound(market_id.to_string()))?;

        let ticket = session.open_consultation(market_id).await;
        let verdict = self.oracle.consult(&market, &analysis).await;
        let published = session.publish_verdict(ticket, verdict.clone()).await;

        info!(market_id, %ticket, published, verdict = %verdict, "Consultation finished");

        Ok(ConsultResult {
            ticket,
            market_id: market_id.to_string(),
            published,
            verdict,
        })
    }

    /// Compose and deliver a trade intent.
    ///
    /// Without an explicit outcome, follows the published verdict for the
    /// same market, or YES when there is none.
    pub async fn trade(
        &self,
        market_id: &str,
        outcome: Option<Direction>,
        size_usd: Option<Decimal>,
    ) -> Result<TradeOutcome, PolyEdgeError> {
        let session = self.session();
        let snapshot = session.snapshot().await;
        let market = snapshot
            .market(market_id)
            .ok_or_else(|| PolyEdgeError::MarketNotFound(market_id.to_string()))?;

        let outcome = match outcome {
            Some(o) => o,
            None => session
                .consultation()
                .await
                .filter(|c| c.market_id == market_id)
                .and_then(|c| c.verdict)
                .map(|v| v.direction)
                .unwrap_or(Direction::Yes),
        };

        self.desk.submit(market, outcome, size_usd).await
    }
}
