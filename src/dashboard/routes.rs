//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::FeedMode;
use crate::engine::{ConsultResult, Consultation, Engine, RefreshOutcome};
use crate::oracle::SourceUsage;
use crate::trade::TradeOutcome;
use crate::types::{Direction, Edge, Market, PolyEdgeError};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub engine: Arc<Engine>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub mode: FeedMode,
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub markets: usize,
    pub edges: usize,
    pub advisory_sources: Vec<String>,
    pub advisory_usage: Vec<SourceUsage>,
    pub trade_sink: bool,
    pub uptime_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub market_id: String,
    #[serde(default)]
    pub outcome: Option<Direction>,
    #[serde(default)]
    pub size_usd: Option<Decimal>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ModeBody {
    pub mode: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for PolyEdgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            PolyEdgeError::MarketNotFound(_) => StatusCode::NOT_FOUND,
            PolyEdgeError::InvalidSize(_) | PolyEdgeError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = &state.engine;
    let snapshot = engine.session().snapshot().await;

    Json(StatusResponse {
        mode: engine.session().mode().await,
        generation: snapshot.generation,
        refreshed_at: snapshot.refreshed_at,
        markets: snapshot.markets.len(),
        edges: snapshot.edges.len(),
        advisory_sources: engine.oracle().source_names(),
        advisory_usage: engine.oracle().usage(),
        trade_sink: engine.desk().has_sink(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/markets
pub async fn get_markets(State(state): State<AppState>) -> Json<Vec<Market>> {
    Json(state.engine.session().snapshot().await.markets.clone())
}

/// GET /api/edges
pub async fn get_edges(State(state): State<AppState>) -> Json<Vec<Edge>> {
    Json(state.engine.session().snapshot().await.edges.clone())
}

/// POST /api/refresh
pub async fn post_refresh(State(state): State<AppState>) -> Json<RefreshOutcome> {
    Json(state.engine.refresh().await)
}

/// POST /api/oracle/:market_id
pub async fn post_oracle(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<ConsultResult>, PolyEdgeError> {
    state.engine.consult(&market_id).await.map(Json)
}

/// GET /api/oracle
pub async fn get_oracle(State(state): State<AppState>) -> Response {
    match state.engine.session().consultation().await {
        Some(c) if c.verdict.is_some() => Json::<Consultation>(c).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

/// DELETE /api/oracle
pub async fn delete_oracle(State(state): State<AppState>) -> StatusCode {
    state.engine.session().close_consultation().await;
    StatusCode::NO_CONTENT
}

/// POST /api/trade
pub async fn post_trade(
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<TradeOutcome>, PolyEdgeError> {
    state.engine
        .trade(&req.market_id, req.outcome, req.size_usd)
        .await
        .map(Json)
}

/// PUT /api/mode
pub async fn put_mode(
    State(state): State<AppState>,
    Json(body): Json<ModeBody>,
) -> Result<Json<ModeBody>, PolyEdgeError> {
    let mode: FeedMode = body.mode.parse()?;
    state.engine.session().set_mode(mode).await;
    let label = match mode {
        FeedMode::Live => "live",
        FeedMode::Simulation => "simulation",
    };
    Ok(Json(ModeBody { mode: label.to_string() }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
