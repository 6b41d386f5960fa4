//! PolyEdge: prediction-market edge scanner.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the feeds, oracle, and trade desk into the engine, starts the
//! dashboard API, and runs the refresh loop with graceful shutdown.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use polyedge::config::{self, FeedMode};
use polyedge::dashboard::{self, DashboardState};
use polyedge::engine::{Engine, RefreshController, RefreshOutcome, Session};
use polyedge::feed::gamma::GammaFeed;
use polyedge::feed::simulated::SimulatedFeed;
use polyedge::oracle::Oracle;
use polyedge::strategy::{EdgeConfig, EdgeDetector};
use polyedge::trade::TradeDesk;

const CONFIG_PATH: &str = "config.toml";

const BANNER: &str = r#"
 ____       _       _____    _
|  _ \ ___ | |_   _| ____|__| | __ _  ___
| |_) / _ \| | | | |  _| / _` |/ _` |/ _ \
|  __/ (_) | | |_| | |__| (_| | (_| |  __/
|_|   \___/|_|\__, |_____\__,_|\__, |\___|
              |___/            |___/
  Prediction-market edge scanner
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = if Path::new(CONFIG_PATH).exists() {
        config::AppConfig::load(CONFIG_PATH)?
    } else {
        config::AppConfig::default()
    };

    init_logging();

    println!("{BANNER}");
    info!(
        mode = ?cfg.scanner.mode,
        refresh_interval_secs = cfg.scanner.refresh_interval_secs,
        edge_threshold = cfg.scanner.edge_threshold,
        max_edges = cfg.scanner.max_edges,
        "PolyEdge starting up"
    );
    if !Path::new(CONFIG_PATH).exists() {
        warn!(path = CONFIG_PATH, "Config file not found, using defaults");
    }

    // -- Initialise components -------------------------------------------

    let session = Arc::new(Session::new(cfg.scanner.mode));

    let refresher = RefreshController::new(
        Box::new(GammaFeed::new(&cfg.feed)?),
        Box::new(SimulatedFeed::new(cfg.scanner.simulated_markets)),
        EdgeDetector::new(EdgeConfig::from(&cfg.scanner)),
        session,
    );

    let oracle = Oracle::from_config(&cfg.oracle)?;
    if oracle.source_names().is_empty() {
        warn!("No advisory sources configured, verdicts will use the heuristic fallback");
    }

    let desk = TradeDesk::from_config(&cfg.trade)?;

    let engine = Arc::new(Engine::new(refresher, oracle, desk));

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(engine.clone()));
        dashboard::spawn_dashboard(state, cfg.dashboard.port).await?;
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.scanner.refresh_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.scanner.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let RefreshOutcome::Completed { edges, .. } = engine.refresh().await {
                    log_top_edges(&engine, edges).await;
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    let snapshot = engine.session().snapshot().await;
    info!(
        refreshes = snapshot.generation,
        mode = ?engine.session().mode().await,
        advisory_cost_usd = engine.oracle().total_cost(),
        "PolyEdge shut down cleanly."
    );

    Ok(())
}

/// Log the best few edges of the current snapshot.
async fn log_top_edges(engine: &Engine, count: usize) {
    if count == 0 {
        return;
    }
    let snapshot = engine.session().snapshot().await;
    for edge in snapshot.edges.iter().take(3) {
        info!(
            market_id = %edge.market.id,
            score = edge.analysis.score,
            price = format!("{:.1}c", edge.market.price * 100.0),
            tags = ?edge.analysis.tags,
            question = %edge.market.question,
            "Edge"
        );
    }
    if snapshot.mode == FeedMode::Simulation {
        info!("Simulation mode: edges are synthetic");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polyedge=info"));

    let json_logging = std::env::var("POLYEDGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
