//! End-to-end refresh and consultation flows.

use axum::{extract::Query, routing::get, Json, Router};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use polyedge::config::{FeedConfig, FeedMode};
use polyedge::engine::{Engine, RefreshController, RefreshOutcome, Session};
use polyedge::feed::gamma::GammaFeed;
use polyedge::feed::simulated::SimulatedFeed;
use polyedge::oracle::{AdvisorySource, Oracle};
use polyedge::strategy::{EdgeConfig, EdgeDetector};
use polyedge::trade::TradeDesk;
use polyedge::types::{Conviction, Direction};

use crate::mocks::{serve, verdict, MockFeed, Script, ScriptedSource};

fn record(id: &str, price: f64, liquidity: f64, whales: u32) -> Value {
    json!({
        "id": id,
        "question": format!("Question {id}?"),
        "yes_price": price,
        "volume_24h": 90_000,
        "liquidity": liquidity,
        "funding_rate": -0.01,
        "whale_flow": "buy",
        "whale_count_15m": whales,
        "copy_trader_count": 0
    })
}

fn engine_with(feed: MockFeed, sources: Vec<Box<dyn AdvisorySource>>, timeout: Duration) -> Engine {
    let refresher = RefreshController::new(
        Box::new(feed),
        Box::new(SimulatedFeed::seeded(8, 42)),
        EdgeDetector::new(EdgeConfig::default()),
        Arc::new(Session::new(FeedMode::Live)),
    )
    .with_seed(42);
    let oracle = Oracle::new(sources, timeout).with_seed(42);
    Engine::new(refresher, oracle, TradeDesk::new(Some("@bankrbot".into()), dec!(250), None))
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_gamma_feed_over_http() {
    let seen_query: Arc<Mutex<HashMap<String, String>>> = Arc::default();
    let captured = seen_query.clone();

    let app = Router::new().route(
        "/markets",
        get(move |Query(q): Query<HashMap<String, String>>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = q;
                Json(json!({
                    "data": [
                        {
                            "conditionId": "0xabc",
                            "question": "Will BTC hit 100k?",
                            "outcomePrices": "[\"0.35\", \"0.65\"]",
                            "volume24hr": "90000",
                            "liquidityNum": 70000,
                            "fundingRate": -0.01,
                            "whaleFlow": "BUY",
                            "whaleCount15m": 4,
                            "copyTraderCount": 0
                        },
                        {
                            "id": "calm",
                            "title": "Calm market",
                            "lastTradePrice": 0.5,
                            "liquidity": 300000,
                            "funding_rate": 0,
                            "whale_flow": "sell",
                            "whale_count_15m": 0,
                            "copy_trader_count": 0
                        }
                    ]
                }))
            }
        }),
    );
    let base_url = serve(app).await;

    let feed = GammaFeed::new(&FeedConfig {
        base_url,
        limit: 25,
        ..FeedConfig::default()
    })
    .unwrap();

    let refresher = RefreshController::new(
        Box::new(feed),
        Box::new(SimulatedFeed::seeded(1, 1)),
        EdgeDetector::new(EdgeConfig::default()),
        Arc::new(Session::new(FeedMode::Live)),
    )
    .with_seed(7);

    let outcome = refresher.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Completed { generation: 1, markets: 2, edges: 1 });

    let query = seen_query.lock().unwrap().clone();
    assert_eq!(query.get("active").map(String::as_str), Some("true"));
    assert_eq!(query.get("closed").map(String::as_str), Some("false"));
    assert_eq!(query.get("limit").map(String::as_str), Some("25"));

    let snapshot = refresher.session().snapshot().await;
    let hot = &snapshot.edges[0];
    assert_eq!(hot.market.id, "0xabc");
    assert!((hot.market.price - 0.35).abs() < 1e-9);
    assert_eq!(hot.analysis.score, 10.0);
    assert_eq!(
        hot.analysis.tags,
        vec!["Discounted momentum", "Liquidity squeeze", "Whale cluster"]
    );

    let calm = snapshot.market("calm").unwrap();
    assert_eq!(calm.question, "Calm market");
    assert_eq!(calm.price_history.len(), 20);
}

#[tokio::test]
async fn test_outage_then_recovery() {
    let feed = MockFeed::with_records(vec![record("a", 0.35, 70_000.0, 4)]);
    let engine = engine_with(feed.clone(), vec![], Duration::from_secs(1));

    engine.refresh().await;
    assert_eq!(engine.session().snapshot().await.edges.len(), 1);

    feed.set_error("connection reset");
    let outcome = engine.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Completed { generation: 2, markets: 0, edges: 0 });

    feed.clear_error();
    feed.set_records(vec![record("a", 0.35, 70_000.0, 4), record("b", 0.2, 60_000.0, 5)]);
    engine.refresh().await;

    let snapshot = engine.session().snapshot().await;
    assert_eq!(snapshot.generation, 3);
    let ids: Vec<&str> = snapshot.edges.iter().map(|e| e.market.id.as_str()).collect();
    // Both clamp to 10; ties keep upstream order.
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_top_eight_survive() {
    let records = (0..12).map(|i| record(&format!("m{i:02}"), 0.3, 50_000.0, 3)).collect();
    let engine = engine_with(MockFeed::with_records(records), vec![], Duration::from_secs(1));
    engine.refresh().await;

    let snapshot = engine.session().snapshot().await;
    assert_eq!(snapshot.markets.len(), 12);
    assert_eq!(snapshot.edges.len(), 8);
    assert_eq!(snapshot.edges[0].market.id, "m00");
    assert_eq!(snapshot.edges[7].market.id, "m07");
}

// ---------------------------------------------------------------------------
// Consultation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_consensus_across_sources() {
    let sources: Vec<Box<dyn AdvisorySource>> = vec![
        Box::new(ScriptedSource::new("a", Script::Answer(verdict(Direction::Yes, 85, 0.50, 0.30, &["whales"])))),
        Box::new(ScriptedSource::new("b", Script::Answer(verdict(Direction::Yes, 70, 0.46, 0.28, &["whales", "funding"])))),
        Box::new(ScriptedSource::new("c", Script::Fail("503 upstream"))),
    ];
    let engine = engine_with(
        MockFeed::with_records(vec![record("a", 0.35, 70_000.0, 4)]),
        sources,
        Duration::from_secs(2),
    );
    engine.refresh().await;

    let result = engine.consult("a").await.unwrap();
    assert!(result.published);
    let v = result.verdict;
    assert_eq!(v.direction, Direction::Yes);
    assert_eq!(v.confidence_score, 100);
    assert_eq!(v.conviction, Conviction::Nuclear);
    assert!((v.target_price - 0.48).abs() < 1e-9);
    assert!((v.stop_loss - 0.29).abs() < 1e-9);
    assert_eq!(v.reasoning, vec!["whales", "funding"]);
}

#[tokio::test]
async fn test_every_source_failing_falls_back() {
    let hung = ScriptedSource::new("hung", Script::Hang);
    let calls = hung.call_counter();
    let sources: Vec<Box<dyn AdvisorySource>> = vec![
        Box::new(hung),
        Box::new(ScriptedSource::new("broken", Script::Fail("no JSON object found"))),
    ];
    let engine = engine_with(
        MockFeed::with_records(vec![record("a", 0.35, 70_000.0, 4)]),
        sources,
        Duration::from_millis(150),
    );
    engine.refresh().await;

    let v = engine.consult("a").await.unwrap().verdict;
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(v.direction, Direction::No);
    assert_eq!(v.conviction, Conviction::Nuclear);
    assert!((v.target_price - 0.43).abs() < 1e-9);
    assert!((v.stop_loss - 0.30).abs() < 1e-9);
    assert!((65..=90).contains(&v.confidence_score));
    assert_eq!(v.reasoning, vec!["Discounted momentum", "Liquidity squeeze", "Whale cluster"]);
}

#[tokio::test]
async fn test_superseded_consultation_is_not_published() {
    let slow = ScriptedSource::new("slow", Script::Answer(verdict(Direction::No, 90, 0.2, 0.1, &[])))
        .delayed(Duration::from_millis(200));
    let engine = Arc::new(engine_with(
        MockFeed::with_records(vec![record("a", 0.35, 70_000.0, 4), record("b", 0.2, 60_000.0, 5)]),
        vec![Box::new(slow)],
        Duration::from_secs(2),
    ));
    engine.refresh().await;

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.consult("a").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = engine.consult("b").await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert!(!first.published);
    assert!(second.published);
    let open = engine.session().consultation().await.unwrap();
    assert_eq!(open.market_id, "b");
    assert_eq!(open.ticket, second.ticket);
}
