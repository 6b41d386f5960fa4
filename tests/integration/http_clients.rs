//! Advisory sources and the trade sink against local HTTP stand-ins.

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use polyedge::oracle::anthropic::AnthropicAdvisor;
use polyedge::oracle::gemini::GeminiAdvisor;
use polyedge::oracle::AdvisorySource;
use polyedge::trade::{BankrSink, TradeDesk};
use polyedge::types::{Analysis, Conviction, Direction, Market};

use crate::mocks::serve;

const VERDICT_TEXT: &str = r#"Here is my read.
{"direction":"NO","conviction":"HIGH","targetPrice":0.3,"stopLoss":0.45,"confidenceScore":82,"reasoning":["Overstretched exit"]}
Good luck."#;

fn market() -> Market {
    Market { price: 0.8, ..Market::neutral("m1", "Will ETH flip?") }
}

fn analysis() -> Analysis {
    Analysis { score: 8.0, tags: vec!["Overstretched exit".into()] }
}

#[tokio::test]
async fn test_anthropic_advisor_parses_wrapped_json() {
    let seen_key: Arc<Mutex<Option<String>>> = Arc::default();
    let captured = seen_key.clone();

    let app = Router::new().route(
        "/v1/messages",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                assert!(body["messages"][0]["content"].as_str().unwrap().contains("Will ETH flip?"));
                Json(json!({
                    "content": [{"type": "text", "text": VERDICT_TEXT}],
                    "usage": {"input_tokens": 200, "output_tokens": 80}
                }))
            }
        }),
    );
    let base = serve(app).await;

    let advisor = AnthropicAdvisor::new(SecretString::new("sk-test".into()), None, None)
        .unwrap()
        .with_api_url(format!("{base}/v1/messages"));

    let v = advisor.advise(&market(), &analysis()).await.unwrap();
    assert_eq!(v.direction, Direction::No);
    assert_eq!(v.conviction, Conviction::High);
    assert_eq!(v.confidence_score, 82);
    assert_eq!(v.reasoning, vec!["Overstretched exit"]);
    assert_eq!(seen_key.lock().unwrap().as_deref(), Some("sk-test"));
    let usage = advisor.usage().unwrap();
    assert_eq!(usage.source, "anthropic");
    assert_eq!(usage.calls, 1);
    assert!(usage.cost_usd > 0.0);
}

#[tokio::test]
async fn test_anthropic_retries_server_errors() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/v1/messages",
        post(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "overloaded"})));
                }
                (StatusCode::OK, Json(json!({"content": [{"type": "text", "text": VERDICT_TEXT}]})))
            }
        }),
    );
    let base = serve(app).await;

    let advisor = AnthropicAdvisor::new(SecretString::new("k".into()), None, None)
        .unwrap()
        .with_api_url(format!("{base}/v1/messages"));

    assert!(advisor.advise(&market(), &analysis()).await.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_anthropic_prose_only_reply_fails() {
    let app = Router::new().route(
        "/v1/messages",
        post(|| async { Json(json!({"content": [{"type": "text", "text": "I would buy."}]})) }),
    );
    let base = serve(app).await;

    let advisor = AnthropicAdvisor::new(SecretString::new("k".into()), None, None)
        .unwrap()
        .with_api_url(format!("{base}/v1/messages"));

    assert!(advisor.advise(&market(), &analysis()).await.is_err());
}

#[tokio::test]
async fn test_gemini_advisor_round_trip() {
    let seen_path: Arc<Mutex<Option<String>>> = Arc::default();
    let captured = seen_path.clone();

    let app = Router::new().route(
        "/v1beta/models/:call",
        post(move |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(call);
                assert_eq!(headers.get("x-goog-api-key").unwrap(), "g-test");
                assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
                Json(json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": VERDICT_TEXT}]}}],
                    "usageMetadata": {"promptTokenCount": 150, "candidatesTokenCount": 60}
                }))
            }
        }),
    );
    let base = serve(app).await;

    let advisor = GeminiAdvisor::new(SecretString::new("g-test".into()), None, None)
        .unwrap()
        .with_api_base(format!("{base}/v1beta"));

    let v = advisor.advise(&market(), &analysis()).await.unwrap();
    assert_eq!(v.direction, Direction::No);
    assert!((v.stop_loss - 0.45).abs() < 1e-9);
    assert_eq!(seen_path.lock().unwrap().as_deref(), Some("gemini-2.5-flash:generateContent"));
    let usage = advisor.usage().unwrap();
    assert_eq!(usage.model, "gemini-2.5-flash");
    assert_eq!(usage.calls, 1);
}

#[tokio::test]
async fn test_bankr_sink_posts_intent() {
    let seen_body: Arc<Mutex<Option<Value>>> = Arc::default();
    let captured = seen_body.clone();

    let app = Router::new().route(
        "/v1/execute",
        post(move |Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(body);
                Json(json!({"status": "queued"}))
            }
        }),
    );
    let base = serve(app).await;

    let sink = BankrSink::new(format!("{base}/v1/execute"), Some("0xwallet".into()), "base").unwrap();
    let desk = TradeDesk::new(Some("@bankrbot".into()), dec!(250), Some(Box::new(sink)));

    let market = Market::neutral("m1", "Will BTC hit 100k?");
    let outcome = desk.submit(&market, Direction::Yes, None).await.unwrap();
    assert!(outcome.delivered);

    let body = seen_body.lock().unwrap().clone().unwrap();
    assert_eq!(
        body["prompt"],
        "@bankrbot buy $250 YES shares on \"Will BTC hit 100k?\" Max slippage 0.5%."
    );
    assert_eq!(body["wallet"], "0xwallet");
    assert_eq!(body["chain"], "base");
}

#[tokio::test]
async fn test_bankr_rejection_is_reported() {
    let app = Router::new().route(
        "/v1/execute",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let base = serve(app).await;

    let sink = BankrSink::new(format!("{base}/v1/execute"), None, "base").unwrap();
    let desk = TradeDesk::new(None, dec!(250), Some(Box::new(sink)));

    let outcome = desk
        .submit(&Market::neutral("m1", "Q?"), Direction::No, Some(dec!(5)))
        .await
        .unwrap();
    assert!(!outcome.delivered);
    let notice = outcome.notice.unwrap();
    assert!(notice.contains("401"));
    assert!(notice.contains("bad key"));
}
