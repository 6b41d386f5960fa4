//! Test doubles for integration testing.
//!
//! In-memory feeds and advisory sources with controllable output, plus a
//! tiny local HTTP server for exercising the real HTTP clients.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use polyedge::feed::MarketFeed;
use polyedge::oracle::AdvisorySource;
use polyedge::types::{AdvisoryVerdict, Analysis, Conviction, Direction, Market};

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// A feed whose records (or failure) are set from test code.
#[derive(Clone, Default)]
pub struct MockFeed {
    records: Arc<Mutex<Vec<Value>>>,
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockFeed {
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            force_error: Arc::default(),
        }
    }

    pub fn set_records(&self, records: Vec<Value>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }
}

#[async_trait]
impl MarketFeed for MockFeed {
    async fn fetch_raw(&self) -> Result<Vec<Value>> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Advisory sources
// ---------------------------------------------------------------------------

pub enum Script {
    Answer(AdvisoryVerdict),
    Fail(&'static str),
    Hang,
}

/// An advisory source that follows a fixed script and counts calls.
pub struct ScriptedSource {
    name: &'static str,
    script: Script,
    calls: Arc<Mutex<u32>>,
    delay: Duration,
}

impl ScriptedSource {
    pub fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            script,
            calls: Arc::default(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_counter(&self) -> Arc<Mutex<u32>> {
        self.calls.clone()
    }
}

#[async_trait]
impl AdvisorySource for ScriptedSource {
    async fn advise(&self, _market: &Market, _analysis: &Analysis) -> Result<AdvisoryVerdict> {
        *self.calls.lock().unwrap() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Answer(v) => Ok(v.clone()),
            Script::Fail(msg) => Err(anyhow!(*msg)),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(anyhow!("hung source woke up"))
            }
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn verdict(direction: Direction, confidence: u8, target: f64, stop: f64, tags: &[&str]) -> AdvisoryVerdict {
    AdvisoryVerdict {
        direction,
        conviction: Conviction::from_confidence(confidence),
        target_price: target,
        stop_loss: stop,
        confidence_score: confidence,
        reasoning: tags.iter().map(|t| t.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Local HTTP server
// ---------------------------------------------------------------------------

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
