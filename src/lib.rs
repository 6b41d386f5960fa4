//! PolyEdge: prediction-market edge scanner with a multi-model advisory oracle.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod feed;
pub mod strategy;
pub mod oracle;
pub mod trade;
pub mod engine;
pub mod dashboard;
