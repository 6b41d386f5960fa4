//! Prompt construction shared by all advisory sources.

use crate::types::{Analysis, Market};

/// JSON shape every source is asked to return.
pub const VERDICT_SCHEMA: &str = r#"{"direction":"YES|NO","conviction":"NUCLEAR|HIGH|MEDIUM|LOW","targetPrice":number,"stopLoss":number,"confidenceScore":number,"reasoning":string[]}"#;

/// System instruction sent alongside every market prompt.
pub fn system_prompt() -> &'static str {
    "You are a prediction-market trading desk analyst. \
     Reply with a single JSON object that matches the schema you are given. \
     Prices are probabilities between 0 and 1. confidenceScore is an integer from 0 to 100. \
     reasoning is a short list of signal labels. Output no prose outside the JSON."
}

/// Build the per-market prompt.
pub fn build_prompt(market: &Market, analysis: &Analysis) -> String {
    let mut prompt = String::with_capacity(512);

    prompt.push_str(&format!("MARKET: \"{}\"\n", market.question));
    prompt.push_str(&format!("PRICE (YES): {:.1}c\n", market.price * 100.0));
    prompt.push_str(&format!("LIQUIDITY: ${:.0}\n", market.liquidity));
    prompt.push_str(&format!("VOLUME 24H: ${:.0}\n", market.volume_24h));
    prompt.push_str(&format!("EDGE SCORE: {}/10\n", analysis.score));
    prompt.push_str(&format!("SIGNALS: {}\n", analysis.tags.join(",")));
    prompt.push_str(&format!("\nReturn strict JSON only. Schema: {VERDICT_SCHEMA}\n"));

    prompt
}
