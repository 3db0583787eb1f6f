//! Valuation veto walkthrough
//!
//! Feeds a contested set of domain bundles through the provider fan-out and
//! prints the resulting decision. Technical and macro lean bullish, but the
//! valuation model says the stock is worth nothing, so the bullish lean is
//! vetoed and the engine holds.
//!
//! To run this example:
//! ```bash
//! RUST_LOG=debug cargo run -p decision-engine --example valuation_veto
//! ```

use decision_core::{Domain, MetricBundle, MetricProvider, StaticProvider, keys};
use decision_engine::{DecisionEngine, EngineConfig, RiskInputs};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    decision_utils::init_tracing();

    let bundles = [
        MetricBundle::new(Domain::Technical)
            .with(keys::ADX, 42.0)
            .with(keys::PLUS_DI, 28.0)
            .with(keys::MINUS_DI, 17.0),
        MetricBundle::new(Domain::Fundamental)
            .with(keys::RETURN_ON_EQUITY, 1.2)
            .with(keys::NET_MARGIN, 11.0)
            .with(keys::REVENUE_GROWTH, 48.0),
        MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_SCORE, 0.06),
        MetricBundle::new(Domain::Valuation)
            .with(keys::INTRINSIC_VALUE, 0.0)
            .with(keys::MARKET_VALUE, 2.4e11),
        MetricBundle::new(Domain::Macro)
            .with("monetary_policy", 1.0)
            .with("industry_policy", 1.0),
    ];
    let providers: Vec<Arc<dyn MetricProvider>> = bundles
        .into_iter()
        .map(|bundle| Arc::new(StaticProvider::new(bundle)) as Arc<dyn MetricProvider>)
        .collect();

    let engine = DecisionEngine::new(EngineConfig::default())?;
    let risk = RiskInputs::new(22.0, -14.0, -2.3, 100_000.0, 50.0).with_position(100);

    let decision = engine
        .evaluate_with_providers("600519", &providers, &risk)
        .await?;

    println!("{}\n", decision.summary());
    for signal in &decision.signal_table {
        println!(
            "  {:<12} {:<8} {:>6.1}",
            signal.domain.as_str(),
            signal.direction.to_string(),
            signal.confidence
        );
    }
    println!("\n{}", decision.to_json()?);

    Ok(())
}
