//! Command-line interface for the decision engine
//!
//! Reads a run description (ticker, per-domain metric bundles, risk inputs),
//! evaluates it and prints the decision as JSON.
//!
//! # Usage
//!
//! ```bash
//! decide --input run.json
//! decide --input run.json --config policy.json --initial-capital 250000 --summary
//! RUST_LOG=decision_engine=debug decide --input run.json --log-json
//! ```

mod summary;

use anyhow::Context as _;
use clap::Parser;
use decision_core::{MetricProvider, StaticProvider};
use decision_engine::{DecisionEngine, EngineConfig, EvaluationRequest};
use decision_utils::LogConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "decide")]
#[command(about = "Resolve per-domain signals and risk inputs into a trade decision", long_about = None)]
struct Args {
    /// Run description: `{ ticker, bundles, risk }` as JSON
    #[arg(short, long)]
    input: PathBuf,

    /// Policy file overriding the default engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticker, overriding the one in the input file
    #[arg(short, long)]
    ticker: Option<String>,

    /// Available cash, overriding `risk.available_capital`
    #[arg(long)]
    initial_capital: Option<f64>,

    /// Units already held, overriding `risk.current_position_units`
    #[arg(long)]
    initial_position: Option<u64>,

    /// Also print the signal table
    #[arg(long)]
    summary: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Apply command-line overrides to the request read from disk
    fn apply_overrides(&self, request: &mut EvaluationRequest) {
        if let Some(ticker) = &self.ticker {
            request.ticker.clone_from(ticker);
        }
        if let Some(capital) = self.initial_capital {
            request.risk.available_capital = capital;
        }
        if let Some(units) = self.initial_position {
            request.risk.current_position_units = units;
        }
    }

    fn log_config(&self) -> LogConfig {
        let config = LogConfig::default();
        if self.log_json { config.json() } else { config }
    }
}

fn load_request(path: &Path) -> anyhow::Result<EvaluationRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    EvaluationRequest::from_json(&content)
        .with_context(|| format!("failed to parse input file {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load policy {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Serve each bundle through its own provider so the run goes through the
/// concurrent fetch path
fn static_providers(request: &EvaluationRequest) -> Vec<Arc<dyn MetricProvider>> {
    request
        .bundles
        .iter()
        .cloned()
        .map(|bundle| Arc::new(StaticProvider::new(bundle)) as Arc<dyn MetricProvider>)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    decision_utils::init_tracing_with(&args.log_config());

    let mut request = load_request(&args.input)?;
    args.apply_overrides(&mut request);

    let engine = DecisionEngine::new(load_config(args.config.as_deref())?)?;
    info!(
        ticker = %request.ticker,
        policy = %engine.config().policy_version,
        "evaluating"
    );

    let providers = static_providers(&request);
    let decision = engine
        .evaluate_with_providers(&request.ticker, &providers, &request.risk)
        .await?;

    println!("{}", decision.to_json()?);
    if args.summary {
        println!();
        println!("{}", summary::render(&decision));
    }

    Ok(())
}
