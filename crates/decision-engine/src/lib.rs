//! Signal aggregation and decision engine
//!
//! Resolves heterogeneous, possibly contradictory per-domain signals into one
//! BUY / SELL / HOLD recommendation with a confidence and a risk-bounded
//! position size.
//!
//! A run flows leaf to root:
//!
//! 1. [`normalizer`] turns each domain's [`MetricBundle`] into a
//!    [`DomainSignal`]; missing or malformed bundles become NEUTRAL/0.
//! 2. [`debate`] splits the signal table into bull and bear cases and nets
//!    their confidence.
//! 3. [`risk`] scores volatility, drawdown and VaR and caps the position.
//! 4. [`synthesizer`] combines the two into the final [`Decision`].
//!
//! # Example
//!
//! ```rust
//! use decision_engine::{DecisionEngine, EvaluationRequest, RiskInputs};
//! use decision_core::{Domain, MetricBundle, keys};
//!
//! let engine = DecisionEngine::default();
//! let request = EvaluationRequest::new("AAPL", RiskInputs::new(24.0, -15.0, -2.1, 50_000.0, 190.0))
//!     .with_bundle(MetricBundle::new(Domain::Technical).with(keys::ADX, 35.0).with(keys::MOMENTUM, 1.2));
//!
//! let decision = engine.evaluate(&request)?;
//! assert_eq!(decision.signal_table.len(), 5);
//! # Ok::<(), decision_engine::EngineError>(())
//! ```

pub mod config;
pub mod debate;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod risk;
pub mod synthesizer;

pub use config::{
    DebateConfig, EngineConfig, EngineConfigBuilder, NormalizerConfig, RiskConfig,
    RiskScoreBreakpoints, SynthesizerConfig,
};
pub use debate::{DebateOutcome, DebateVerdict, resolve_debate};
pub use engine::{Decision, DecisionEngine, EvaluationRequest, RunMetadata};
pub use error::{EngineError, InvalidRiskField, Result, RiskField};
pub use normalizer::{build_signal_table, normalize};
pub use risk::{RiskInputs, RiskProfile, evaluate_risk};
pub use synthesizer::{Action, DecisionPath, Synthesis, synthesize, valuation_veto};

pub use decision_core::{
    Direction, Domain, DomainSignal, MetricBundle, MetricProvider, SignalFallback, StaticProvider,
};
