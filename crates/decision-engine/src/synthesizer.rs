//! Decision synthesizer
//!
//! Single join point of a run: the debate outcome supplies direction and
//! strength, the risk profile bounds the position. Branches are tried in a
//! fixed order (inconclusive, valuation veto, directional) and the branch
//! taken is recorded on the result.

use decision_core::{Direction, Domain, DomainSignal};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::config::SynthesizerConfig;
use crate::debate::DebateOutcome;
use crate::risk::RiskProfile;

/// Number of analytical domains a full signal table covers
const DOMAIN_COUNT: f64 = Domain::ALL.len() as f64;

/// Ceiling for HOLD confidence
const HOLD_CONFIDENCE_CEILING: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which synthesizer branch produced the action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionPath {
    /// Debate had no usable lean
    Inconclusive,
    /// A bullish lean overridden by a strongly bearish valuation
    ValuationVeto { valuation_confidence: f64 },
    /// Action follows the debate lean
    Directional,
}

impl DecisionPath {
    pub fn is_veto(&self) -> bool {
        matches!(self, DecisionPath::ValuationVeto { .. })
    }
}

/// Output of [`synthesize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub action: Action,
    pub confidence: f64,
    pub path: DecisionPath,
    pub position_recommendation: u64,
}

/// Valuation veto check
///
/// Returns the valuation confidence when a bullish lean must be overridden:
/// the differential is positive and the valuation signal is BEARISH at or
/// above `valuation_veto_threshold`. Returns `None` otherwise, including when
/// no valuation signal is available.
pub fn valuation_veto(
    debate: &DebateOutcome,
    valuation: Option<&DomainSignal>,
    config: &SynthesizerConfig,
) -> Option<f64> {
    let signal = valuation?;
    let vetoes = debate.net_confidence_diff > 0.0
        && signal.direction == Direction::Bearish
        && signal.confidence >= config.valuation_veto_threshold;
    vetoes.then_some(signal.confidence)
}

/// HOLD confidence, pulled below 50 by the strength of the overridden lean
pub fn dampened_hold_confidence(net_confidence_diff: f64, config: &SynthesizerConfig) -> f64 {
    (HOLD_CONFIDENCE_CEILING - net_confidence_diff.abs() * config.inconclusive_dampening)
        .clamp(0.0, HOLD_CONFIDENCE_CEILING)
}

/// Directional confidence, scaled down when few domains voted
pub fn directional_confidence(debate: &DebateOutcome, config: &SynthesizerConfig) -> f64 {
    let coverage = debate.directional_count() as f64 / DOMAIN_COUNT;
    (debate.net_confidence_diff.abs() * coverage.powf(config.coverage_exponent)).min(100.0)
}

/// Position size for an action, bounded by the risk allowance
pub fn recommend_position(action: Action, risk: &RiskProfile, config: &SynthesizerConfig) -> u64 {
    match action {
        Action::Buy => risk
            .max_allowed_position_units
            .saturating_sub(risk.current_position_units)
            .min(config.single_run_increment_cap),
        Action::Sell => 0,
        Action::Hold if risk.is_over_allocated() => 0,
        Action::Hold => risk.current_position_units,
    }
}

/// Combine the debate and risk profile into an action
pub fn synthesize(
    debate: &DebateOutcome,
    valuation: Option<&DomainSignal>,
    risk: &RiskProfile,
    config: &SynthesizerConfig,
) -> Synthesis {
    let (action, confidence, path) = if debate.is_inconclusive() {
        (
            Action::Hold,
            dampened_hold_confidence(debate.net_confidence_diff, config),
            DecisionPath::Inconclusive,
        )
    } else if let Some(valuation_confidence) = valuation_veto(debate, valuation, config) {
        warn!(
            net_confidence_diff = debate.net_confidence_diff,
            valuation_confidence, "bullish lean vetoed by valuation"
        );
        (
            Action::Hold,
            dampened_hold_confidence(debate.net_confidence_diff, config),
            DecisionPath::ValuationVeto {
                valuation_confidence,
            },
        )
    } else {
        let action = if debate.net_confidence_diff > 0.0 {
            Action::Buy
        } else {
            Action::Sell
        };
        (
            action,
            directional_confidence(debate, config),
            DecisionPath::Directional,
        )
    };

    let position_recommendation = recommend_position(action, risk, config);
    debug!(%action, confidence, ?path, position_recommendation, "decision synthesized");

    Synthesis {
        action,
        confidence,
        path,
        position_recommendation,
    }
}
