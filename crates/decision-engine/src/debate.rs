//! Bull/bear debate resolver
//!
//! Splits the signal table into a bull case and a bear case and nets their
//! confidence into one signed differential. The differential is averaged over
//! the domains that actually voted, so a single strong signal is not diluted
//! by domains that abstained.

use decision_core::{Direction, DomainSignal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DebateConfig;

/// Tagged result of a debate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebateVerdict {
    BullLean,
    BearLean,
    /// No usable lean; the synthesizer must hold
    Inconclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateOutcome {
    /// Signed, in `[-100, 100]`; positive is a bullish lean
    pub net_confidence_diff: f64,
    pub bull_case: Vec<DomainSignal>,
    pub bear_case: Vec<DomainSignal>,
    pub verdict: DebateVerdict,
}

impl DebateOutcome {
    pub fn is_inconclusive(&self) -> bool {
        self.verdict == DebateVerdict::Inconclusive
    }

    /// Number of domains that voted BULLISH or BEARISH
    pub fn directional_count(&self) -> usize {
        self.bull_case.len() + self.bear_case.len()
    }

    /// Recompute the differential from the two cases
    pub fn recompute_diff(&self) -> f64 {
        net_diff(&self.bull_case, &self.bear_case)
    }
}

fn net_diff(bull_case: &[DomainSignal], bear_case: &[DomainSignal]) -> f64 {
    let voters = bull_case.len() + bear_case.len();
    if voters == 0 {
        return 0.0;
    }
    let bull: f64 = bull_case.iter().map(|s| s.confidence).sum();
    let bear: f64 = bear_case.iter().map(|s| s.confidence).sum();
    ((bull - bear) / voters as f64).clamp(-100.0, 100.0)
}

/// Resolve the debate over a signal table
///
/// The outcome is inconclusive when nobody voted, when the votes cancel
/// exactly, or when `|net_confidence_diff|` is under the indecision
/// threshold.
pub fn resolve_debate(signals: &[DomainSignal], config: &DebateConfig) -> DebateOutcome {
    let bull_case: Vec<DomainSignal> = signals
        .iter()
        .filter(|s| s.direction == Direction::Bullish)
        .cloned()
        .collect();
    let bear_case: Vec<DomainSignal> = signals
        .iter()
        .filter(|s| s.direction == Direction::Bearish)
        .cloned()
        .collect();

    let net_confidence_diff = net_diff(&bull_case, &bear_case);
    let no_votes = bull_case.is_empty() && bear_case.is_empty();

    let verdict = if no_votes
        || net_confidence_diff == 0.0
        || net_confidence_diff.abs() < config.indecision_threshold
    {
        DebateVerdict::Inconclusive
    } else if net_confidence_diff > 0.0 {
        DebateVerdict::BullLean
    } else {
        DebateVerdict::BearLean
    };

    debug!(
        bulls = bull_case.len(),
        bears = bear_case.len(),
        net_confidence_diff,
        ?verdict,
        "debate resolved"
    );

    DebateOutcome {
        net_confidence_diff,
        bull_case,
        bear_case,
        verdict,
    }
}
