//! Canonical per-domain signals

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One analytical perspective on a security
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Domain {
    Technical,
    Fundamental,
    Sentiment,
    Valuation,
    Macro,
}

impl Domain {
    /// Every domain, in signal-table order
    pub const ALL: [Domain; 5] = [
        Domain::Technical,
        Domain::Fundamental,
        Domain::Sentiment,
        Domain::Valuation,
        Domain::Macro,
    ];

    /// Upper-case tag used in logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Technical => "TECHNICAL",
            Domain::Fundamental => "FUNDAMENTAL",
            Domain::Sentiment => "SENTIMENT",
            Domain::Valuation => "VALUATION",
            Domain::Macro => "MACRO",
        }
    }

    /// Position of this domain in the signal table
    pub fn index(&self) -> usize {
        match self {
            Domain::Technical => 0,
            Domain::Fundamental => 1,
            Domain::Sentiment => 2,
            Domain::Valuation => 3,
            Domain::Macro => 4,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical lean of a domain's signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Direction from the sign of a score; zero and NaN are neutral
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Direction::Bullish
        } else if value < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Direction::Neutral)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Bullish => "BULLISH",
            Direction::Bearish => "BEARISH",
            Direction::Neutral => "NEUTRAL",
        };
        f.write_str(s)
    }
}

/// Why a signal was replaced by the NEUTRAL/0 fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalFallback {
    /// No bundle was supplied for the domain
    MissingBundle,
    /// The bundle could not be interpreted
    MalformedBundle { reason: String },
    /// The provider did not answer within the per-domain timeout
    TimedOut,
    /// The provider returned an error
    ProviderFailed { reason: String },
}

impl fmt::Display for SignalFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalFallback::MissingBundle => f.write_str("missing metric bundle"),
            SignalFallback::MalformedBundle { reason } => write!(f, "malformed bundle: {reason}"),
            SignalFallback::TimedOut => f.write_str("provider timed out"),
            SignalFallback::ProviderFailed { reason } => write!(f, "provider failed: {reason}"),
        }
    }
}

/// A domain's normalized `(direction, confidence)` pair plus the metrics it
/// was derived from
///
/// Confidence is always in `[0, 100]`. A confidence of 0 is a real signal
/// that carries zero weight, not an absent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSignal {
    pub domain: Domain,
    pub direction: Direction,
    pub confidence: f64,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<SignalFallback>,
    /// Metrics left out of `metrics` because they were NaN or infinite
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_metrics: Vec<String>,
}

impl DomainSignal {
    /// Build a derived signal; confidence is clamped into `[0, 100]`
    pub fn new(
        domain: Domain,
        direction: Direction,
        confidence: f64,
        metrics: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            domain,
            direction,
            confidence: clamp_confidence(confidence),
            metrics,
            fallback: None,
            dropped_metrics: Vec::new(),
        }
    }

    /// The "no information" signal: NEUTRAL with confidence 0
    pub fn neutral_fallback(
        domain: Domain,
        reason: SignalFallback,
        metrics: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            domain,
            direction: Direction::Neutral,
            confidence: 0.0,
            metrics,
            fallback: Some(reason),
            dropped_metrics: Vec::new(),
        }
    }

    /// Record metric names that could not be kept in the snapshot
    pub fn with_dropped_metrics(mut self, names: Vec<String>) -> Self {
        self.dropped_metrics = names;
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Clamp into `[0, 100]`, mapping NaN to 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
