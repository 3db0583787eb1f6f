//! Domain signal normalizer
//!
//! Turns each provider's raw [`MetricBundle`] into one canonical
//! [`DomainSignal`]. Every domain has its own threshold rules; what they
//! share is the failure policy: a missing or malformed bundle becomes a
//! NEUTRAL signal with confidence 0 and a recorded [`SignalFallback`], and the
//! run carries on.

pub mod fundamental;
pub mod macro_economic;
pub mod sentiment;
pub mod technical;
pub mod valuation;

use decision_core::{Direction, Domain, DomainSignal, MetricBundle, Result, SignalFallback};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::NormalizerConfig;

/// Direction and confidence derived by a domain rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub direction: Direction,
    pub confidence: f64,
}

impl Reading {
    pub fn new(direction: Direction, confidence: f64) -> Self {
        Self {
            direction,
            confidence,
        }
    }

    pub fn neutral(confidence: f64) -> Self {
        Self::new(Direction::Neutral, confidence)
    }
}

/// Sign of a value as -1, 0 or +1 (`f64::signum` maps 0 to 1)
pub(crate) fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Normalize one domain; never fails
pub fn normalize(
    domain: Domain,
    bundle: Option<&MetricBundle>,
    config: &NormalizerConfig,
) -> DomainSignal {
    let Some(bundle) = bundle else {
        warn!(%domain, "no metric bundle supplied, treating as no information");
        return DomainSignal::neutral_fallback(domain, SignalFallback::MissingBundle, BTreeMap::new());
    };

    let (snapshot, dropped) = bundle.finite_snapshot();
    if !dropped.is_empty() {
        warn!(%domain, dropped = ?dropped, "non-finite metrics left out of the snapshot");
    }

    let signal = match derive(domain, bundle, config) {
        Ok(reading) => {
            debug!(
                %domain,
                direction = %reading.direction,
                confidence = reading.confidence,
                "domain signal derived"
            );
            DomainSignal::new(domain, reading.direction, reading.confidence, snapshot)
        }
        Err(err) => {
            warn!(%domain, error = %err, "malformed metric bundle, treating as no information");
            DomainSignal::neutral_fallback(
                domain,
                SignalFallback::MalformedBundle {
                    reason: err.to_string(),
                },
                snapshot,
            )
        }
    };
    signal.with_dropped_metrics(dropped)
}

fn derive(domain: Domain, bundle: &MetricBundle, config: &NormalizerConfig) -> Result<Reading> {
    bundle.expect_domain(domain)?;
    match domain {
        Domain::Technical => technical::derive(bundle, &config.technical),
        Domain::Fundamental => fundamental::derive(bundle, &config.fundamental),
        Domain::Sentiment => sentiment::derive(bundle, &config.sentiment),
        Domain::Valuation => valuation::derive(bundle, &config.valuation),
        Domain::Macro => macro_economic::derive(bundle, &config.macro_economic),
    }
}

/// Group bundles by domain, merging duplicates in order
pub fn group_bundles(bundles: &[MetricBundle]) -> BTreeMap<Domain, MetricBundle> {
    let mut grouped: BTreeMap<Domain, MetricBundle> = BTreeMap::new();
    for bundle in bundles {
        if let Some(existing) = grouped.get_mut(&bundle.domain) {
            debug!(domain = %bundle.domain, "merging duplicate metric bundle");
            existing.merge(bundle.clone());
        } else {
            grouped.insert(bundle.domain, bundle.clone());
        }
    }
    grouped
}

/// Normalize every domain into a signal table in canonical domain order
pub fn build_signal_table(bundles: &[MetricBundle], config: &NormalizerConfig) -> Vec<DomainSignal> {
    let grouped = group_bundles(bundles);
    Domain::ALL
        .iter()
        .map(|domain| normalize(*domain, grouped.get(domain), config))
        .collect()
}
