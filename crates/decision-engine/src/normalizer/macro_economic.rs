//! Macro domain rules

use decision_core::{Direction, Error, MetricBundle, Result};

use super::Reading;
use crate::config::MacroConfig;

/// Each curated factor present votes tailwind (positive value) or headwind
/// (negative value). Confidence grows by `confidence_per_factor` for every
/// net corroborating factor, capped at 100. Metrics outside the curated set
/// are kept in the snapshot but do not vote.
pub(crate) fn derive(bundle: &MetricBundle, config: &MacroConfig) -> Result<Reading> {
    let mut present = 0_u32;
    let mut tailwinds = 0_i32;
    let mut headwinds = 0_i32;

    for factor in &config.factors {
        let Some(value) = bundle.optional(factor)? else {
            continue;
        };
        present += 1;
        if value > 0.0 {
            tailwinds += 1;
        } else if value < 0.0 {
            headwinds += 1;
        }
    }

    if present == 0 {
        return Err(Error::MissingMetric(format!(
            "any of [{}]",
            config.factors.join(", ")
        )));
    }

    let net = tailwinds - headwinds;
    if net == 0 {
        return Ok(Reading::neutral(0.0));
    }

    let confidence = (f64::from(net.abs()) * config.confidence_per_factor).min(100.0);
    Ok(Reading::new(Direction::from_sign(f64::from(net)), confidence))
}
