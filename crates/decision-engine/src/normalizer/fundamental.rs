//! Fundamental domain rules
//!
//! Return on equity, net margin and revenue growth each vote against their
//! band. Growth and quality pointing in opposite directions is a
//! contradiction, and a contradiction is NEUTRAL with confidence 0 rather than
//! a win for either side.

use decision_core::{Direction, Error, MetricBundle, Result, keys};

use super::Reading;
use crate::config::FundamentalConfig;

fn band_vote(value: f64, low: f64, high: f64) -> i32 {
    if value < low {
        -1
    } else if value > high {
        1
    } else {
        0
    }
}

pub(crate) fn derive(bundle: &MetricBundle, config: &FundamentalConfig) -> Result<Reading> {
    let bands = [
        (keys::RETURN_ON_EQUITY, config.roe_low, config.roe_high),
        (keys::NET_MARGIN, config.margin_low, config.margin_high),
        (keys::REVENUE_GROWTH, config.growth_low, config.growth_high),
    ];

    let mut votes = Vec::with_capacity(bands.len());
    for (name, low, high) in bands {
        if let Some(value) = bundle.optional(name)? {
            votes.push(band_vote(value, low, high));
        }
    }

    if votes.is_empty() {
        return Err(Error::MissingMetric(format!(
            "{} | {} | {}",
            keys::RETURN_ON_EQUITY,
            keys::NET_MARGIN,
            keys::REVENUE_GROWTH
        )));
    }

    let contradictory = votes.contains(&1) && votes.contains(&-1);
    if contradictory {
        return Ok(Reading::neutral(0.0));
    }

    let net: i32 = votes.iter().sum();
    let confidence = f64::from(net.abs()) / votes.len() as f64 * 100.0;
    let direction = Direction::from_sign(f64::from(net));
    if direction == Direction::Neutral {
        return Ok(Reading::neutral(0.0));
    }
    Ok(Reading::new(direction, confidence))
}
