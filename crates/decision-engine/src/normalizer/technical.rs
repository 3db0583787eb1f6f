//! Technical domain rules
//!
//! Confidence is the trend-strength indicator itself. A strong trend takes its
//! direction from directional movement (`plus_di` vs `minus_di`); a weak trend
//! defers to the momentum and mean-reversion vote and reports lower
//! confidence.

use decision_core::{Direction, MetricBundle, Result, keys};

use super::{Reading, sign};
use crate::config::TechnicalConfig;

pub(crate) fn derive(bundle: &MetricBundle, config: &TechnicalConfig) -> Result<Reading> {
    let trend_strength = bundle.require(keys::ADX)?.clamp(0.0, 100.0);
    let vote = indicator_vote(bundle, config)?;

    if trend_strength < config.weak_trend_threshold {
        return Ok(Reading::new(
            Direction::from_sign(vote),
            trend_strength * config.weak_trend_confidence_factor,
        ));
    }

    let plus_di = bundle.optional(keys::PLUS_DI)?;
    let minus_di = bundle.optional(keys::MINUS_DI)?;
    let direction = match (plus_di, minus_di) {
        (Some(plus), Some(minus)) if plus != minus => Direction::from_sign(plus - minus),
        _ => Direction::from_sign(vote),
    };

    Ok(Reading::new(direction, trend_strength))
}

/// Net vote of the momentum and mean-reversion bank; each indicator present
/// contributes -1, 0 or +1
fn indicator_vote(bundle: &MetricBundle, config: &TechnicalConfig) -> Result<f64> {
    let mut vote = 0.0;

    // momentum
    if let Some(momentum) = bundle.optional(keys::MOMENTUM)? {
        vote += sign(momentum);
    }
    if let Some(histogram) = bundle.optional(keys::MACD_HISTOGRAM)? {
        vote += sign(histogram);
    }

    // mean reversion: stretched prices lean back the other way
    if let Some(rsi) = bundle.optional(keys::RSI)? {
        if rsi >= config.rsi_overbought {
            vote -= 1.0;
        } else if rsi <= config.rsi_oversold {
            vote += 1.0;
        }
    }
    if let Some(pct_b) = bundle.optional(keys::BOLLINGER_PCT_B)? {
        if pct_b > config.pct_b_upper {
            vote -= 1.0;
        } else if pct_b < config.pct_b_lower {
            vote += 1.0;
        }
    }

    Ok(vote)
}
