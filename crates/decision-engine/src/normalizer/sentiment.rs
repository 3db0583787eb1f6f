//! Sentiment domain rules

use decision_core::{Direction, MetricBundle, Result, keys};

use super::Reading;
use crate::config::SentimentConfig;

/// Direction comes from the score and its dead zone; confidence is scaled by
/// agreement across sources and capped outright when opinion is split.
pub(crate) fn derive(bundle: &MetricBundle, config: &SentimentConfig) -> Result<Reading> {
    let score = bundle.require_in_range(keys::SENTIMENT_SCORE, -1.0, 1.0)?;
    let dispersion = if bundle.contains_key(keys::SENTIMENT_DISPERSION) {
        bundle.require_in_range(keys::SENTIMENT_DISPERSION, 0.0, 1.0)?
    } else {
        0.0
    };

    let magnitude = score.abs();
    let (direction, raw) = if magnitude <= config.dead_zone {
        (Direction::Neutral, (1.0 - magnitude / config.dead_zone) * 100.0)
    } else {
        (Direction::from_sign(score), magnitude * 100.0)
    };

    let mut confidence = raw * (1.0 - dispersion);
    if dispersion >= config.split_threshold {
        confidence = confidence.min(config.split_confidence_cap);
    }

    Ok(Reading::new(direction, confidence))
}
