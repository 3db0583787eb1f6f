//! Valuation domain rules
//!
//! The signal is the gap between model-implied intrinsic value and market
//! value, in percent of market value. Confidence grows linearly with the gap
//! until `saturation_gap_pct` and stays at 100 beyond it, so an intrinsic
//! value near zero (gap of -100%) is a full-confidence BEARISH signal.

use decision_core::{Direction, Error, MetricBundle, Result, keys};

use super::Reading;
use crate::config::ValuationConfig;

/// Gap between intrinsic and market value in percent
pub fn valuation_gap_pct(intrinsic: f64, market: f64) -> f64 {
    (intrinsic - market) / market * 100.0
}

/// Intrinsic value is either given directly or estimated by one or both of
/// the DCF and owner-earnings models; with both, their gaps are averaged.
fn gap_from_bundle(bundle: &MetricBundle) -> Result<f64> {
    let market = bundle.require(keys::MARKET_VALUE)?;
    if market <= 0.0 {
        return Err(Error::MetricOutOfRange {
            name: keys::MARKET_VALUE.to_string(),
            value: market,
            expected: "(0, inf)".to_string(),
        });
    }

    if let Some(intrinsic) = bundle.optional(keys::INTRINSIC_VALUE)? {
        return Ok(valuation_gap_pct(intrinsic, market));
    }

    let gaps: Vec<f64> = [keys::DCF_VALUE, keys::OWNER_EARNINGS_VALUE]
        .into_iter()
        .map(|name| bundle.optional(name))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .map(|value| valuation_gap_pct(value, market))
        .collect();

    if gaps.is_empty() {
        return Err(Error::MissingMetric(keys::INTRINSIC_VALUE.to_string()));
    }
    Ok(gaps.iter().sum::<f64>() / gaps.len() as f64)
}

pub(crate) fn derive(bundle: &MetricBundle, config: &ValuationConfig) -> Result<Reading> {
    let gap = gap_from_bundle(bundle)?;
    let magnitude = gap.abs();

    if magnitude <= config.dead_zone_pct {
        let confidence = if config.dead_zone_pct > 0.0 {
            (1.0 - magnitude / config.dead_zone_pct) * 100.0
        } else {
            100.0
        };
        return Ok(Reading::neutral(confidence));
    }

    let confidence = (magnitude / config.saturation_gap_pct).min(1.0) * 100.0;
    Ok(Reading::new(Direction::from_sign(gap), confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use decision_core::Domain;

    fn bundle(intrinsic: f64, market: f64) -> MetricBundle {
        MetricBundle::new(Domain::Valuation)
            .with(keys::INTRINSIC_VALUE, intrinsic)
            .with(keys::MARKET_VALUE, market)
    }

    #[test]
    fn test_zero_intrinsic_value_is_full_confidence_bearish() {
        let reading = derive(&bundle(0.0, 2.4e11), &ValuationConfig::default()).unwrap();
        assert_eq!(reading.direction, Direction::Bearish);
        assert_eq!(reading.confidence, 100.0);
    }

    #[test]
    fn test_moderate_overvaluation_scales() {
        let reading = derive(&bundle(80.0, 100.0), &ValuationConfig::default()).unwrap();
        assert_eq!(reading.direction, Direction::Bearish);
        assert!((reading.confidence - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_saturates() {
        let config = ValuationConfig::default();
        let at_saturation = derive(&bundle(150.0, 100.0), &config).unwrap();
        let far_beyond = derive(&bundle(900.0, 100.0), &config).unwrap();
        assert_eq!(at_saturation.confidence, 100.0);
        assert_eq!(far_beyond.confidence, 100.0);
        assert_eq!(far_beyond.direction, Direction::Bullish);
    }

    #[test]
    fn test_small_gap_is_neutral() {
        let reading = derive(&bundle(104.0, 100.0), &ValuationConfig::default()).unwrap();
        assert_eq!(reading.direction, Direction::Neutral);
    }

    #[test]
    fn test_confidence_is_monotone_in_gap_magnitude() {
        let config = ValuationConfig::default();
        let mut previous = 0.0;
        for step in 11..=100 {
            let intrinsic = 100.0 - f64::from(step);
            let reading = derive(&bundle(intrinsic, 100.0), &config).unwrap();
            assert_eq!(reading.direction, Direction::Bearish);
            assert!(reading.confidence >= previous);
            previous = reading.confidence;
        }
    }

    #[test]
    fn test_dcf_and_owner_earnings_gaps_are_averaged() {
        let b = MetricBundle::new(Domain::Valuation)
            .with(keys::DCF_VALUE, 60.0)
            .with(keys::OWNER_EARNINGS_VALUE, 100.0)
            .with(keys::MARKET_VALUE, 100.0);
        let reading = derive(&b, &ValuationConfig::default()).unwrap();
        assert_eq!(reading.direction, Direction::Bearish);
        assert!((reading.confidence - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_market_value_is_an_error() {
        assert!(derive(&bundle(10.0, 0.0), &ValuationConfig::default()).is_err());
        let b = MetricBundle::new(Domain::Valuation).with(keys::MARKET_VALUE, 100.0);
        assert!(derive(&b, &ValuationConfig::default()).is_err());
    }
}
