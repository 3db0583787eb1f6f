//! Risk evaluator
//!
//! Turns volatility, drawdown and VaR readings plus portfolio constraints into
//! a bounded risk score and a maximum position size. Inputs are validated as a
//! whole and every bad field is reported; nothing is clamped into range.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{RiskConfig, RiskScoreBreakpoints};
use crate::error::{EngineError, InvalidRiskField, Result, RiskField};

/// Highest risk score the evaluator produces
pub const MAX_RISK_SCORE: u8 = 10;

fn default_var_confidence_level() -> f64 {
    0.95
}

/// Raw risk inputs for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    /// Annualised historical volatility, percent (non-negative)
    pub historical_volatility_pct: f64,
    /// Maximum drawdown, percent (zero or negative)
    pub max_drawdown_pct: f64,
    /// Value at risk, percent (zero or negative)
    pub value_at_risk_pct: f64,
    /// Confidence level the VaR was computed at
    #[serde(default = "default_var_confidence_level")]
    pub var_confidence_level: f64,
    /// Cash available for the position
    pub available_capital: f64,
    pub current_price: f64,
    #[serde(default)]
    pub current_position_units: u64,
    /// Optional hard cap on the capital fraction one position may take
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_position_fraction: Option<f64>,
}

impl RiskInputs {
    pub fn new(
        historical_volatility_pct: f64,
        max_drawdown_pct: f64,
        value_at_risk_pct: f64,
        available_capital: f64,
        current_price: f64,
    ) -> Self {
        Self {
            historical_volatility_pct,
            max_drawdown_pct,
            value_at_risk_pct,
            var_confidence_level: default_var_confidence_level(),
            available_capital,
            current_price,
            current_position_units: 0,
            max_position_fraction: None,
        }
    }

    pub fn with_position(mut self, units: u64) -> Self {
        self.current_position_units = units;
        self
    }

    pub fn with_max_position_fraction(mut self, fraction: f64) -> Self {
        self.max_position_fraction = Some(fraction);
        self
    }

    pub fn with_var_confidence_level(mut self, level: f64) -> Self {
        self.var_confidence_level = level;
        self
    }
}

/// Risk assessment consumed by the synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub risk_score: u8,
    pub historical_volatility_pct: f64,
    pub max_drawdown_pct: f64,
    pub value_at_risk_95_pct: f64,
    pub var_confidence_level: f64,
    pub current_position_units: u64,
    pub max_allowed_position_units: u64,
    /// Capital fraction actually applied, after the per-position cap
    pub allocation_fraction: f64,
    /// Units held beyond `max_allowed_position_units`
    pub excess_units: u64,
}

impl RiskProfile {
    pub fn is_over_allocated(&self) -> bool {
        self.excess_units > 0
    }
}

/// Check every risk input and collect all failures
pub fn validate_risk_inputs(inputs: &RiskInputs) -> Result<()> {
    let mut fields = Vec::new();
    let mut reject = |field: RiskField, value: f64, reason: &'static str| {
        fields.push(InvalidRiskField {
            field,
            value,
            reason,
        });
    };

    if !inputs.available_capital.is_finite() || inputs.available_capital <= 0.0 {
        reject(
            RiskField::AvailableCapital,
            inputs.available_capital,
            "must be positive and finite",
        );
    }
    if !inputs.current_price.is_finite() || inputs.current_price <= 0.0 {
        reject(
            RiskField::CurrentPrice,
            inputs.current_price,
            "must be positive and finite",
        );
    }
    if !inputs.historical_volatility_pct.is_finite() || inputs.historical_volatility_pct < 0.0 {
        reject(
            RiskField::HistoricalVolatility,
            inputs.historical_volatility_pct,
            "must be non-negative and finite",
        );
    }
    if !inputs.max_drawdown_pct.is_finite() || inputs.max_drawdown_pct > 0.0 {
        reject(
            RiskField::MaxDrawdown,
            inputs.max_drawdown_pct,
            "must be zero or negative",
        );
    }
    if !inputs.value_at_risk_pct.is_finite() || inputs.value_at_risk_pct > 0.0 {
        reject(
            RiskField::ValueAtRisk,
            inputs.value_at_risk_pct,
            "must be zero or negative",
        );
    }
    let level = inputs.var_confidence_level;
    if !(level > 0.0 && level < 1.0) {
        reject(RiskField::VarConfidenceLevel, level, "must be within (0, 1)");
    }
    if let Some(fraction) = inputs.max_position_fraction {
        if !(fraction > 0.0 && fraction <= 1.0) {
            reject(
                RiskField::MaxPositionFraction,
                fraction,
                "must be within (0, 1]",
            );
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(EngineError::MisconfiguredRiskInput { fields })
    }
}

fn points(value: f64, breakpoints: &[f64]) -> usize {
    breakpoints.iter().filter(|b| **b <= value).count()
}

/// Bounded risk score from the configured breakpoints
pub fn risk_score(inputs: &RiskInputs, breakpoints: &RiskScoreBreakpoints) -> u8 {
    let total = points(inputs.historical_volatility_pct, &breakpoints.volatility_pct)
        + points(inputs.max_drawdown_pct.abs(), &breakpoints.drawdown_pct)
        + points(inputs.value_at_risk_pct.abs(), &breakpoints.value_at_risk_pct);
    total.min(usize::from(MAX_RISK_SCORE)) as u8
}

/// Whole units the allocation fraction buys at the current price
pub fn max_allowed_units(fraction: f64, available_capital: f64, current_price: f64) -> u64 {
    (fraction * available_capital / current_price).floor() as u64
}

/// Evaluate risk for one run
///
/// Fails with [`EngineError::MisconfiguredRiskInput`] before computing
/// anything if an input is out of its domain.
pub fn evaluate_risk(inputs: &RiskInputs, config: &RiskConfig) -> Result<RiskProfile> {
    validate_risk_inputs(inputs)?;

    let risk_score = risk_score(inputs, &config.risk_score_breakpoints);
    let mut allocation_fraction = config.allocation_fraction(risk_score);
    if let Some(cap) = inputs.max_position_fraction {
        allocation_fraction = allocation_fraction.min(cap);
    }

    let max_allowed_position_units = max_allowed_units(
        allocation_fraction,
        inputs.available_capital,
        inputs.current_price,
    );
    let excess_units = inputs
        .current_position_units
        .saturating_sub(max_allowed_position_units);

    if excess_units > 0 {
        warn!(
            current = inputs.current_position_units,
            max_allowed = max_allowed_position_units,
            excess_units,
            "position exceeds risk allowance; trim left to execution"
        );
    }

    debug!(
        risk_score,
        allocation_fraction, max_allowed_position_units, "risk evaluated"
    );

    Ok(RiskProfile {
        risk_score,
        historical_volatility_pct: inputs.historical_volatility_pct,
        max_drawdown_pct: inputs.max_drawdown_pct,
        value_at_risk_95_pct: inputs.value_at_risk_pct,
        var_confidence_level: inputs.var_confidence_level,
        current_position_units: inputs.current_position_units,
        max_allowed_position_units,
        allocation_fraction,
        excess_units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(volatility: f64, drawdown: f64) -> RiskInputs {
        RiskInputs::new(volatility, drawdown, -2.0, 100_000.0, 50.0)
    }

    #[test]
    fn test_calm_security_gets_low_score_and_large_allowance() {
        let profile = evaluate_risk(&inputs(10.0, -5.0), &RiskConfig::default()).unwrap();
        assert_eq!(profile.risk_score, 0);
        assert_eq!(profile.allocation_fraction, 0.25);
        assert_eq!(profile.max_allowed_position_units, 500);
        assert_eq!(profile.excess_units, 0);
    }

    #[test]
    fn test_score_counts_breakpoints_reached() {
        let config = RiskConfig::default();
        let profile = evaluate_risk(&inputs(30.0, -25.0), &config).unwrap();
        assert_eq!(profile.risk_score, 4);
        assert_eq!(profile.max_allowed_position_units, 300);

        let profile = evaluate_risk(&inputs(95.0, -80.0), &config).unwrap();
        assert_eq!(profile.risk_score, MAX_RISK_SCORE);
        assert_eq!(profile.max_allowed_position_units, 0);
    }

    #[test]
    fn test_var_breakpoints_contribute_when_configured() {
        let mut config = RiskConfig::default();
        config.risk_score_breakpoints.value_at_risk_pct = vec![1.0, 3.0];
        let profile = evaluate_risk(&inputs(10.0, -5.0), &config).unwrap();
        assert_eq!(profile.risk_score, 1);
    }

    #[test]
    fn test_score_is_capped_at_ten() {
        let mut config = RiskConfig::default();
        config.risk_score_breakpoints.value_at_risk_pct = vec![1.0, 2.0, 3.0, 4.0];
        let i = RiskInputs::new(90.0, -90.0, -10.0, 1_000.0, 10.0);
        assert_eq!(risk_score(&i, &config.risk_score_breakpoints), 10);
    }

    #[test]
    fn test_per_position_cap_limits_fraction() {
        let i = inputs(10.0, -5.0).with_max_position_fraction(0.1);
        let profile = evaluate_risk(&i, &RiskConfig::default()).unwrap();
        assert_eq!(profile.allocation_fraction, 0.1);
        assert_eq!(profile.max_allowed_position_units, 200);
    }

    #[test]
    fn test_over_allocation_is_reported_not_liquidated() {
        let i = inputs(60.0, -35.0).with_position(900);
        let profile = evaluate_risk(&i, &RiskConfig::default()).unwrap();
        assert_eq!(profile.current_position_units, 900);
        assert!(profile.is_over_allocated());
        assert_eq!(
            profile.excess_units,
            900 - profile.max_allowed_position_units
        );
    }

    #[test]
    fn test_allowance_never_increases_with_score() {
        let config = RiskConfig::default();
        for capital in [1_000.0, 25_000.0, 1_000_000.0] {
            for price in [0.5, 12.0, 310.0] {
                let mut previous = u64::MAX;
                for score in 0..=MAX_RISK_SCORE {
                    let units =
                        max_allowed_units(config.allocation_fraction(score), capital, price);
                    assert!(units <= previous, "score {score}, capital {capital}, price {price}");
                    previous = units;
                }
            }
        }
    }

    #[test]
    fn test_allowance_never_increases_with_volatility() {
        let config = RiskConfig::default();
        let mut previous_units = u64::MAX;
        let mut previous_score = 0;
        for step in 0..=40 {
            let volatility = f64::from(step) * 2.5;
            let profile = evaluate_risk(&inputs(volatility, -12.0), &config).unwrap();
            assert!(profile.risk_score >= previous_score);
            assert!(profile.max_allowed_position_units <= previous_units);
            previous_score = profile.risk_score;
            previous_units = profile.max_allowed_position_units;
        }
    }

    #[test]
    fn test_allowance_never_increases_with_drawdown() {
        let config = RiskConfig::default();
        let mut previous_units = u64::MAX;
        let mut previous_score = 0;
        for step in 0..=40 {
            let drawdown = -f64::from(step) * 2.5;
            let profile = evaluate_risk(&inputs(20.0, drawdown), &config).unwrap();
            assert!(profile.risk_score >= previous_score, "drawdown {drawdown}");
            assert!(profile.max_allowed_position_units <= previous_units, "drawdown {drawdown}");
            previous_score = profile.risk_score;
            previous_units = profile.max_allowed_position_units;
        }
        assert!(previous_score > evaluate_risk(&inputs(20.0, 0.0), &config).unwrap().risk_score);
    }

    #[test]
    fn test_every_invalid_field_is_listed() {
        let i = RiskInputs::new(f64::NAN, 4.0, 1.0, -5.0, 0.0)
            .with_var_confidence_level(1.0)
            .with_max_position_fraction(1.5);
        let err = evaluate_risk(&i, &RiskConfig::default()).unwrap_err();
        let fields: Vec<RiskField> = err
            .invalid_risk_fields()
            .unwrap()
            .iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                RiskField::AvailableCapital,
                RiskField::CurrentPrice,
                RiskField::HistoricalVolatility,
                RiskField::MaxDrawdown,
                RiskField::ValueAtRisk,
                RiskField::VarConfidenceLevel,
                RiskField::MaxPositionFraction,
            ]
        );
    }

    #[test]
    fn test_valid_inputs_pass_validation() {
        assert!(validate_risk_inputs(&inputs(0.0, 0.0)).is_ok());
        let i = RiskInputs::new(18.0, -22.0, 0.0, 10.0, 1.0).with_max_position_fraction(1.0);
        assert!(validate_risk_inputs(&i).is_ok());
    }

    #[test]
    fn test_risk_inputs_deserialize_with_defaults() {
        let json = r#"{
            "historical_volatility_pct": 28.0,
            "max_drawdown_pct": -18.5,
            "value_at_risk_pct": -2.1,
            "available_capital": 100000.0,
            "current_price": 42.0
        }"#;
        let i: RiskInputs = serde_json::from_str(json).unwrap();
        assert_eq!(i.var_confidence_level, 0.95);
        assert_eq!(i.current_position_units, 0);
        assert!(i.max_position_fraction.is_none());
    }
}
