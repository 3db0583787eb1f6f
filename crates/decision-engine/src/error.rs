//! Error types for decision engine operations

use std::fmt;
use thiserror::Error;

/// Risk input fields that can fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskField {
    AvailableCapital,
    CurrentPrice,
    HistoricalVolatility,
    MaxDrawdown,
    ValueAtRisk,
    VarConfidenceLevel,
    MaxPositionFraction,
}

impl RiskField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskField::AvailableCapital => "available_capital",
            RiskField::CurrentPrice => "current_price",
            RiskField::HistoricalVolatility => "historical_volatility_pct",
            RiskField::MaxDrawdown => "max_drawdown_pct",
            RiskField::ValueAtRisk => "value_at_risk_pct",
            RiskField::VarConfidenceLevel => "var_confidence_level",
            RiskField::MaxPositionFraction => "max_position_fraction",
        }
    }
}

/// One rejected risk input
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRiskField {
    pub field: RiskField,
    pub value: f64,
    pub reason: &'static str,
}

impl fmt::Display for InvalidRiskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} ({})", self.field.as_str(), self.value, self.reason)
    }
}

fn describe_fields(fields: &[InvalidRiskField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decision engine errors
///
/// Only a misconfigured risk input or an invalid configuration aborts a run;
/// per-domain problems are absorbed by the normalizer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Risk inputs failed validation; the run produces no decision
    #[error("Misconfigured risk input: {}", describe_fields(.fields))]
    MisconfiguredRiskInput { fields: Vec<InvalidRiskField> },

    /// Engine configuration failed validation
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The evaluation request itself is unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EngineError {
    /// Fields rejected by risk validation, if that is what failed
    pub fn invalid_risk_fields(&self) -> Option<&[InvalidRiskField]> {
        match self {
            EngineError::MisconfiguredRiskInput { fields } => Some(fields),
            _ => None,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
