//! Error types for decision-core

use thiserror::Error;

use crate::signal::Domain;

/// Result type alias for decision-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for provider and metric operations
#[derive(Error, Debug)]
pub enum Error {
    /// A metric provider could not produce its bundle
    #[error("{domain} provider failed: {reason}")]
    ProviderFailed { domain: Domain, reason: String },

    /// A required metric is absent from a bundle
    #[error("missing metric '{0}'")]
    MissingMetric(String),

    /// A metric is present but NaN or infinite
    #[error("metric '{0}' is not a finite number")]
    NonFiniteMetric(String),

    /// A metric is outside the range its domain accepts
    #[error("metric '{name}' = {value} is outside {expected}")]
    MetricOutOfRange {
        name: String,
        value: f64,
        expected: String,
    },

    /// A bundle was handed to the wrong domain
    #[error("bundle tagged {found} where {expected} was expected")]
    DomainMismatch { expected: Domain, found: Domain },
}
