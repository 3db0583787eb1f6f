//! Raw metric bundles handed over by providers
//!
//! A `MetricBundle` is a domain-tagged map from metric name to value. It
//! supports both plain key-value access and checked accessors that the
//! normalizer uses to reject missing or non-finite inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::signal::Domain;

/// Well-known metric names, grouped by domain
pub mod keys {
    /// Trend-strength indicator (ADX-style), 0-100
    pub const ADX: &str = "adx";
    /// Positive directional indicator
    pub const PLUS_DI: &str = "plus_di";
    /// Negative directional indicator
    pub const MINUS_DI: &str = "minus_di";
    /// Rate-of-change style momentum, signed
    pub const MOMENTUM: &str = "momentum";
    /// MACD histogram, signed
    pub const MACD_HISTOGRAM: &str = "macd_histogram";
    /// Relative strength index, 0-100
    pub const RSI: &str = "rsi";
    /// Position within the Bollinger bands (0 = lower band, 1 = upper band)
    pub const BOLLINGER_PCT_B: &str = "bollinger_pct_b";

    /// Return on equity, percent
    pub const RETURN_ON_EQUITY: &str = "return_on_equity";
    /// Net margin, percent
    pub const NET_MARGIN: &str = "net_margin";
    /// Revenue growth, percent
    pub const REVENUE_GROWTH: &str = "revenue_growth";

    /// Aggregate sentiment score in [-1, 1]
    pub const SENTIMENT_SCORE: &str = "sentiment_score";
    /// Dispersion of opinion across sources in [0, 1]
    pub const SENTIMENT_DISPERSION: &str = "sentiment_dispersion";

    /// Model-implied intrinsic value
    pub const INTRINSIC_VALUE: &str = "intrinsic_value";
    /// Discounted cash flow value
    pub const DCF_VALUE: &str = "dcf_value";
    /// Owner earnings value
    pub const OWNER_EARNINGS_VALUE: &str = "owner_earnings_value";
    /// Market value (market capitalisation)
    pub const MARKET_VALUE: &str = "market_value";
}

/// Domain-tagged snapshot of raw metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub domain: Domain,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl MetricBundle {
    /// Create an empty bundle for a domain
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            metrics: BTreeMap::new(),
        }
    }

    /// Add a metric, builder style
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a metric
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    /// Get a metric as-is
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Get a metric that must be present and finite
    pub fn require(&self, name: &str) -> Result<f64> {
        match self.metrics.get(name) {
            None => Err(Error::MissingMetric(name.to_string())),
            Some(value) if !value.is_finite() => Err(Error::NonFiniteMetric(name.to_string())),
            Some(value) => Ok(*value),
        }
    }

    /// Get an optional metric; present-but-non-finite is still an error
    pub fn optional(&self, name: &str) -> Result<Option<f64>> {
        match self.metrics.get(name) {
            None => Ok(None),
            Some(value) if !value.is_finite() => Err(Error::NonFiniteMetric(name.to_string())),
            Some(value) => Ok(Some(*value)),
        }
    }

    /// Get a required metric and check it lies in `[min, max]`
    pub fn require_in_range(&self, name: &str, min: f64, max: f64) -> Result<f64> {
        let value = self.require(name)?;
        if value < min || value > max {
            return Err(Error::MetricOutOfRange {
                name: name.to_string(),
                value,
                expected: format!("[{min}, {max}]"),
            });
        }
        Ok(value)
    }

    /// Fail unless the bundle is tagged with `expected`
    pub fn expect_domain(&self, expected: Domain) -> Result<()> {
        if self.domain == expected {
            Ok(())
        } else {
            Err(Error::DomainMismatch {
                expected,
                found: self.domain,
            })
        }
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Finite metrics only, with the names of the NaN or infinite ones left out
    pub fn finite_snapshot(&self) -> (BTreeMap<String, f64>, Vec<String>) {
        let mut dropped = Vec::new();
        let snapshot = self
            .metrics
            .iter()
            .filter_map(|(name, value)| {
                if value.is_finite() {
                    Some((name.clone(), *value))
                } else {
                    dropped.push(name.clone());
                    None
                }
            })
            .collect();
        (snapshot, dropped)
    }

    /// Merge another bundle's metrics into this one (other values override)
    pub fn merge(&mut self, other: MetricBundle) {
        self.metrics.extend(other.metrics);
    }
}
