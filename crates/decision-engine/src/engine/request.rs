//! Evaluation request

use decision_core::MetricBundle;
use serde::{Deserialize, Serialize};

use crate::risk::RiskInputs;

/// Everything one synchronous evaluation needs
///
/// Bundles may arrive in any order and the same domain may appear more than
/// once; duplicates are merged before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub ticker: String,
    #[serde(default)]
    pub bundles: Vec<MetricBundle>,
    pub risk: RiskInputs,
}

impl EvaluationRequest {
    pub fn new(ticker: impl Into<String>, risk: RiskInputs) -> Self {
        Self {
            ticker: ticker.into(),
            bundles: Vec::new(),
            risk,
        }
    }

    pub fn with_bundle(mut self, bundle: MetricBundle) -> Self {
        self.bundles.push(bundle);
        self
    }

    pub fn with_bundles(mut self, bundles: impl IntoIterator<Item = MetricBundle>) -> Self {
        self.bundles.extend(bundles);
        self
    }

    /// Parse a request from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
