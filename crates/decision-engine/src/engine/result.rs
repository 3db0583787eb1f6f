//! Decision artifact produced by one run

use chrono::{DateTime, Utc};
use decision_core::{Domain, DomainSignal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debate::DebateOutcome;
use crate::error::Result;
use crate::risk::RiskProfile;
use crate::synthesizer::{Action, DecisionPath};

/// Identity of one evaluation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub ticker: String,
    pub evaluated_at: DateTime<Utc>,
    /// Policy the decision was produced under
    pub policy_version: String,
}

impl RunMetadata {
    pub fn new(ticker: impl Into<String>, policy_version: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            ticker: ticker.into(),
            evaluated_at: Utc::now(),
            policy_version: policy_version.into(),
        }
    }
}

/// Final recommendation with everything needed to explain it
///
/// Built fresh for every run and never mutated afterwards. The debate outcome
/// and risk profile are carried along so a report renderer never has to
/// recompute a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub run: RunMetadata,
    pub action: Action,
    pub confidence: f64,
    pub path: DecisionPath,
    /// One signal per domain, in canonical domain order
    pub signal_table: Vec<DomainSignal>,
    pub position_recommendation: u64,
    pub debate: DebateOutcome,
    pub risk: RiskProfile,
}

impl Decision {
    /// Look up the signal for a domain
    pub fn signal(&self, domain: Domain) -> Option<&DomainSignal> {
        self.signal_table.iter().find(|s| s.domain == domain)
    }

    /// Domains whose signal is a fallback
    pub fn fallback_domains(&self) -> Vec<Domain> {
        self.signal_table
            .iter()
            .filter(|s| s.is_fallback())
            .map(|s| s.domain)
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let path = match self.path {
            DecisionPath::Inconclusive => "inconclusive debate".to_string(),
            DecisionPath::ValuationVeto {
                valuation_confidence,
            } => format!("valuation veto at {valuation_confidence:.1}"),
            DecisionPath::Directional => "directional".to_string(),
        };
        format!(
            "{} {} (confidence {:.1}, {}), position {} of max {}, risk score {}",
            self.action,
            self.run.ticker,
            self.confidence,
            path,
            self.position_recommendation,
            self.risk.max_allowed_position_units,
            self.risk.risk_score,
        )
    }
}
