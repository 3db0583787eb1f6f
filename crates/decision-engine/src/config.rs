//! Policy configuration for the decision engine
//!
//! Every threshold, breakpoint and table the engine consults lives in an
//! [`EngineConfig`] value that is passed explicitly into each component. Two
//! engines holding different configurations can evaluate concurrently.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Number of distinct risk scores (0 through 10)
pub const RISK_SCORE_LEVELS: usize = 11;

/// Default curated macro factors
pub const DEFAULT_MACRO_FACTORS: [&str; 8] = [
    "monetary_policy",
    "fiscal_policy",
    "industry_policy",
    "interest_rate_trend",
    "credit_conditions",
    "trade_environment",
    "regulatory_climate",
    "structural_growth",
];

/// Technical domain thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalConfig {
    /// Trend strength below which the trend is "weak"
    pub weak_trend_threshold: f64,
    /// Multiplier applied to confidence under a weak trend
    pub weak_trend_confidence_factor: f64,
    /// RSI at or above which mean reversion votes bearish
    pub rsi_overbought: f64,
    /// RSI at or below which mean reversion votes bullish
    pub rsi_oversold: f64,
    /// %B above which price is stretched above the upper band
    pub pct_b_upper: f64,
    /// %B below which price is stretched below the lower band
    pub pct_b_lower: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            weak_trend_threshold: 25.0,
            weak_trend_confidence_factor: 0.5,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            pct_b_upper: 1.0,
            pct_b_lower: 0.0,
        }
    }
}

/// Fundamental domain bands, all in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalConfig {
    pub roe_low: f64,
    pub roe_high: f64,
    pub margin_low: f64,
    pub margin_high: f64,
    pub growth_low: f64,
    pub growth_high: f64,
}

impl Default for FundamentalConfig {
    fn default() -> Self {
        Self {
            roe_low: 2.0,
            roe_high: 15.0,
            margin_low: 5.0,
            margin_high: 20.0,
            growth_low: 0.0,
            growth_high: 10.0,
        }
    }
}

/// Sentiment domain thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Half-width of the neutral band around a score of 0
    pub dead_zone: f64,
    /// Dispersion at or above which opinion counts as split
    pub split_threshold: f64,
    /// Confidence ceiling for split opinion
    pub split_confidence_cap: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.2,
            split_threshold: 0.5,
            split_confidence_cap: 40.0,
        }
    }
}

/// Valuation domain thresholds, in percent of market value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Gaps within +/- this band are NEUTRAL
    pub dead_zone_pct: f64,
    /// Gap magnitude at which confidence reaches 100
    pub saturation_gap_pct: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            dead_zone_pct: 10.0,
            saturation_gap_pct: 50.0,
        }
    }
}

/// Macro domain flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// Metric names that count as policy/structural factors
    pub factors: Vec<String>,
    /// Confidence contributed by each net corroborating factor
    pub confidence_per_factor: f64,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            factors: DEFAULT_MACRO_FACTORS.iter().map(ToString::to_string).collect(),
            confidence_per_factor: 35.0,
        }
    }
}

/// Per-domain normalizer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub technical: TechnicalConfig,
    pub fundamental: FundamentalConfig,
    pub sentiment: SentimentConfig,
    pub valuation: ValuationConfig,
    #[serde(rename = "macro")]
    pub macro_economic: MacroConfig,
}

/// Debate resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// `|net_confidence_diff|` below this is inconclusive
    pub indecision_threshold: f64,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            indecision_threshold: 3.0,
        }
    }
}

/// Ascending breakpoints; each one a value reaches adds a risk point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskScoreBreakpoints {
    /// Historical volatility, percent
    pub volatility_pct: Vec<f64>,
    /// Max drawdown magnitude, percent
    pub drawdown_pct: Vec<f64>,
    /// VaR magnitude, percent
    pub value_at_risk_pct: Vec<f64>,
}

impl Default for RiskScoreBreakpoints {
    fn default() -> Self {
        Self {
            volatility_pct: vec![15.0, 25.0, 35.0, 50.0, 70.0],
            drawdown_pct: vec![10.0, 20.0, 30.0, 40.0, 50.0],
            value_at_risk_pct: Vec::new(),
        }
    }
}

/// Risk evaluator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub risk_score_breakpoints: RiskScoreBreakpoints,
    /// Fraction of capital allowed per risk score, indexed 0..=10
    pub capital_allocation_fraction_table: Vec<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_score_breakpoints: RiskScoreBreakpoints::default(),
            capital_allocation_fraction_table: vec![
                0.25, 0.22, 0.20, 0.17, 0.15, 0.12, 0.10, 0.07, 0.05, 0.02, 0.0,
            ],
        }
    }
}

impl RiskConfig {
    /// Allocation fraction for a score; scores past the table use its last entry
    pub fn allocation_fraction(&self, risk_score: u8) -> f64 {
        let table = &self.capital_allocation_fraction_table;
        table
            .get(usize::from(risk_score))
            .or_else(|| table.last())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Decision synthesizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Bearish valuation confidence at which a bullish lean is vetoed
    pub valuation_veto_threshold: f64,
    /// Largest number of units a single BUY may add
    pub single_run_increment_cap: u64,
    /// How strongly `|net_confidence_diff|` pulls HOLD confidence below 50
    pub inconclusive_dampening: f64,
    /// Exponent applied to domain coverage when scaling directional confidence
    pub coverage_exponent: f64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            valuation_veto_threshold: 80.0,
            single_run_increment_cap: 1_000,
            inconclusive_dampening: 0.5,
            coverage_exponent: 0.5,
        }
    }
}

/// Complete engine policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Label recorded on every decision produced under this policy
    pub policy_version: String,
    pub normalizer: NormalizerConfig,
    pub debate: DebateConfig,
    pub risk: RiskConfig,
    pub synthesizer: SynthesizerConfig,
    /// Per-domain provider timeout in milliseconds
    pub domain_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy_version: "default-v1".to_string(),
            normalizer: NormalizerConfig::default(),
            debate: DebateConfig::default(),
            risk: RiskConfig::default(),
            synthesizer: SynthesizerConfig::default(),
            domain_timeout_ms: 5_000,
        }
    }
}

fn config_err(msg: impl Into<String>) -> EngineError {
    EngineError::ConfigError(msg.into())
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(config_err(format!("{name} must be within [{min}, {max}], got {value}")));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(config_err(format!("{name} must be a finite non-negative number, got {value}")));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(config_err(format!("{name} must be greater than 0, got {value}")));
    }
    Ok(())
}

fn check_ordered(low_name: &str, low: f64, high_name: &str, high: f64) -> Result<()> {
    if !low.is_finite() || !high.is_finite() || low > high {
        return Err(config_err(format!(
            "{low_name} ({low}) must not exceed {high_name} ({high})"
        )));
    }
    Ok(())
}

fn check_breakpoints(name: &str, points: &[f64]) -> Result<()> {
    for value in points {
        check_non_negative(name, *value)?;
    }
    if points.windows(2).any(|w| w[0] >= w[1]) {
        return Err(config_err(format!("{name} breakpoints must be strictly ascending")));
    }
    Ok(())
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load and validate a JSON policy file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON policy
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-domain provider timeout
    pub fn domain_timeout(&self) -> Duration {
        Duration::from_millis(self.domain_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.policy_version.trim().is_empty() {
            return Err(config_err("policy_version must not be empty"));
        }
        if self.domain_timeout_ms == 0 {
            return Err(config_err("domain_timeout_ms must be greater than 0"));
        }

        let technical = &self.normalizer.technical;
        check_range("weak_trend_threshold", technical.weak_trend_threshold, 0.0, 100.0)?;
        check_range(
            "weak_trend_confidence_factor",
            technical.weak_trend_confidence_factor,
            0.0,
            1.0,
        )?;
        check_ordered("rsi_oversold", technical.rsi_oversold, "rsi_overbought", technical.rsi_overbought)?;
        check_ordered("pct_b_lower", technical.pct_b_lower, "pct_b_upper", technical.pct_b_upper)?;

        let fundamental = &self.normalizer.fundamental;
        check_ordered("roe_low", fundamental.roe_low, "roe_high", fundamental.roe_high)?;
        check_ordered("margin_low", fundamental.margin_low, "margin_high", fundamental.margin_high)?;
        check_ordered("growth_low", fundamental.growth_low, "growth_high", fundamental.growth_high)?;

        let sentiment = &self.normalizer.sentiment;
        check_positive("sentiment dead_zone", sentiment.dead_zone)?;
        if sentiment.dead_zone >= 1.0 {
            return Err(config_err(format!(
                "sentiment dead_zone must be below 1, got {}",
                sentiment.dead_zone
            )));
        }
        check_range("split_threshold", sentiment.split_threshold, 0.0, 1.0)?;
        check_range("split_confidence_cap", sentiment.split_confidence_cap, 0.0, 100.0)?;

        let valuation = &self.normalizer.valuation;
        check_non_negative("valuation dead_zone_pct", valuation.dead_zone_pct)?;
        check_positive("saturation_gap_pct", valuation.saturation_gap_pct)?;
        check_ordered(
            "dead_zone_pct",
            valuation.dead_zone_pct,
            "saturation_gap_pct",
            valuation.saturation_gap_pct,
        )?;

        let macro_economic = &self.normalizer.macro_economic;
        if macro_economic.factors.is_empty() {
            return Err(config_err("macro factors must not be empty"));
        }
        check_positive("confidence_per_factor", macro_economic.confidence_per_factor)?;

        check_range("indecision_threshold", self.debate.indecision_threshold, 0.0, 100.0)?;

        let breakpoints = &self.risk.risk_score_breakpoints;
        check_breakpoints("volatility_pct", &breakpoints.volatility_pct)?;
        check_breakpoints("drawdown_pct", &breakpoints.drawdown_pct)?;
        check_breakpoints("value_at_risk_pct", &breakpoints.value_at_risk_pct)?;

        let table = &self.risk.capital_allocation_fraction_table;
        if table.len() != RISK_SCORE_LEVELS {
            return Err(config_err(format!(
                "capital_allocation_fraction_table needs {RISK_SCORE_LEVELS} entries, got {}",
                table.len()
            )));
        }
        for fraction in table {
            check_range("capital allocation fraction", *fraction, 0.0, 1.0)?;
        }
        if table.windows(2).any(|w| w[1] > w[0]) {
            return Err(config_err(
                "capital_allocation_fraction_table must be non-increasing in risk score",
            ));
        }

        let synthesizer = &self.synthesizer;
        check_range("valuation_veto_threshold", synthesizer.valuation_veto_threshold, 0.0, 100.0)?;
        check_non_negative("inconclusive_dampening", synthesizer.inconclusive_dampening)?;
        check_non_negative("coverage_exponent", synthesizer.coverage_exponent)?;

        Ok(())
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    policy_version: Option<String>,
    normalizer: Option<NormalizerConfig>,
    indecision_threshold: Option<f64>,
    valuation_veto_threshold: Option<f64>,
    risk_score_breakpoints: Option<RiskScoreBreakpoints>,
    capital_allocation_fraction_table: Option<Vec<f64>>,
    single_run_increment_cap: Option<u64>,
    inconclusive_dampening: Option<f64>,
    coverage_exponent: Option<f64>,
    domain_timeout: Option<Duration>,
}

impl EngineConfigBuilder {
    /// Set the policy version label
    pub fn policy_version(mut self, version: impl Into<String>) -> Self {
        self.policy_version = Some(version.into());
        self
    }

    /// Replace all normalizer thresholds
    pub fn normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Set the debate indecision threshold
    pub fn indecision_threshold(mut self, threshold: f64) -> Self {
        self.indecision_threshold = Some(threshold);
        self
    }

    /// Set the valuation veto threshold
    pub fn valuation_veto_threshold(mut self, threshold: f64) -> Self {
        self.valuation_veto_threshold = Some(threshold);
        self
    }

    /// Set the risk score breakpoints
    pub fn risk_score_breakpoints(mut self, breakpoints: RiskScoreBreakpoints) -> Self {
        self.risk_score_breakpoints = Some(breakpoints);
        self
    }

    /// Set the capital allocation fraction table
    pub fn capital_allocation_fraction_table(mut self, table: Vec<f64>) -> Self {
        self.capital_allocation_fraction_table = Some(table);
        self
    }

    /// Set the single-run increment cap
    pub fn single_run_increment_cap(mut self, cap: u64) -> Self {
        self.single_run_increment_cap = Some(cap);
        self
    }

    /// Set the HOLD confidence dampening factor
    pub fn inconclusive_dampening(mut self, dampening: f64) -> Self {
        self.inconclusive_dampening = Some(dampening);
        self
    }

    /// Set the coverage exponent
    pub fn coverage_exponent(mut self, exponent: f64) -> Self {
        self.coverage_exponent = Some(exponent);
        self
    }

    /// Set the per-domain provider timeout
    pub fn domain_timeout(mut self, timeout: Duration) -> Self {
        self.domain_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            policy_version: self.policy_version.unwrap_or(defaults.policy_version),
            normalizer: self.normalizer.unwrap_or(defaults.normalizer),
            debate: DebateConfig {
                indecision_threshold: self
                    .indecision_threshold
                    .unwrap_or(defaults.debate.indecision_threshold),
            },
            risk: RiskConfig {
                risk_score_breakpoints: self
                    .risk_score_breakpoints
                    .unwrap_or(defaults.risk.risk_score_breakpoints),
                capital_allocation_fraction_table: self
                    .capital_allocation_fraction_table
                    .unwrap_or(defaults.risk.capital_allocation_fraction_table),
            },
            synthesizer: SynthesizerConfig {
                valuation_veto_threshold: self
                    .valuation_veto_threshold
                    .unwrap_or(defaults.synthesizer.valuation_veto_threshold),
                single_run_increment_cap: self
                    .single_run_increment_cap
                    .unwrap_or(defaults.synthesizer.single_run_increment_cap),
                inconclusive_dampening: self
                    .inconclusive_dampening
                    .unwrap_or(defaults.synthesizer.inconclusive_dampening),
                coverage_exponent: self
                    .coverage_exponent
                    .unwrap_or(defaults.synthesizer.coverage_exponent),
            },
            domain_timeout_ms: self
                .domain_timeout
                .map_or(defaults.domain_timeout_ms, |d| d.as_millis() as u64),
        };

        config.validate()?;
        Ok(config)
    }
}
