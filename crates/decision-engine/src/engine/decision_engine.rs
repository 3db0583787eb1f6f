//! Run orchestration
//!
//! A run normalizes every domain, resolves the debate, evaluates risk and
//! hands both to the synthesizer. The async entry point fans provider fetches
//! out inside the run's own future, so dropping that future cancels every
//! fetch still in flight.

use decision_core::{Domain, DomainSignal, MetricBundle, MetricProvider, SignalFallback};
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::debate::resolve_debate;
use crate::error::{EngineError, Result};
use crate::normalizer::{build_signal_table, normalize};
use crate::risk::{RiskInputs, evaluate_risk, validate_risk_inputs};
use crate::synthesizer::synthesize;

use super::request::EvaluationRequest;
use super::result::{Decision, RunMetadata};

/// What a single provider fetch came back with
enum FetchOutcome {
    Fetched(MetricBundle),
    Failed(SignalFallback),
}

/// Decision engine bound to one immutable policy
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: Arc<EngineConfig>,
}

impl DecisionEngine {
    /// Create an engine; the configuration is validated once here
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate pre-fetched bundles
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<Decision> {
        check_ticker(&request.ticker)?;
        validate_risk_inputs(&request.risk)?;
        info!(
            ticker = %request.ticker,
            bundles = request.bundles.len(),
            policy = %self.config.policy_version,
            "starting evaluation"
        );

        let signal_table = build_signal_table(&request.bundles, &self.config.normalizer);
        self.decide(&request.ticker, signal_table, &request.risk)
    }

    /// Fetch bundles from providers concurrently, then evaluate
    ///
    /// Each fetch is bounded by `domain_timeout_ms`. A provider that times out
    /// or fails leaves its domain as a NEUTRAL/0 fallback. Risk inputs are
    /// checked before any provider is contacted.
    pub async fn evaluate_with_providers(
        &self,
        ticker: &str,
        providers: &[Arc<dyn MetricProvider>],
        risk: &RiskInputs,
    ) -> Result<Decision> {
        check_ticker(ticker)?;
        validate_risk_inputs(risk)?;
        info!(
            ticker,
            providers = providers.len(),
            policy = %self.config.policy_version,
            "starting evaluation"
        );

        let signal_table = self.collect_signals(ticker, providers).await;
        self.decide(ticker, signal_table, risk)
    }

    /// Fan out to every provider and build the signal table
    pub async fn collect_signals(
        &self,
        ticker: &str,
        providers: &[Arc<dyn MetricProvider>],
    ) -> Vec<DomainSignal> {
        let limit = self.config.domain_timeout();

        let fetches = providers.iter().map(|provider| async move {
            let domain = provider.domain();
            // the fetch call itself sits inside the guarded block so a panic
            // raised before the first poll is caught as well
            let guarded = AssertUnwindSafe(async { timeout(limit, provider.fetch(ticker)).await })
                .catch_unwind()
                .await;
            let outcome = match guarded {
                Ok(Ok(Ok(bundle))) => FetchOutcome::Fetched(bundle),
                Ok(Ok(Err(err))) => {
                    warn!(%domain, provider = provider.name(), error = %err, "provider failed");
                    FetchOutcome::Failed(SignalFallback::ProviderFailed {
                        reason: err.to_string(),
                    })
                }
                Ok(Err(_)) => {
                    warn!(
                        %domain,
                        provider = provider.name(),
                        timeout_ms = limit.as_millis() as u64,
                        "provider timed out"
                    );
                    FetchOutcome::Failed(SignalFallback::TimedOut)
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(%domain, provider = provider.name(), panic = %message, "provider panicked");
                    FetchOutcome::Failed(SignalFallback::ProviderFailed {
                        reason: format!("provider panicked: {message}"),
                    })
                }
            };
            (domain, outcome)
        });

        let mut fetched: BTreeMap<Domain, MetricBundle> = BTreeMap::new();
        let mut failed: BTreeMap<Domain, SignalFallback> = BTreeMap::new();
        for (domain, outcome) in join_all(fetches).await {
            match outcome {
                FetchOutcome::Fetched(bundle) => {
                    if let Some(existing) = fetched.get_mut(&domain) {
                        existing.merge(bundle);
                    } else {
                        fetched.insert(domain, bundle);
                    }
                }
                FetchOutcome::Failed(reason) => {
                    failed.entry(domain).or_insert(reason);
                }
            }
        }

        Domain::ALL
            .iter()
            .map(|domain| match (fetched.get(domain), failed.remove(domain)) {
                (Some(bundle), _) => normalize(*domain, Some(bundle), &self.config.normalizer),
                (None, Some(reason)) => {
                    DomainSignal::neutral_fallback(*domain, reason, BTreeMap::new())
                }
                (None, None) => normalize(*domain, None, &self.config.normalizer),
            })
            .collect()
    }

    fn decide(
        &self,
        ticker: &str,
        signal_table: Vec<DomainSignal>,
        risk_inputs: &RiskInputs,
    ) -> Result<Decision> {
        let debate = resolve_debate(&signal_table, &self.config.debate);
        let risk = evaluate_risk(risk_inputs, &self.config.risk)?;

        let valuation = signal_table.iter().find(|s| s.domain == Domain::Valuation);
        let synthesis = synthesize(&debate, valuation, &risk, &self.config.synthesizer);

        let decision = Decision {
            run: RunMetadata::new(ticker, self.config.policy_version.clone()),
            action: synthesis.action,
            confidence: synthesis.confidence,
            path: synthesis.path,
            signal_table,
            position_recommendation: synthesis.position_recommendation,
            debate,
            risk,
        };

        info!(
            run_id = %decision.run.run_id,
            ticker,
            action = %decision.action,
            confidence = decision.confidence,
            position = decision.position_recommendation,
            "evaluation finished"
        );
        Ok(decision)
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self {
            config: Arc::new(EngineConfig::default()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn check_ticker(ticker: &str) -> Result<()> {
    if ticker.trim().is_empty() {
        return Err(EngineError::InvalidRequest("ticker must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesizer::{Action, DecisionPath};
    use async_trait::async_trait;
    use decision_core::{Direction, StaticProvider, keys};
    use mockall::mock;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    mock! {
        Provider {}

        #[async_trait]
        impl MetricProvider for Provider {
            fn domain(&self) -> Domain;
            async fn fetch(&self, ticker: &str) -> decision_core::Result<MetricBundle>;
        }
    }

    struct SlowProvider {
        domain: Domain,
        delay: Duration,
    }

    #[async_trait]
    impl MetricProvider for SlowProvider {
        fn domain(&self) -> Domain {
            self.domain
        }

        async fn fetch(&self, _ticker: &str) -> decision_core::Result<MetricBundle> {
            tokio::time::sleep(self.delay).await;
            Ok(MetricBundle::new(self.domain).with(keys::ADX, 60.0))
        }
    }

    struct PanickingProvider {
        domain: Domain,
    }

    #[async_trait]
    impl MetricProvider for PanickingProvider {
        fn domain(&self) -> Domain {
            self.domain
        }

        async fn fetch(&self, _ticker: &str) -> decision_core::Result<MetricBundle> {
            panic!("feed handler crashed");
        }
    }

    fn risk_inputs() -> RiskInputs {
        RiskInputs::new(22.0, -14.0, -2.3, 100_000.0, 50.0).with_position(100)
    }

    /// Bundles that normalize to technical BULLISH/42, fundamental
    /// NEUTRAL/0, sentiment NEUTRAL/70, valuation BEARISH/100 and macro
    /// BULLISH/70
    fn contested_bundles() -> Vec<MetricBundle> {
        vec![
            MetricBundle::new(Domain::Technical)
                .with(keys::ADX, 42.0)
                .with(keys::PLUS_DI, 28.0)
                .with(keys::MINUS_DI, 17.0),
            MetricBundle::new(Domain::Fundamental)
                .with(keys::RETURN_ON_EQUITY, 1.2)
                .with(keys::NET_MARGIN, 11.0)
                .with(keys::REVENUE_GROWTH, 48.0),
            MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_SCORE, 0.06),
            MetricBundle::new(Domain::Valuation)
                .with(keys::INTRINSIC_VALUE, 0.0)
                .with(keys::MARKET_VALUE, 2.4e11),
            MetricBundle::new(Domain::Macro)
                .with("monetary_policy", 1.0)
                .with("industry_policy", 1.0),
        ]
    }

    #[test]
    fn test_contested_run_is_vetoed_by_valuation() {
        let engine = DecisionEngine::default();
        let request = EvaluationRequest::new("600519", risk_inputs()).with_bundles(contested_bundles());
        let decision = engine.evaluate(&request).unwrap();

        let table: Vec<(Direction, f64)> = decision
            .signal_table
            .iter()
            .map(|s| (s.direction, s.confidence))
            .collect();
        assert_eq!(table[0], (Direction::Bullish, 42.0));
        assert_eq!(table[1], (Direction::Neutral, 0.0));
        assert_eq!(table[2].0, Direction::Neutral);
        assert!((table[2].1 - 70.0).abs() < 1e-9);
        assert_eq!(table[3], (Direction::Bearish, 100.0));
        assert_eq!(table[4], (Direction::Bullish, 70.0));

        assert_eq!(decision.action, Action::Hold);
        assert!(decision.path.is_veto());
        assert!(decision.confidence < 50.0);
        assert!((decision.confidence - 48.0).abs() < 1e-6);
        assert_eq!(decision.position_recommendation, 100);
        assert_eq!(decision.run.ticker, "600519");
        assert_eq!(decision.run.policy_version, "default-v1");
    }

    #[test]
    fn test_no_bundles_holds_current_position() {
        let engine = DecisionEngine::default();
        let decision = engine
            .evaluate(&EvaluationRequest::new("MSFT", risk_inputs()))
            .unwrap();

        assert_eq!(decision.action, Action::Hold);
        assert_eq!(decision.path, DecisionPath::Inconclusive);
        assert!(decision.confidence <= 50.0);
        assert_eq!(decision.position_recommendation, 100);
        assert_eq!(decision.fallback_domains(), Domain::ALL.to_vec());
        let domains: Vec<Domain> = decision.signal_table.iter().map(|s| s.domain).collect();
        assert_eq!(domains, Domain::ALL.to_vec());
    }

    #[test]
    fn test_position_never_exceeds_allowance() {
        let engine = DecisionEngine::default();
        let bullish = vec![
            MetricBundle::new(Domain::Technical)
                .with(keys::ADX, 55.0)
                .with(keys::PLUS_DI, 30.0)
                .with(keys::MINUS_DI, 12.0),
            MetricBundle::new(Domain::Fundamental).with(keys::RETURN_ON_EQUITY, 24.0),
            MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_SCORE, 0.7),
        ];
        for current in [0, 150, 300, 900] {
            let risk = RiskInputs::new(18.0, -8.0, -1.5, 60_000.0, 40.0).with_position(current);
            let request = EvaluationRequest::new("NVDA", risk).with_bundles(bullish.clone());
            let decision = engine.evaluate(&request).unwrap();
            assert_eq!(decision.action, Action::Buy);
            let max_allowed = decision.risk.max_allowed_position_units;
            assert!(decision.position_recommendation <= max_allowed);
            assert!(decision.position_recommendation + current.min(max_allowed) <= max_allowed);
        }
    }

    #[test]
    fn test_misconfigured_risk_produces_no_decision() {
        let engine = DecisionEngine::default();
        let risk = RiskInputs::new(22.0, 5.0, -2.3, 100_000.0, 0.0);
        let request = EvaluationRequest::new("TSLA", risk).with_bundles(contested_bundles());

        let err = engine.evaluate(&request).unwrap_err();
        let fields = err.invalid_risk_fields().unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_empty_ticker_is_rejected() {
        let engine = DecisionEngine::default();
        let err = engine
            .evaluate(&EvaluationRequest::new("  ", risk_inputs()))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.risk.capital_allocation_fraction_table[3] = 0.9;
        assert!(matches!(
            DecisionEngine::new(config),
            Err(EngineError::ConfigError(_))
        ));
    }

    #[test]
    fn test_decision_json_round_trip_is_exact() {
        let engine = DecisionEngine::default();
        let mut bundles = contested_bundles();
        bundles.push(MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_DISPERSION, 0.1234567890123));
        let request = EvaluationRequest::new("600519", risk_inputs()).with_bundles(bundles);
        let decision = engine.evaluate(&request).unwrap();

        let json = decision.to_json().unwrap();
        let parsed = Decision::from_json(&json).unwrap();
        assert_eq!(parsed, decision);
        assert_eq!(parsed.confidence.to_bits(), decision.confidence.to_bits());
        for (a, b) in parsed.signal_table.iter().zip(&decision.signal_table) {
            assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
        }
    }

    #[test]
    fn test_round_trip_survives_non_finite_metrics() {
        let engine = DecisionEngine::default();
        let request = EvaluationRequest::new("600519", risk_inputs())
            .with_bundle(
                MetricBundle::new(Domain::Technical)
                    .with(keys::ADX, 40.0)
                    .with(keys::MOMENTUM, 1.0)
                    .with("vwap_gap", f64::NAN),
            )
            .with_bundle(MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_SCORE, f64::INFINITY));
        let decision = engine.evaluate(&request).unwrap();

        let json = decision.to_json().unwrap();
        assert!(!json.contains("null"));
        let parsed = Decision::from_json(&json).unwrap();
        assert_eq!(parsed, decision);

        let technical = parsed.signal(Domain::Technical).unwrap();
        assert_eq!(technical.dropped_metrics, vec!["vwap_gap".to_string()]);
        let sentiment = parsed.signal(Domain::Sentiment).unwrap();
        assert!(matches!(
            sentiment.fallback,
            Some(SignalFallback::MalformedBundle { .. })
        ));
        assert_eq!(sentiment.dropped_metrics, vec![keys::SENTIMENT_SCORE.to_string()]);
    }

    #[tokio::test]
    async fn test_static_providers_match_sync_path() {
        let engine = DecisionEngine::default();
        let providers: Vec<Arc<dyn MetricProvider>> = contested_bundles()
            .into_iter()
            .map(|b| Arc::new(StaticProvider::new(b)) as Arc<dyn MetricProvider>)
            .collect();

        let decision = assert_ok!(
            engine
                .evaluate_with_providers("600519", &providers, &risk_inputs())
                .await
        );
        let expected = engine
            .evaluate(&EvaluationRequest::new("600519", risk_inputs()).with_bundles(contested_bundles()))
            .unwrap();

        assert_eq!(decision.signal_table, expected.signal_table);
        assert_eq!(decision.action, expected.action);
        assert_eq!(decision.path, expected.path);
        assert_ne!(decision.run.run_id, expected.run.run_id);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_to_neutral() {
        let config = EngineConfig::builder()
            .domain_timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        let engine = DecisionEngine::new(config).unwrap();
        let providers: Vec<Arc<dyn MetricProvider>> = vec![
            Arc::new(SlowProvider {
                domain: Domain::Technical,
                delay: Duration::from_secs(5),
            }),
            Arc::new(StaticProvider::new(
                MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_SCORE, -0.6),
            )),
        ];

        let signals = engine.collect_signals("AMD", &providers).await;
        assert_eq!(signals[0].fallback, Some(SignalFallback::TimedOut));
        assert_eq!(signals[0].confidence, 0.0);
        assert_eq!(signals[2].direction, Direction::Bearish);
        assert_eq!(signals[1].fallback, Some(SignalFallback::MissingBundle));
    }

    #[tokio::test]
    async fn test_failing_provider_becomes_fallback() {
        let mut failing = MockProvider::new();
        failing.expect_domain().return_const(Domain::Valuation);
        failing.expect_fetch().times(1).returning(|_| {
            Err(decision_core::Error::ProviderFailed {
                domain: Domain::Valuation,
                reason: "upstream unavailable".to_string(),
            })
        });

        let engine = DecisionEngine::default();
        let providers: Vec<Arc<dyn MetricProvider>> = vec![Arc::new(failing)];
        let decision = assert_ok!(
            engine
                .evaluate_with_providers("AAPL", &providers, &risk_inputs())
                .await
        );

        let valuation = decision.signal(Domain::Valuation).unwrap();
        assert!(matches!(
            valuation.fallback,
            Some(SignalFallback::ProviderFailed { .. })
        ));
        assert_eq!(decision.action, Action::Hold);
    }

    #[tokio::test]
    async fn test_panicking_provider_does_not_abort_run() {
        let providers: Vec<Arc<dyn MetricProvider>> = vec![
            Arc::new(PanickingProvider {
                domain: Domain::Valuation,
            }),
            Arc::new(StaticProvider::new(
                MetricBundle::new(Domain::Sentiment).with(keys::SENTIMENT_SCORE, -0.6),
            )),
        ];

        let engine = DecisionEngine::default();
        let decision = assert_ok!(
            engine
                .evaluate_with_providers("AAPL", &providers, &risk_inputs())
                .await
        );

        let valuation = decision.signal(Domain::Valuation).unwrap();
        match &valuation.fallback {
            Some(SignalFallback::ProviderFailed { reason }) => {
                assert!(reason.contains("feed handler crashed"));
            }
            other => panic!("unexpected fallback {other:?}"),
        }
        assert_eq!(valuation.confidence, 0.0);
        assert_eq!(
            decision.signal(Domain::Sentiment).unwrap().direction,
            Direction::Bearish
        );
        assert!(!decision.path.is_veto());
    }

    #[tokio::test]
    async fn test_risk_is_checked_before_fetching() {
        let mut provider = MockProvider::new();
        provider.expect_domain().return_const(Domain::Technical);
        provider.expect_fetch().never();

        let engine = DecisionEngine::default();
        let providers: Vec<Arc<dyn MetricProvider>> = vec![Arc::new(provider)];
        let risk = RiskInputs::new(-1.0, -14.0, -2.3, 100_000.0, 50.0);
        assert_err!(
            engine
                .evaluate_with_providers("AAPL", &providers, &risk)
                .await
        );
    }

    #[tokio::test]
    async fn test_split_providers_for_one_domain_are_merged() {
        let providers: Vec<Arc<dyn MetricProvider>> = vec![
            Arc::new(StaticProvider::new(
                MetricBundle::new(Domain::Valuation).with(keys::MARKET_VALUE, 100.0),
            )),
            Arc::new(StaticProvider::new(
                MetricBundle::new(Domain::Valuation).with(keys::DCF_VALUE, 180.0),
            )),
        ];
        let signals = DecisionEngine::default()
            .collect_signals("KO", &providers)
            .await;
        assert_eq!(signals[3].direction, Direction::Bullish);
        assert_eq!(signals[3].confidence, 100.0);
    }
}
