//! Metric provider trait definition

use async_trait::async_trait;

use crate::bundle::MetricBundle;
use crate::error::{Error, Result};
use crate::signal::Domain;

/// Source of raw metrics for one analytical domain
///
/// Providers are black boxes to the engine: anything from a cached snapshot
/// to a remote indicator service. The engine bounds each `fetch` with its own
/// timeout, so implementations do not need one.
#[async_trait]
pub trait MetricProvider: Send + Sync {
    /// The domain whose bundle this provider produces
    fn domain(&self) -> Domain;

    /// Produce the metric bundle for `ticker`
    async fn fetch(&self, ticker: &str) -> Result<MetricBundle>;

    /// Provider name for logs
    fn name(&self) -> &str {
        self.domain().as_str()
    }
}

/// Provider that serves a pre-computed bundle
#[derive(Debug, Clone)]
pub struct StaticProvider {
    bundle: MetricBundle,
}

impl StaticProvider {
    pub fn new(bundle: MetricBundle) -> Self {
        Self { bundle }
    }
}

#[async_trait]
impl MetricProvider for StaticProvider {
    fn domain(&self) -> Domain {
        self.bundle.domain
    }

    async fn fetch(&self, ticker: &str) -> Result<MetricBundle> {
        if ticker.trim().is_empty() {
            return Err(Error::ProviderFailed {
                domain: self.bundle.domain,
                reason: "empty ticker".to_string(),
            });
        }
        tracing::debug!(domain = %self.bundle.domain, ticker, "serving static bundle");
        Ok(self.bundle.clone())
    }
}
