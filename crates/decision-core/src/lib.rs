//! Core data model for the signal aggregation and decision engine
//!
//! This crate defines the types shared between metric providers and the
//! engine: the analytical [`Domain`]s, the canonical [`DomainSignal`] each
//! domain is normalized into, the raw [`MetricBundle`] a provider hands over,
//! and the [`MetricProvider`] trait itself.

pub mod bundle;
pub mod error;
pub mod provider;
pub mod signal;

pub use bundle::{MetricBundle, keys};
pub use error::{Error, Result};
pub use provider::{MetricProvider, StaticProvider};
pub use signal::{Direction, Domain, DomainSignal, SignalFallback};
