//! Shared utilities for the decision engine workspace
//!
//! This crate provides logging setup and its configuration, used by the
//! command-line entry point and by anything embedding the engine.

pub mod config;
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
