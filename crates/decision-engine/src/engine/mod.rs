//! Decision Engine
//!
//! Coordination layer for one evaluation run

pub mod decision_engine;
pub mod request;
pub mod result;

pub use decision_engine::DecisionEngine;
pub use request::EvaluationRequest;
pub use result::{Decision, RunMetadata};
