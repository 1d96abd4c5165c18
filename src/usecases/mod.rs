//! Use Cases Layer - Application Orchestration
//!
//! Coordinates the domain layer through the ports: the decision
//! engine facade runs the full analysis pipeline, the hedge finder
//! runs the related-market scan it delegates to.

pub mod decision_engine;
pub mod hedge_finder;

pub use decision_engine::{DecisionEngine, EngineSettings};
pub use hedge_finder::HedgeFinder;
