//! Notifier Port - Lifecycle Event Interface
//!
//! An explicit notification boundary instead of event-emitter
//! inheritance: the engine pushes typed events, adapters decide
//! whether that means a structured log line, a broadcast channel, or
//! an external monitoring hook.

use crate::domain::prediction::{BettingAnalysis, MarketId};

/// Lifecycle events emitted by the decision engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
  /// An analysis finished and is being returned to the caller.
  AnalysisComplete(Box<BettingAnalysis>),
  /// A fatal failure rejected the request; carries the taxonomy code.
  Error {
    market: MarketId,
    code: &'static str,
    message: String,
  },
  /// Live odds diverged materially from the quoted odds.
  OddsMovement {
    market: MarketId,
    quoted_odds: f64,
    live_odds: f64,
  },
  /// Models absorbed fresh rows via incremental update.
  PredictionsUpdated { models: Vec<String>, rows: usize },
  /// A model joined the ensemble.
  ModelAdded { model_id: String },
  /// A model left the ensemble.
  ModelRemoved { model_id: String },
}

impl EngineEvent {
  /// Stable event name for logs and downstream routing.
  pub fn name(&self) -> &'static str {
    match self {
      Self::AnalysisComplete(_) => "analysis_complete",
      Self::Error { .. } => "error",
      Self::OddsMovement { .. } => "odds_movement",
      Self::PredictionsUpdated { .. } => "predictions_updated",
      Self::ModelAdded { .. } => "model_added",
      Self::ModelRemoved { .. } => "model_removed",
    }
  }
}

/// Trait for lifecycle event consumers.
///
/// `notify` must be cheap and non-blocking; slow consumers should
/// hand off internally (e.g. via a channel).
pub trait Notifier: Send + Sync {
  fn notify(&self, event: EngineEvent);
}

/// Drops every event. Useful for tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
  fn notify(&self, _event: EngineEvent) {}
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_event_names_are_stable() {
    let event = EngineEvent::ModelAdded {
      model_id: "m".into(),
    };
    assert_eq!(event.name(), "model_added");
    let event = EngineEvent::Error {
      market: "nba-lbj-points".into(),
      code: "validation",
      message: "bad odds".into(),
    };
    assert_eq!(event.name(), "error");
  }
}
