//! Notifier Adapters - Structured Log and Broadcast Delivery
//!
//! Two implementations of the `Notifier` port: one that turns engine
//! events into structured tracing lines, and one that fans them out
//! over a tokio broadcast channel for in-process subscribers.

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::ports::notifier::{EngineEvent, Notifier};

/// Emits every engine event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: EngineEvent) {
        match &event {
            EngineEvent::AnalysisComplete(analysis) => {
                info!(
                    event = event.name(),
                    market = %analysis.opportunity.market,
                    probability = analysis.ensemble.probability,
                    expected_value = analysis.ensemble.expected_value,
                    risk = %analysis.ensemble.risk_level,
                    stake = analysis.ensemble.recommended_stake,
                    "Analysis delivered"
                );
            }
            EngineEvent::Error {
                market,
                code,
                message,
            } => {
                error!(event = event.name(), market = %market, code, message, "Engine error");
            }
            EngineEvent::OddsMovement {
                market,
                quoted_odds,
                live_odds,
            } => {
                warn!(
                    event = event.name(),
                    market = %market,
                    quoted_odds,
                    live_odds,
                    "Odds moved since quote"
                );
            }
            EngineEvent::PredictionsUpdated { models, rows } => {
                info!(
                    event = event.name(),
                    models = models.len(),
                    rows,
                    "Models updated"
                );
            }
            EngineEvent::ModelAdded { model_id } => {
                info!(event = event.name(), model_id, "Model added");
            }
            EngineEvent::ModelRemoved { model_id } => {
                info!(event = event.name(), model_id, "Model removed");
            }
        }
    }
}

/// Fans events out to in-process subscribers over a broadcast channel.
///
/// Send errors (no active subscribers) are ignored; notification is
/// fire-and-forget by contract.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
