//! Error taxonomy for the decision engine.
//!
//! Every fatal failure surfaced by `analyze` carries one of these variants,
//! so callers can branch on the failure class instead of parsing messages.
//! Isolated, non-fatal failures (a single model excluded, hedge scan
//! unavailable) never appear here — they are folded into the analysis
//! `factors` list instead.

use thiserror::Error;

/// Typed errors produced by the ensemble and decision pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Zero total weight, meta-learner misconfiguration, or an ensemble
    /// left with no usable model predictions. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single model's fit failed (empty or malformed dataset).
    #[error("training failed for model '{model}': {reason}")]
    Training { model: String, reason: String },

    /// A single model's predict failed (missing required features).
    /// Isolated by the aggregator unless a meta-learner is configured.
    #[error("inference failed for model '{model}': {reason}")]
    Inference { model: String, reason: String },

    /// External market data unavailable. Fatal on the main prediction
    /// path, non-fatal (empty hedge list + warning) for the hedge scan.
    #[error("market data fetch failed: {0}")]
    DataFetch(String),

    /// Malformed caller input (odds, stake, probability out of range).
    /// Rejected immediately, no retry.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A model did not respond within the prediction deadline.
    /// Treated like an inference failure (isolate and continue) unless
    /// no usable models remain.
    #[error("model '{model}' did not respond within {deadline_ms} ms")]
    PredictionTimeout { model: String, deadline_ms: u64 },
}

impl EngineError {
    /// Short stable code for logs and notifications.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Training { .. } => "training",
            Self::Inference { .. } => "inference",
            Self::DataFetch(_) => "data_fetch",
            Self::Validation(_) => "validation",
            Self::PredictionTimeout { .. } => "prediction_timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(EngineError::Configuration("x".into()).code(), "configuration");
        assert_eq!(
            EngineError::PredictionTimeout {
                model: "m".into(),
                deadline_ms: 100
            }
            .code(),
            "prediction_timeout"
        );
    }

    #[test]
    fn test_display_includes_model() {
        let e = EngineError::Inference {
            model: "ewma-btc".into(),
            reason: "missing feature 'line'".into(),
        };
        assert!(e.to_string().contains("ewma-btc"));
    }
}
