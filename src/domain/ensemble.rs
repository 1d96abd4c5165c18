//! Ensemble aggregation math.
//!
//! Pure functions that combine per-model predictions into one
//! probability/confidence pair. Two paths exist: weighted averaging
//! (order-independent) and meta-feature construction for a stacked
//! second-stage model (fixed, sorted-by-model-id ordering). The async
//! meta-learner call itself lives in the decision engine; this module
//! stays synchronous and fully testable in isolation.

use crate::domain::prediction::{Features, Prediction};
use crate::errors::{EngineError, Result};

/// A model's prediction tagged with its ensemble identity.
#[derive(Debug, Clone)]
pub struct ScoredPrediction {
    pub model_id: String,
    pub prediction: Prediction,
}

impl ScoredPrediction {
    pub fn new(model_id: impl Into<String>, prediction: Prediction) -> Self {
        Self {
            model_id: model_id.into(),
            prediction,
        }
    }
}

/// Combine predictions by weight: `Σ(x_i · w_i) / Σw_i` for both
/// probability and confidence.
///
/// A single surviving model is passed through unchanged, so the
/// ensemble output is bit-for-bit that model's own prediction.
///
/// # Errors
/// `Configuration` when the slice is empty or the weights sum to zero.
pub fn weighted_average(predictions: &[ScoredPrediction]) -> Result<(f64, f64)> {
    if predictions.is_empty() {
        return Err(EngineError::Configuration(
            "no usable model predictions to aggregate".to_string(),
        ));
    }

    // Single-model passthrough: avoids p*w/w rounding in the last ulp.
    if predictions.len() == 1 {
        let p = predictions[0].prediction;
        return Ok((p.probability, p.confidence));
    }

    let total_weight: f64 = predictions.iter().map(|s| s.prediction.weight).sum();
    if total_weight <= 0.0 {
        return Err(EngineError::Configuration(
            "ensemble weights sum to zero".to_string(),
        ));
    }

    let probability = predictions
        .iter()
        .map(|s| s.prediction.probability * s.prediction.weight)
        .sum::<f64>()
        / total_weight;
    let confidence = predictions
        .iter()
        .map(|s| s.prediction.confidence * s.prediction.weight)
        .sum::<f64>()
        / total_weight;

    Ok((probability, confidence))
}

/// Build the meta-learner input from first-stage outputs.
///
/// Feature names are `{model_id}_prob` / `{model_id}_conf`. The map is
/// keyed by model id, so the shape is stable regardless of the order
/// predictions arrived in.
pub fn meta_features(predictions: &[ScoredPrediction]) -> Features {
    let mut features = Features::new();
    for scored in predictions {
        features.insert(
            format!("{}_prob", scored.model_id),
            scored.prediction.probability,
        );
        features.insert(
            format!("{}_conf", scored.model_id),
            scored.prediction.confidence,
        );
    }
    features
}

/// Generate qualitative consensus factors from the model breakdown.
///
/// Flags individually confident models, strong directional signals,
/// high overall confidence, and directional agreement across models.
pub fn consensus_factors(predictions: &[ScoredPrediction]) -> Vec<String> {
    let mut factors = Vec::new();
    if predictions.is_empty() {
        return factors;
    }

    for scored in predictions {
        let p = scored.prediction;
        if p.confidence > 0.8 {
            factors.push(format!(
                "{} shows high confidence ({:.2})",
                scored.model_id, p.confidence
            ));
        }
        if (p.probability - 0.5).abs() > 0.3 {
            factors.push(format!(
                "{} predicts strong signal ({:.2})",
                scored.model_id, p.probability
            ));
        }
    }

    let avg_confidence = predictions
        .iter()
        .map(|s| s.prediction.confidence)
        .sum::<f64>()
        / predictions.len() as f64;
    if avg_confidence > 0.7 {
        factors.push("High overall model confidence".to_string());
    }

    let first_bullish = predictions[0].prediction.probability > 0.5;
    let agreement = predictions
        .iter()
        .filter(|s| (s.prediction.probability > 0.5) == first_bullish)
        .count() as f64
        / predictions.len() as f64;
    if agreement > 0.8 {
        factors.push("Strong model agreement".to_string());
    }

    factors
}
