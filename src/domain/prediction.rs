//! Core prediction and analysis domain types.
//!
//! Defines the business entities of the decision pipeline: model
//! configuration, per-model and ensemble predictions, priced
//! opportunities, hedge candidates, and the composed analysis.
//! These types are the foundation of the hexagonal architecture's
//! inner ring: immutable once constructed, serializable, and free of
//! infrastructure dependencies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Lightweight market identifier used at the ports boundary.
pub type MarketId = String;

/// Numeric feature vector keyed by feature name.
///
/// `BTreeMap` keeps iteration order stable, which the meta-learner
/// path relies on for a fixed feature shape.
pub type Features = BTreeMap<String, f64>;

// ────────────────────────────────────────────
// Model configuration
// ────────────────────────────────────────────

/// Closed set of forecasting model variants.
///
/// Resolved to a concrete implementation at configuration time via
/// `domain::models::build`, so an unknown variant is a parse error in
/// the config loader rather than a runtime string-dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// EWMA forecaster over the target series.
    TimeSeries,
    /// Logistic regression fit by SGD.
    Logistic,
    /// Per-feature threshold grid search.
    ThresholdSearch,
    /// Streak/momentum detector over recent outcomes.
    Momentum,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeSeries => write!(f, "time-series"),
            Self::Logistic => write!(f, "logistic"),
            Self::ThresholdSearch => write!(f, "threshold-search"),
            Self::Momentum => write!(f, "momentum"),
        }
    }
}

/// Immutable configuration for one ensemble member.
///
/// Created when the ensemble is configured and never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Unique model identifier within the ensemble.
    pub id: String,
    /// Which variant to instantiate.
    pub kind: ModelKind,
    /// Non-negative aggregation weight.
    pub weight: f64,
    /// Variant-specific hyperparameters.
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, f64>,
    /// Input feature names this model requires.
    #[serde(default)]
    pub features: Vec<String>,
    /// Target field name in training rows.
    pub target: String,
}

impl ModelSpec {
    /// Read a hyperparameter with a fallback default.
    pub fn hyper(&self, name: &str, default: f64) -> f64 {
        self.hyperparameters.get(name).copied().unwrap_or(default)
    }
}

// ────────────────────────────────────────────
// Prediction outputs
// ────────────────────────────────────────────

/// Output of one model for one feature vector. Transient and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of the positive outcome, in [0, 1].
    pub probability: f64,
    /// Model self-assessed confidence, in [0, 1].
    pub confidence: f64,
    /// Aggregation weight copied from the spec at evaluation time.
    pub weight: f64,
}

impl Prediction {
    /// Build a prediction, clamping probability and confidence into [0, 1].
    ///
    /// Clamping at the constructor keeps the range invariant local: no
    /// downstream consumer ever re-checks it.
    pub fn new(probability: f64, confidence: f64, weight: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            weight,
        }
    }
}

/// Per-model line item in the ensemble breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBreakdown {
    pub model_id: String,
    pub probability: f64,
    pub confidence: f64,
    pub weight: f64,
}

/// Discrete risk tier derived deterministically from confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Aggregate result of one decision request.
///
/// Created once per request, immutable, consumed by the caller and
/// then discarded — the engine persists nothing from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsemblePrediction {
    /// Combined probability in [0, 1].
    pub probability: f64,
    /// Combined confidence in [0, 1].
    pub confidence: f64,
    /// Per-model breakdown in configuration order.
    pub breakdown: Vec<ModelBreakdown>,
    /// Human-readable qualitative signals, including exclusion and
    /// degradation notices.
    pub factors: Vec<String>,
    /// Rolling calibration accuracy of the contributing models.
    pub historical_accuracy: f64,
    /// Odds-anchored expected value: p * odds - 1.
    pub expected_value: f64,
    /// Risk tier derived from confidence.
    pub risk_level: RiskLevel,
    /// Capped, risk-damped stake recommendation.
    pub recommended_stake: f64,
    /// Ranking scalar: (p - 0.5) * EV * historical accuracy.
    pub edge: f64,
}

// ────────────────────────────────────────────
// Request and response surface
// ────────────────────────────────────────────

/// A priced market event under evaluation, supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Market identifier.
    pub market: MarketId,
    /// Quoted decimal odds (payout multiplier including stake).
    pub decimal_odds: f64,
    /// Proposed stake, used as the sizing base.
    pub stake: f64,
    /// When the quote was observed, if known.
    pub observed_at: Option<DateTime<Utc>>,
}

impl Opportunity {
    /// Convenience constructor for an unstamped quote.
    pub fn new(market: impl Into<MarketId>, decimal_odds: f64, stake: f64) -> Self {
        Self {
            market: market.into(),
            decimal_odds,
            stake,
            observed_at: None,
        }
    }
}

/// A related market with a computed counter-stake. Transient per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeCandidate {
    /// Related market identifier.
    pub market: MarketId,
    /// Quoted decimal odds on the related market.
    pub odds: f64,
    /// Recommended counter-stake.
    pub recommended_stake: f64,
    /// Locked-in profit when the pair is a true arbitrage.
    pub guaranteed_profit: Option<f64>,
}

/// The composed analysis returned by the decision facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingAnalysis {
    /// Unique analysis ID for audit logging.
    pub id: Uuid,
    /// The opportunity that was evaluated.
    pub opportunity: Opportunity,
    /// Combined ensemble result with risk and sizing.
    pub ensemble: EnsemblePrediction,
    /// Hedge and arbitrage candidates (may be empty).
    pub hedges: Vec<HedgeCandidate>,
    /// When the analysis completed.
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_clamps_ranges() {
        let p = Prediction::new(1.3, -0.2, 0.5);
        assert_eq!(p.probability, 1.0);
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.weight, 0.5);
    }

    #[test]
    fn test_model_kind_display_roundtrip() {
        for kind in [
            ModelKind::TimeSeries,
            ModelKind::Logistic,
            ModelKind::ThresholdSearch,
            ModelKind::Momentum,
        ] {
            let text = format!("\"{kind}\"");
            let parsed: ModelKind = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected_at_parse() {
        let parsed: Result<ModelKind, _> = serde_json::from_str("\"random-forest\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_hyper_fallback() {
        let spec = ModelSpec {
            id: "m".into(),
            kind: ModelKind::Logistic,
            weight: 1.0,
            hyperparameters: BTreeMap::from([("epochs".to_string(), 50.0)]),
            features: vec![],
            target: "outcome".into(),
        };
        assert_eq!(spec.hyper("epochs", 10.0), 50.0);
        assert_eq!(spec.hyper("learning_rate", 0.05), 0.05);
    }

    #[test]
    fn test_risk_level_display() {
        assert_eq!(RiskLevel::Low.to_string(), "low");
        assert_eq!(RiskLevel::High.to_string(), "high");
    }
}
