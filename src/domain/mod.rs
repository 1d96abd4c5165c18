//! Domain layer - Core decision logic and models.
//!
//! Pure business logic for the betting decision pipeline: prediction
//! types, ensemble aggregation, accuracy bookkeeping, Kelly staking,
//! arbitrage math, feature extraction, and the forecasting model
//! variants. No I/O here (hexagonal architecture inner ring); every
//! module is testable in isolation.

pub mod accuracy;
pub mod arbitrage;
pub mod ensemble;
pub mod features;
pub mod models;
pub mod prediction;
pub mod staking;

// Re-export core types for convenience
pub use accuracy::AccuracyTracker;
pub use models::ForecastModel;
pub use prediction::{
    BettingAnalysis, EnsemblePrediction, Features, HedgeCandidate, MarketId, ModelBreakdown,
    ModelKind, ModelSpec, Opportunity, Prediction, RiskLevel,
};
pub use staking::{RiskCalculator, RiskMultipliers, StakePlan};
