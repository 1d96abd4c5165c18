//! Forecasting model contract and closed variant registry.
//!
//! Every ensemble member implements the same three-operation
//! capability: `train`, `predict`, `update`. The aggregator is
//! variant-agnostic — nothing outside this module knows which math a
//! model runs. Variants are resolved from `ModelKind` by an
//! exhaustive match at configuration time, so adding a variant is a
//! compile error until every dispatch site handles it.

pub mod logistic;
pub mod momentum;
pub mod threshold;
pub mod time_series;

use async_trait::async_trait;

use crate::domain::prediction::{Features, ModelKind, ModelSpec, Prediction};
use crate::errors::{EngineError, Result};

pub use logistic::LogisticModel;
pub use momentum::MomentumModel;
pub use threshold::ThresholdSearchModel;
pub use time_series::EwmaForecaster;

/// Capability contract for one forecasting model.
///
/// `predict` must never mutate trained parameters, which the `&self`
/// receiver enforces; the engine wraps models in an async `RwLock` so
/// `update`/`train` get the single-writer side and concurrent
/// `predict` calls observe a consistent snapshot.
#[async_trait]
pub trait ForecastModel: Send + Sync {
    /// The immutable configuration this model was built from.
    fn spec(&self) -> &ModelSpec;

    /// Fit parameters from historical feature/target rows.
    ///
    /// Idempotent for identical data. Fails with `Training` on an
    /// empty dataset or rows missing the target field.
    async fn train(&mut self, dataset: &[Features]) -> Result<()>;

    /// Produce a prediction for one feature vector.
    ///
    /// Fails with `Inference` when required features are missing.
    async fn predict(&self, features: &Features) -> Result<Prediction>;

    /// Incrementally adjust parameters from freshly observed rows.
    async fn update(&mut self, rows: &[Features]) -> Result<()>;
}

/// Instantiate the implementation for a spec.
///
/// Infallible by construction: `ModelKind` is closed, so the config
/// loader has already rejected anything this match cannot handle.
pub fn build(spec: &ModelSpec) -> Box<dyn ForecastModel> {
    match spec.kind {
        ModelKind::TimeSeries => Box::new(EwmaForecaster::new(spec.clone())),
        ModelKind::Logistic => Box::new(LogisticModel::new(spec.clone())),
        ModelKind::ThresholdSearch => Box::new(ThresholdSearchModel::new(spec.clone())),
        ModelKind::Momentum => Box::new(MomentumModel::new(spec.clone())),
    }
}

/// Pull the target value out of a training row.
pub(crate) fn target_value(row: &Features, target: &str, model_id: &str) -> Result<f64> {
    row.get(target)
        .copied()
        .ok_or_else(|| EngineError::Training {
            model: model_id.to_string(),
            reason: format!("row missing target field '{target}'"),
        })
}

/// Reject an empty training set with a `Training` error.
pub(crate) fn require_rows(dataset: &[Features], model_id: &str) -> Result<()> {
    if dataset.is_empty() {
        return Err(EngineError::Training {
            model: model_id.to_string(),
            reason: "empty dataset".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::BTreeMap;

    use crate::domain::prediction::{Features, ModelKind, ModelSpec};

    /// A spec over a single `signal` feature predicting `outcome`.
    pub fn spec(kind: ModelKind) -> ModelSpec {
        ModelSpec {
            id: format!("{kind}-test"),
            kind,
            weight: 1.0,
            hyperparameters: BTreeMap::new(),
            features: vec!["signal".to_string()],
            target: "outcome".to_string(),
        }
    }

    /// One row of `{ signal, outcome }`.
    pub fn row(signal: f64, outcome: f64) -> Features {
        Features::from([
            ("signal".to_string(), signal),
            ("outcome".to_string(), outcome),
        ])
    }

    /// Features-only row (no target), as seen at predict time.
    pub fn features(signal: f64) -> Features {
        Features::from([("signal".to_string(), signal)])
    }
}
