//! EWMA time-series forecaster.
//!
//! Tracks the target series with an exponentially weighted moving
//! average and forecasts the next outcome as the smoothed level.
//! Confidence grows with the number of observed rows: a long history
//! behind the smoothed level is worth more than two ticks.

use async_trait::async_trait;

use crate::domain::features::validate_required;
use crate::domain::prediction::{Features, ModelSpec, Prediction};
use crate::errors::Result;

use super::{ForecastModel, require_rows, target_value};

/// EWMA forecaster over the target series.
#[derive(Debug, Clone)]
pub struct EwmaForecaster {
    spec: ModelSpec,
    /// Smoothing factor in (0, 1]; higher reacts faster.
    alpha: f64,
    /// Current smoothed target level.
    smoothed: Option<f64>,
    /// Rows observed so far (train + update).
    observations: usize,
}

impl EwmaForecaster {
    pub fn new(spec: ModelSpec) -> Self {
        let alpha = spec.hyper("alpha", 0.3).clamp(0.01, 1.0);
        Self {
            spec,
            alpha,
            smoothed: None,
            observations: 0,
        }
    }

    fn absorb(&mut self, rows: &[Features]) -> Result<()> {
        for row in rows {
            let target = target_value(row, &self.spec.target, &self.spec.id)?;
            self.smoothed = Some(match self.smoothed {
                Some(prev) => prev * (1.0 - self.alpha) + target * self.alpha,
                None => target,
            });
            self.observations += 1;
        }
        Ok(())
    }

    /// Saturating confidence: n / (n + 10).
    fn confidence(&self) -> f64 {
        let n = self.observations as f64;
        n / (n + 10.0)
    }
}

#[async_trait]
impl ForecastModel for EwmaForecaster {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn train(&mut self, dataset: &[Features]) -> Result<()> {
        require_rows(dataset, &self.spec.id)?;
        // Retrain from scratch so identical data gives identical state.
        self.smoothed = None;
        self.observations = 0;
        self.absorb(dataset)
    }

    async fn predict(&self, features: &Features) -> Result<Prediction> {
        validate_required(features, &self.spec.features, &self.spec.id)?;
        let probability = self.smoothed.unwrap_or(0.5);
        Ok(Prediction::new(
            probability,
            self.confidence(),
            self.spec.weight,
        ))
    }

    async fn update(&mut self, rows: &[Features]) -> Result<()> {
        require_rows(rows, &self.spec.id)?;
        self.absorb(rows)
    }
}
