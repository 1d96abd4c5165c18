//! Streak/momentum pattern detector.
//!
//! Watches the recent outcome history and leans in the direction of
//! the current streak: a run of hits nudges the probability above
//! even odds, a run of misses pushes it below. Deliberately myopic —
//! its value in the ensemble is reacting to regime shifts faster than
//! the slower statistical members.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::domain::features::validate_required;
use crate::domain::prediction::{Features, ModelSpec, Prediction};
use crate::errors::Result;

use super::{ForecastModel, require_rows, target_value};

/// Momentum detector over recent realized outcomes.
#[derive(Debug, Clone)]
pub struct MomentumModel {
    spec: ModelSpec,
    history: VecDeque<bool>,
    memory: usize,
    /// Probability shift per streak step.
    streak_weight: f64,
    /// Streak length at which the shift stops growing.
    max_streak: usize,
}

impl MomentumModel {
    pub fn new(spec: ModelSpec) -> Self {
        let memory = (spec.hyper("memory", 50.0) as usize).max(4);
        let streak_weight = spec.hyper("streak_weight", 0.05).clamp(0.0, 0.1);
        let max_streak = (spec.hyper("max_streak", 5.0) as usize).max(1);
        Self {
            spec,
            history: VecDeque::new(),
            memory,
            streak_weight,
            max_streak,
        }
    }

    fn absorb(&mut self, rows: &[Features]) -> Result<()> {
        for row in rows {
            let target = target_value(row, &self.spec.target, &self.spec.id)?;
            if self.history.len() == self.memory {
                self.history.pop_front();
            }
            self.history.push_back(target > 0.5);
        }
        Ok(())
    }

    /// Length of the run of identical outcomes at the end of history,
    /// signed by direction (+ hits, − misses).
    fn streak(&self) -> i64 {
        let Some(&latest) = self.history.back() else {
            return 0;
        };
        let run = self
            .history
            .iter()
            .rev()
            .take_while(|&&o| o == latest)
            .count()
            .min(self.max_streak) as i64;
        if latest { run } else { -run }
    }
}

#[async_trait]
impl ForecastModel for MomentumModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn train(&mut self, dataset: &[Features]) -> Result<()> {
        require_rows(dataset, &self.spec.id)?;
        self.history.clear();
        self.absorb(dataset)
    }

    async fn predict(&self, features: &Features) -> Result<Prediction> {
        validate_required(features, &self.spec.features, &self.spec.id)?;
        let streak = self.streak();
        let probability = 0.5 + streak as f64 * self.streak_weight;
        let sample = self.history.len() as f64;
        // Confidence needs both a streak and a sample behind it.
        let confidence = (streak.unsigned_abs() as f64 / self.max_streak as f64)
            * (sample / (sample + 10.0));
        Ok(Prediction::new(probability, confidence, self.spec.weight))
    }

    async fn update(&mut self, rows: &[Features]) -> Result<()> {
        require_rows(rows, &self.spec.id)?;
        self.absorb(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::testutil::{features, row, spec};
    use crate::domain::prediction::ModelKind;

    #[tokio::test]
    async fn test_hot_streak_leans_bullish() {
        let mut model = MomentumModel::new(spec(ModelKind::Momentum));
        let rows: Vec<_> = (0..20).map(|_| row(0.0, 1.0)).collect();
        model.train(&rows).await.unwrap();
        let pred = model.predict(&features(0.0)).await.unwrap();
        // Capped at max_streak 5 * 0.05 above even odds.
        assert!((pred.probability - 0.75).abs() < 1e-9);
        assert!(pred.confidence > 0.5);
    }

    #[tokio::test]
    async fn test_cold_streak_leans_bearish() {
        let mut model = MomentumModel::new(spec(ModelKind::Momentum));
        let rows: Vec<_> = (0..20).map(|_| row(0.0, 0.0)).collect();
        model.train(&rows).await.unwrap();
        let pred = model.predict(&features(0.0)).await.unwrap();
        assert!((pred.probability - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_broken_streak_resets_lean() {
        let mut model = MomentumModel::new(spec(ModelKind::Momentum));
        let mut rows: Vec<_> = (0..10).map(|_| row(0.0, 1.0)).collect();
        rows.push(row(0.0, 0.0));
        model.train(&rows).await.unwrap();
        let pred = model.predict(&features(0.0)).await.unwrap();
        assert!((pred.probability - 0.45).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let mut base = spec(ModelKind::Momentum);
        base.hyperparameters.insert("memory".to_string(), 8.0);
        let mut model = MomentumModel::new(base);
        let rows: Vec<_> = (0..100).map(|_| row(0.0, 1.0)).collect();
        model.train(&rows).await.unwrap();
        assert_eq!(model.history.len(), 8);
    }
}
