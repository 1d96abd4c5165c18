//! Logistic regression fit by stochastic gradient descent.
//!
//! Features are z-scored against statistics captured at train time so
//! unscaled inputs (season averages, line values) don't saturate the
//! sigmoid. `update` takes a few extra SGD passes against the frozen
//! normalization, which keeps incremental adjustment cheap.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::features::validate_required;
use crate::domain::prediction::{Features, ModelSpec, Prediction};
use crate::errors::Result;

use super::{ForecastModel, require_rows, target_value};

#[derive(Debug, Clone, Copy, Default)]
struct FeatureStats {
    mean: f64,
    std: f64,
}

/// Logistic regression over the configured feature set.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    spec: ModelSpec,
    weights: BTreeMap<String, f64>,
    bias: f64,
    stats: BTreeMap<String, FeatureStats>,
    learning_rate: f64,
    epochs: usize,
    update_epochs: usize,
    trained_rows: usize,
}

impl LogisticModel {
    pub fn new(spec: ModelSpec) -> Self {
        let learning_rate = spec.hyper("learning_rate", 0.1);
        let epochs = spec.hyper("epochs", 100.0) as usize;
        let update_epochs = spec.hyper("update_epochs", 5.0) as usize;
        Self {
            spec,
            weights: BTreeMap::new(),
            bias: 0.0,
            stats: BTreeMap::new(),
            learning_rate,
            epochs,
            update_epochs,
            trained_rows: 0,
        }
    }

    fn normalized(&self, name: &str, raw: f64) -> f64 {
        match self.stats.get(name) {
            Some(s) if s.std > 1e-9 => (raw - s.mean) / s.std,
            _ => raw,
        }
    }

    fn logit(&self, features: &Features) -> f64 {
        let mut z = self.bias;
        for name in &self.spec.features {
            let x = self.normalized(name, features.get(name).copied().unwrap_or(0.0));
            z += self.weights.get(name).copied().unwrap_or(0.0) * x;
        }
        z
    }

    fn fit_stats(&mut self, dataset: &[Features]) {
        self.stats.clear();
        for name in &self.spec.features {
            let values: Vec<f64> = dataset
                .iter()
                .filter_map(|row| row.get(name).copied())
                .collect();
            if values.is_empty() {
                continue;
            }
            // Statistics over the rows that carry the feature, not the
            // whole dataset.
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            self.stats
                .insert(name.clone(), FeatureStats { mean, std: var.sqrt() });
        }
    }

    fn sgd_pass(&mut self, dataset: &[Features]) -> Result<()> {
        let names = self.spec.features.clone();
        for row in dataset {
            let target = target_value(row, &self.spec.target, &self.spec.id)?;
            let predicted = sigmoid(self.logit(row));
            let error = predicted - target;
            for name in &names {
                let x = self.normalized(name, row.get(name).copied().unwrap_or(0.0));
                let w = self.weights.entry(name.clone()).or_insert(0.0);
                *w -= self.learning_rate * error * x;
            }
            self.bias -= self.learning_rate * error;
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[async_trait]
impl ForecastModel for LogisticModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn train(&mut self, dataset: &[Features]) -> Result<()> {
        require_rows(dataset, &self.spec.id)?;
        self.weights.clear();
        self.bias = 0.0;
        self.fit_stats(dataset);
        for _ in 0..self.epochs {
            self.sgd_pass(dataset)?;
        }
        self.trained_rows = dataset.len();
        Ok(())
    }

    async fn predict(&self, features: &Features) -> Result<Prediction> {
        validate_required(features, &self.spec.features, &self.spec.id)?;
        let probability = sigmoid(self.logit(features));
        // Distance from even odds, floored so a fresh model still
        // contributes a nonzero vote to the weighted average.
        let confidence = (2.0 * (probability - 0.5).abs()).clamp(0.05, 1.0);
        Ok(Prediction::new(probability, confidence, self.spec.weight))
    }

    async fn update(&mut self, rows: &[Features]) -> Result<()> {
        require_rows(rows, &self.spec.id)?;
        for _ in 0..self.update_epochs {
            self.sgd_pass(rows)?;
        }
        self.trained_rows += rows.len();
        Ok(())
    }
}
