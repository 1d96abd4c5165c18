//! Threshold grid search over individual features.
//!
//! A search-based forecaster: for each configured feature it scans
//! every observed value as a candidate cut point, in both directions,
//! and keeps the rule with the best training accuracy. Prediction is
//! an accuracy-weighted vote across the learned rules.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::features::validate_required;
use crate::domain::prediction::{Features, ModelSpec, Prediction};
use crate::errors::Result;

use super::{ForecastModel, require_rows, target_value};

/// One learned decision rule: fire when the feature clears the cut.
#[derive(Debug, Clone, Copy)]
struct Rule {
    threshold: f64,
    /// True: fire when value >= threshold. False: fire when below.
    above: bool,
    /// Accuracy of this rule on the training buffer.
    accuracy: f64,
}

impl Rule {
    fn fires(&self, value: f64) -> bool {
        if self.above {
            value >= self.threshold
        } else {
            value < self.threshold
        }
    }
}

/// Per-feature threshold search model.
#[derive(Debug, Clone)]
pub struct ThresholdSearchModel {
    spec: ModelSpec,
    rules: BTreeMap<String, Rule>,
    /// Bounded training buffer so `update` can re-run the search.
    buffer: Vec<Features>,
    memory: usize,
}

impl ThresholdSearchModel {
    pub fn new(spec: ModelSpec) -> Self {
        let memory = spec.hyper("memory", 256.0) as usize;
        Self {
            spec,
            rules: BTreeMap::new(),
            buffer: Vec::new(),
            memory: memory.max(8),
        }
    }

    fn search(&mut self) -> Result<()> {
        self.rules.clear();
        let outcomes: Vec<f64> = self
            .buffer
            .iter()
            .map(|row| target_value(row, &self.spec.target, &self.spec.id))
            .collect::<Result<_>>()?;

        for name in &self.spec.features {
            let values: Vec<Option<f64>> = self
                .buffer
                .iter()
                .map(|row| row.get(name).copied())
                .collect();

            let mut best: Option<Rule> = None;
            for candidate in values.iter().flatten() {
                for above in [true, false] {
                    let probe = Rule {
                        threshold: *candidate,
                        above,
                        accuracy: 0.0,
                    };
                    let mut hits = 0usize;
                    let mut total = 0usize;
                    for (value, outcome) in values.iter().zip(&outcomes) {
                        let Some(v) = value else { continue };
                        if probe.fires(*v) == (*outcome > 0.5) {
                            hits += 1;
                        }
                        total += 1;
                    }
                    if total == 0 {
                        continue;
                    }
                    let accuracy = hits as f64 / total as f64;
                    if best.is_none_or(|b| accuracy > b.accuracy) {
                        best = Some(Rule {
                            accuracy,
                            ..probe
                        });
                    }
                }
            }
            if let Some(rule) = best {
                self.rules.insert(name.clone(), rule);
            }
        }
        Ok(())
    }

    fn absorb(&mut self, rows: &[Features]) {
        self.buffer.extend_from_slice(rows);
        if self.buffer.len() > self.memory {
            let excess = self.buffer.len() - self.memory;
            self.buffer.drain(..excess);
        }
    }
}

#[async_trait]
impl ForecastModel for ThresholdSearchModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn train(&mut self, dataset: &[Features]) -> Result<()> {
        require_rows(dataset, &self.spec.id)?;
        self.buffer.clear();
        self.absorb(dataset);
        self.search()
    }

    async fn predict(&self, features: &Features) -> Result<Prediction> {
        validate_required(features, &self.spec.features, &self.spec.id)?;
        if self.rules.is_empty() {
            return Ok(Prediction::new(0.5, 0.0, self.spec.weight));
        }

        let mut vote = 0.0;
        let mut weight_sum = 0.0;
        for (name, rule) in &self.rules {
            let Some(value) = features.get(name) else {
                continue;
            };
            vote += f64::from(u8::from(rule.fires(*value))) * rule.accuracy;
            weight_sum += rule.accuracy;
        }
        if weight_sum <= 0.0 {
            return Ok(Prediction::new(0.5, 0.0, self.spec.weight));
        }

        let probability = vote / weight_sum;
        let confidence =
            self.rules.values().map(|r| r.accuracy).sum::<f64>() / self.rules.len() as f64;
        Ok(Prediction::new(probability, confidence, self.spec.weight))
    }

    async fn update(&mut self, rows: &[Features]) -> Result<()> {
        require_rows(rows, &self.spec.id)?;
        self.absorb(rows);
        self.search()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::testutil::{features, row, spec};
    use crate::domain::prediction::ModelKind;

    fn stepped_dataset() -> Vec<Features> {
        // outcome flips at signal = 50
        (0..50)
            .map(|i| {
                let signal = f64::from(i) * 2.0;
                row(signal, f64::from(u8::from(signal >= 50.0)))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_finds_separating_threshold() {
        let mut model = ThresholdSearchModel::new(spec(ModelKind::ThresholdSearch));
        model.train(&stepped_dataset()).await.unwrap();
        let high = model.predict(&features(90.0)).await.unwrap();
        let low = model.predict(&features(10.0)).await.unwrap();
        assert!(high.probability > 0.9);
        assert!(low.probability < 0.1);
        // The rule is perfectly separating, so confidence is 1.0.
        assert!((high.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_buffer_is_bounded() {
        let mut base = spec(ModelKind::ThresholdSearch);
        base.hyperparameters.insert("memory".to_string(), 16.0);
        let mut model = ThresholdSearchModel::new(base);
        model.train(&stepped_dataset()).await.unwrap();
        assert!(model.buffer.len() <= 16);
    }

    #[tokio::test]
    async fn test_update_rebuilds_rules() {
        let mut model = ThresholdSearchModel::new(spec(ModelKind::ThresholdSearch));
        model.train(&stepped_dataset()).await.unwrap();
        // New regime: everything below 50 wins now. A large enough
        // batch displaces the old buffer contents.
        let flipped: Vec<_> = (0..300)
            .map(|i| {
                let signal = f64::from(i % 50) * 2.0;
                row(signal, f64::from(u8::from(signal < 50.0)))
            })
            .collect();
        model.update(&flipped).await.unwrap();
        let low = model.predict(&features(10.0)).await.unwrap();
        assert!(low.probability > 0.9);
    }
}
