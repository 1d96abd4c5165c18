//! Historical accuracy bookkeeping.
//!
//! Bounded per-model log of (predicted probability, realized outcome)
//! pairs, feeding the rolling calibration scalar that damps the edge
//! computation. Insertion order is preserved so windowed queries see
//! the most recent records; overflow evicts oldest-first.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded prediction/outcome pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccuracyRecord {
    /// Probability the model emitted before the event.
    pub predicted: f64,
    /// Realized outcome (1.0 hit, 0.0 miss; fractional allowed).
    pub outcome: f64,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A prediction is correct when it lands on the same side of even
/// odds as the realized outcome.
fn is_hit(predicted: f64, outcome: f64) -> bool {
    (predicted > 0.5) == (outcome > 0.5)
}

/// Bounded per-model accuracy tracker.
///
/// Exclusive owner of all `AccuracyRecord`s. Callers append through
/// `record` and read through `accuracy_of`/`ensemble_accuracy`; the
/// engine serializes writers per the single-writer discipline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyTracker {
    records: HashMap<String, VecDeque<AccuracyRecord>>,
    capacity: usize,
}

impl AccuracyTracker {
    /// Create a tracker retaining at most `capacity` records per model.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a prediction/outcome pair, evicting the oldest record
    /// for that model when the buffer is full.
    pub fn record(&mut self, model_id: &str, predicted: f64, outcome: f64) {
        let buffer = self.records.entry(model_id.to_string()).or_default();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(AccuracyRecord {
            predicted,
            outcome,
            recorded_at: Utc::now(),
        });
    }

    /// Rolling accuracy for one model over the most recent `window`
    /// records (all records when `None`).
    ///
    /// Returns exactly `0.0` when no records exist — never NaN.
    pub fn accuracy_of(&self, model_id: &str, window: Option<usize>) -> f64 {
        let Some(buffer) = self.records.get(model_id) else {
            return 0.0;
        };
        Self::accuracy_over(buffer, window)
    }

    /// Pooled accuracy across several models, used as the
    /// ensemble-level calibration scalar.
    pub fn ensemble_accuracy<I, S>(&self, model_ids: I, window: Option<usize>) -> f64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hits = 0usize;
        let mut total = 0usize;
        for id in model_ids {
            if let Some(buffer) = self.records.get(id.as_ref()) {
                let take = window.unwrap_or(buffer.len()).min(buffer.len());
                for rec in buffer.iter().rev().take(take) {
                    if is_hit(rec.predicted, rec.outcome) {
                        hits += 1;
                    }
                    total += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Number of retained records for a model.
    pub fn len(&self, model_id: &str) -> usize {
        self.records.get(model_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.records.values().all(VecDeque::is_empty)
    }

    /// Drop all records for one model.
    pub fn reset(&mut self, model_id: &str) {
        self.records.remove(model_id);
    }

    fn accuracy_over(buffer: &VecDeque<AccuracyRecord>, window: Option<usize>) -> f64 {
        let take = window.unwrap_or(buffer.len()).min(buffer.len());
        if take == 0 {
            return 0.0;
        }
        let hits = buffer
            .iter()
            .rev()
            .take(take)
            .filter(|r| is_hit(r.predicted, r.outcome))
            .count();
        hits as f64 / take as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker_returns_zero() {
        let tracker = AccuracyTracker::new(10);
        assert_eq!(tracker.accuracy_of("missing", None), 0.0);
        assert_eq!(tracker.ensemble_accuracy(["a", "b"], None), 0.0);
    }

    #[test]
    fn test_hit_predicate_sides() {
        let mut tracker = AccuracyTracker::new(10);
        tracker.record("m", 0.7, 1.0); // hit
        tracker.record("m", 0.3, 0.0); // hit
        tracker.record("m", 0.7, 0.0); // miss
        tracker.record("m", 0.3, 1.0); // miss
        assert!((tracker.accuracy_of("m", None) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bounded_eviction_oldest_first() {
        let mut tracker = AccuracyTracker::new(3);
        tracker.record("m", 0.9, 0.0); // miss, will be evicted
        tracker.record("m", 0.9, 1.0);
        tracker.record("m", 0.9, 1.0);
        tracker.record("m", 0.9, 1.0);
        assert_eq!(tracker.len("m"), 3);
        assert_eq!(tracker.accuracy_of("m", None), 1.0);
    }

    #[test]
    fn test_window_reads_most_recent() {
        let mut tracker = AccuracyTracker::new(10);
        tracker.record("m", 0.9, 0.0); // old miss
        tracker.record("m", 0.9, 1.0);
        tracker.record("m", 0.9, 1.0);
        assert_eq!(tracker.accuracy_of("m", Some(2)), 1.0);
        assert!((tracker.accuracy_of("m", None) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ensemble_accuracy_pools_models() {
        let mut tracker = AccuracyTracker::new(10);
        tracker.record("a", 0.8, 1.0); // hit
        tracker.record("b", 0.8, 0.0); // miss
        assert!((tracker.ensemble_accuracy(["a", "b"], None) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_one_model() {
        let mut tracker = AccuracyTracker::new(10);
        tracker.record("a", 0.8, 1.0);
        tracker.record("b", 0.8, 1.0);
        tracker.reset("a");
        assert_eq!(tracker.accuracy_of("a", None), 0.0);
        assert_eq!(tracker.accuracy_of("b", None), 1.0);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut tracker = AccuracyTracker::new(5);
        tracker.record("a", 0.8, 1.0);
        let json = serde_json::to_string(&tracker).unwrap();
        let restored: AccuracyTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.accuracy_of("a", None), 1.0);
        assert_eq!(restored.len("a"), 1);
    }
}
