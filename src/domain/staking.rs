//! Risk tiers and Kelly-derived stake sizing.
//!
//! Converts an ensemble probability/confidence pair plus market odds
//! into expected value, a discrete risk tier, a capped stake
//! recommendation, and the edge ranking scalar. Kelly output is hard
//! capped at the configured bankroll fraction regardless of what the
//! formula says, and risk multipliers only ever damp the stake, so
//! the cap is a true upper bound.
//!
//! Money amounts are rounded to cents through `rust_decimal` at the
//! boundary; the probability math stays in f64.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::prediction::RiskLevel;
use crate::errors::{EngineError, Result};

/// Default hard cap on the Kelly fraction: 10% of the stake base.
pub const DEFAULT_STAKE_CAP_FRACTION: f64 = 0.10;

/// Per-tier stake damping multipliers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskMultipliers {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskMultipliers {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 0.7,
            high: 0.4,
        }
    }
}

impl RiskMultipliers {
    pub fn for_level(&self, level: RiskLevel) -> f64 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }
}

/// Result of one risk/stake evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StakePlan {
    /// Odds-anchored expected value: p * odds - 1.
    pub expected_value: f64,
    /// Risk tier derived from confidence alone.
    pub risk_level: RiskLevel,
    /// Recommended stake, capped and rounded to cents.
    pub recommended_stake: f64,
    /// Ranking scalar: (p - 0.5) * EV * historical accuracy.
    pub edge: f64,
}

/// Pure risk and stake calculator.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    stake_cap_fraction: f64,
    multipliers: RiskMultipliers,
}

impl RiskCalculator {
    /// Create a calculator with the given Kelly cap and tier multipliers.
    pub fn new(stake_cap_fraction: f64, multipliers: RiskMultipliers) -> Self {
        Self {
            stake_cap_fraction,
            multipliers,
        }
    }

    /// Deterministic confidence → tier mapping, no hysteresis.
    pub fn risk_level(confidence: f64) -> RiskLevel {
        if confidence > 0.8 {
            RiskLevel::Low
        } else if confidence > 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Kelly fraction for a binary bet at decimal odds, clamped into
    /// `[0, stake_cap_fraction]`.
    ///
    /// f* = (p·(odds−1) − (1−p)) / (odds−1)
    pub fn kelly_fraction(&self, probability: f64, decimal_odds: f64) -> f64 {
        let b = decimal_odds - 1.0;
        let kelly = (probability * b - (1.0 - probability)) / b;
        kelly.clamp(0.0, self.stake_cap_fraction)
    }

    /// Evaluate one opportunity.
    ///
    /// # Errors
    /// `Validation` when `decimal_odds <= 1`, probability/confidence/
    /// accuracy fall outside [0, 1], or the stake base is not positive.
    pub fn evaluate(
        &self,
        probability: f64,
        confidence: f64,
        decimal_odds: f64,
        historical_accuracy: f64,
        stake_base: f64,
    ) -> Result<StakePlan> {
        if decimal_odds <= 1.0 {
            return Err(EngineError::Validation(format!(
                "decimal odds must be > 1, got {decimal_odds}"
            )));
        }
        for (name, value) in [
            ("probability", probability),
            ("confidence", confidence),
            ("historical accuracy", historical_accuracy),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Validation(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if stake_base <= 0.0 || !stake_base.is_finite() {
            return Err(EngineError::Validation(format!(
                "stake base must be positive, got {stake_base}"
            )));
        }

        let expected_value = probability * decimal_odds - 1.0;
        let risk_level = Self::risk_level(confidence);
        let kelly = self.kelly_fraction(probability, decimal_odds);
        let raw_stake = kelly * self.multipliers.for_level(risk_level) * stake_base;
        let edge = (probability - 0.5) * expected_value * historical_accuracy;

        Ok(StakePlan {
            expected_value,
            risk_level,
            recommended_stake: round_cents(raw_stake),
            edge,
        })
    }

    pub fn stake_cap_fraction(&self) -> f64 {
        self.stake_cap_fraction
    }
}

impl Default for RiskCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_STAKE_CAP_FRACTION, RiskMultipliers::default())
    }
}

/// Fallback EV when no market odds are available: maps p ∈ [0, 1]
/// onto [-1, 1]. The odds-anchored form in `evaluate` is canonical;
/// use this only for unpriced signals.
pub fn even_money_expected_value(probability: f64) -> f64 {
    probability * 2.0 - 1.0
}

/// Round a money amount to whole cents.
fn round_cents(amount: f64) -> f64 {
    Decimal::from_f64(amount)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskCalculator::risk_level(0.81), RiskLevel::Low);
        assert_eq!(RiskCalculator::risk_level(0.8), RiskLevel::Medium);
        assert_eq!(RiskCalculator::risk_level(0.51), RiskLevel::Medium);
        assert_eq!(RiskCalculator::risk_level(0.5), RiskLevel::High);
        assert_eq!(RiskCalculator::risk_level(0.0), RiskLevel::High);
    }

    #[test]
    fn test_kelly_positive_edge() {
        let calc = RiskCalculator::default();
        // p=0.6 at odds 2.0: f* = (0.6*1 - 0.4)/1 = 0.2, capped at 0.1
        assert!((calc.kelly_fraction(0.6, 2.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_negative_edge_floored_at_zero() {
        let calc = RiskCalculator::default();
        assert_eq!(calc.kelly_fraction(0.3, 2.0), 0.0);
    }

    #[test]
    fn test_kelly_small_edge_uncapped() {
        let calc = RiskCalculator::default();
        // p=0.52 at odds 2.0: f* = 0.04, under the cap
        assert!((calc.kelly_fraction(0.52, 2.0) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_composes_formulas() {
        let calc = RiskCalculator::default();
        let plan = calc.evaluate(0.6, 0.9, 2.0, 0.8, 1000.0).unwrap();
        assert!((plan.expected_value - 0.2).abs() < 1e-12);
        assert_eq!(plan.risk_level, RiskLevel::Low);
        // kelly capped at 0.1, low multiplier 1.0 → 100.00
        assert!((plan.recommended_stake - 100.0).abs() < 1e-9);
        assert!((plan.edge - 0.1 * 0.2 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_stake_cap_is_upper_bound() {
        let calc = RiskCalculator::default();
        let plan = calc.evaluate(0.99, 0.99, 5.0, 1.0, 500.0).unwrap();
        assert!(plan.recommended_stake <= 0.10 * 500.0 + 1e-9);
    }

    #[test]
    fn test_monotone_risk_damping() {
        let calc = RiskCalculator::default();
        let low = calc.evaluate(0.6, 0.9, 2.0, 0.8, 1000.0).unwrap();
        let medium = calc.evaluate(0.6, 0.7, 2.0, 0.8, 1000.0).unwrap();
        let high = calc.evaluate(0.6, 0.3, 2.0, 0.8, 1000.0).unwrap();
        assert!(low.recommended_stake >= medium.recommended_stake);
        assert!(medium.recommended_stake >= high.recommended_stake);
    }

    #[test]
    fn test_rejects_even_or_lower_odds() {
        let calc = RiskCalculator::default();
        assert!(matches!(
            calc.evaluate(0.6, 0.9, 1.0, 0.8, 100.0),
            Err(EngineError::Validation(_))
        ));
        assert!(calc.evaluate(0.6, 0.9, 0.5, 0.8, 100.0).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let calc = RiskCalculator::default();
        assert!(calc.evaluate(1.2, 0.9, 2.0, 0.8, 100.0).is_err());
        assert!(calc.evaluate(0.6, -0.1, 2.0, 0.8, 100.0).is_err());
    }

    #[test]
    fn test_even_money_fallback_range() {
        assert_eq!(even_money_expected_value(0.0), -1.0);
        assert_eq!(even_money_expected_value(0.5), 0.0);
        assert_eq!(even_money_expected_value(1.0), 1.0);
    }

    #[test]
    fn test_stake_rounded_to_cents() {
        let calc = RiskCalculator::default();
        let plan = calc.evaluate(0.52, 0.9, 2.0, 0.8, 333.33).unwrap();
        let cents = plan.recommended_stake * 100.0;
        assert!((cents - cents.round()).abs() < 1e-9);
    }
}
