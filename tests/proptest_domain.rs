//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that domain components maintain
//! mathematical invariants across random inputs.

use proptest::prelude::*;

use prop_edge_bot::domain::arbitrage::{implied_probability, two_way_split};
use prop_edge_bot::domain::ensemble::{weighted_average, ScoredPrediction};
use prop_edge_bot::domain::prediction::Prediction;
use prop_edge_bot::domain::staking::{RiskCalculator, RiskMultipliers};

fn calculator() -> RiskCalculator {
    RiskCalculator::new(0.10, RiskMultipliers::default())
}

// ── Ensemble Aggregation Properties ─────────────────────────

proptest! {
    /// A weighted average of probabilities stays inside [0, 1].
    #[test]
    fn weighted_average_stays_in_unit_interval(
        inputs in prop::collection::vec((0.0f64..=1.0, 0.0f64..=1.0, 0.01f64..10.0), 1..8),
    ) {
        let scored: Vec<ScoredPrediction> = inputs
            .iter()
            .enumerate()
            .map(|(i, (p, c, w))| {
                ScoredPrediction::new(format!("m{i}"), Prediction::new(*p, *c, *w))
            })
            .collect();
        let (probability, confidence) = weighted_average(&scored).unwrap();
        prop_assert!((0.0..=1.0).contains(&probability), "p={probability}");
        prop_assert!((0.0..=1.0).contains(&confidence), "c={confidence}");
    }

    /// The ensemble probability never leaves the convex hull of its
    /// member probabilities.
    #[test]
    fn weighted_average_within_member_bounds(
        inputs in prop::collection::vec((0.0f64..=1.0, 0.01f64..10.0), 2..6),
    ) {
        let scored: Vec<ScoredPrediction> = inputs
            .iter()
            .enumerate()
            .map(|(i, (p, w))| {
                ScoredPrediction::new(format!("m{i}"), Prediction::new(*p, 0.5, *w))
            })
            .collect();
        let lo = inputs.iter().map(|(p, _)| *p).fold(f64::INFINITY, f64::min);
        let hi = inputs.iter().map(|(p, _)| *p).fold(f64::NEG_INFINITY, f64::max);
        let (probability, _) = weighted_average(&scored).unwrap();
        prop_assert!(probability >= lo - 1e-12 && probability <= hi + 1e-12);
    }
}

// ── Staking Properties ──────────────────────────────────────

proptest! {
    /// Kelly fraction is always within [0, cap].
    #[test]
    fn kelly_fraction_respects_cap(
        p in 0.0f64..=1.0,
        odds in 1.01f64..20.0,
    ) {
        let kelly = calculator().kelly_fraction(p, odds);
        prop_assert!(kelly >= 0.0, "kelly={kelly}");
        prop_assert!(kelly <= 0.10 + 1e-12, "kelly={kelly}");
    }

    /// The recommended stake never exceeds cap × base (the low-tier
    /// multiplier is 1.0, every other tier damps further).
    #[test]
    fn recommended_stake_never_exceeds_cap(
        p in 0.0f64..=1.0,
        c in 0.0f64..=1.0,
        odds in 1.01f64..20.0,
        accuracy in 0.0f64..=1.0,
        base in 1.0f64..100_000.0,
    ) {
        let plan = calculator().evaluate(p, c, odds, accuracy, base).unwrap();
        prop_assert!(plan.recommended_stake >= 0.0);
        // Cents rounding can nudge up by at most half a cent.
        prop_assert!(plan.recommended_stake <= 0.10 * base + 0.005);
    }

    /// Lower confidence never yields a larger stake for otherwise
    /// identical inputs (tier multipliers are monotone).
    #[test]
    fn lower_confidence_never_raises_stake(
        p in 0.0f64..=1.0,
        odds in 1.01f64..20.0,
        base in 1.0f64..10_000.0,
    ) {
        let calc = calculator();
        let high_conf = calc.evaluate(p, 0.9, odds, 0.5, base).unwrap();
        let mid_conf = calc.evaluate(p, 0.6, odds, 0.5, base).unwrap();
        let low_conf = calc.evaluate(p, 0.3, odds, 0.5, base).unwrap();
        prop_assert!(high_conf.recommended_stake >= mid_conf.recommended_stake);
        prop_assert!(mid_conf.recommended_stake >= low_conf.recommended_stake);
    }
}

// ── Arbitrage Properties ────────────────────────────────────

proptest! {
    /// Implied probability is in (0, 1) for any valid decimal odds.
    #[test]
    fn implied_probability_in_unit_interval(odds in 1.01f64..1000.0) {
        let p = implied_probability(odds).unwrap();
        prop_assert!(p > 0.0 && p < 1.0, "implied={p}");
    }

    /// When a split exists, both legs pay out (nearly) the same amount
    /// and that payout exceeds the total outlay.
    #[test]
    fn arbitrage_split_locks_in_profit(
        odds_a in 1.01f64..10.0,
        odds_b in 1.01f64..10.0,
        total in 10.0f64..100_000.0,
    ) {
        if let Some(split) = two_way_split(odds_a, odds_b, total) {
            let payout_a = split.stake_a * odds_a;
            let payout_b = split.stake_b * odds_b;
            let tolerance = 1e-6 * payout_a.abs().max(1.0);
            prop_assert!((payout_a - payout_b).abs() <= tolerance);
            prop_assert!(split.profit > 0.0);
            prop_assert!(payout_a >= total - tolerance);
            prop_assert!(split.stake_a + split.stake_b <= total + tolerance);
        }
    }

    /// No split is ever produced when the implied probabilities sum
    /// to 1 or more (no arbitrage exists).
    #[test]
    fn no_split_without_edge(
        odds_a in 1.01f64..10.0,
        total in 10.0f64..10_000.0,
    ) {
        // Shading the mirror quote pushes the implied sum above 1.
        let odds_b = odds_a / (odds_a - 1.0) * 0.999;
        prop_assert!(two_way_split(odds_a, odds_b, total).is_none());
    }
}
