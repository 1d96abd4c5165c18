//! Two-outcome arbitrage and hedge stake math.
//!
//! A pair of decimal odds admits a guaranteed-profit split when the
//! implied probabilities sum below one. The split allocates stake in
//! proportion to each leg's implied probability, which makes the
//! payout identical on either outcome.

/// Implied probability of a decimal quote: `1 / odds`.
///
/// Returns `None` for odds at or below 1.0 (no payout multiplier).
pub fn implied_probability(decimal_odds: f64) -> Option<f64> {
    if decimal_odds > 1.0 && decimal_odds.is_finite() {
        Some(1.0 / decimal_odds)
    } else {
        None
    }
}

/// A guaranteed-profit stake split across two outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbSplit {
    /// Stake on the first leg.
    pub stake_a: f64,
    /// Stake on the second leg.
    pub stake_b: f64,
    /// Identical payout received on either outcome.
    pub payout: f64,
    /// Locked-in profit: total_stake * (1 - implied_sum).
    pub profit: f64,
    /// Sum of the two implied probabilities (< 1 for an arb).
    pub implied_sum: f64,
}

/// Compute the arbitrage split for a two-outcome pair, if one exists.
///
/// Returns `None` when either quote is invalid, the total stake is not
/// positive, or the implied probabilities sum to 1 or more (the market
/// is efficiently priced or worse).
pub fn two_way_split(odds_a: f64, odds_b: f64, total_stake: f64) -> Option<ArbSplit> {
    let inv_a = implied_probability(odds_a)?;
    let inv_b = implied_probability(odds_b)?;
    if total_stake <= 0.0 || !total_stake.is_finite() {
        return None;
    }

    let implied_sum = inv_a + inv_b;
    if implied_sum >= 1.0 {
        return None;
    }

    let stake_a = total_stake * inv_a / implied_sum;
    let stake_b = total_stake * inv_b / implied_sum;
    let payout = stake_a * odds_a; // equals stake_b * odds_b by construction
    let profit = total_stake * (1.0 - implied_sum);

    Some(ArbSplit {
        stake_a,
        stake_b,
        payout,
        profit,
        implied_sum,
    })
}

/// Counter-stake on a related market that equalizes the payout of an
/// existing position: `primary_stake * primary_odds / hedge_odds`.
///
/// Whichever side wins, the return is the primary position's payout.
pub fn equalizing_hedge_stake(
    primary_odds: f64,
    hedge_odds: f64,
    primary_stake: f64,
) -> Option<f64> {
    implied_probability(primary_odds)?;
    implied_probability(hedge_odds)?;
    if primary_stake <= 0.0 || !primary_stake.is_finite() {
        return None;
    }
    Some(primary_stake * primary_odds / hedge_odds)
}
