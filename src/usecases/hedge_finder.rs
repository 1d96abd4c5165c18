//! Hedge Finder - Related-Market Scan
//!
//! Scans the odds aggregator for markets related to a primary
//! position and classifies each quote: a two-sided price whose
//! implied probabilities sum below 1 is an arbitrage (guaranteed
//! profit); any other quote priced under the primary odds is a plain
//! hedge with an equalizing counter-stake.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::arbitrage::{equalizing_hedge_stake, two_way_split};
use crate::domain::prediction::HedgeCandidate;
use crate::errors::{EngineError, Result};
use crate::ports::market_data::{DataSource, FetchStatus, MarketDataProvider, MarketQuote};

pub struct HedgeFinder<P> {
  provider: Arc<P>,
}

impl<P> Clone for HedgeFinder<P> {
  fn clone(&self) -> Self {
    Self {
      provider: Arc::clone(&self.provider),
    }
  }
}

impl<P: MarketDataProvider> HedgeFinder<P> {
  pub fn new(provider: Arc<P>) -> Self {
    Self { provider }
  }

  /// Fetch related quotes and rank the hedging options for a primary
  /// position of `total_stake` at `primary_odds`.
  #[instrument(skip(self), fields(market = %market))]
  pub async fn find_hedges(
    &self,
    market: &str,
    primary_odds: f64,
    total_stake: f64,
  ) -> Result<Vec<HedgeCandidate>> {
    let snapshot = self
      .provider
      .fetch(
        DataSource::OddsApi,
        &format!("/related-markets/{market}"),
        &[],
      )
      .await?;
    if snapshot.status == FetchStatus::Failed {
      return Err(EngineError::DataFetch(format!(
        "provider reported failure for related markets of '{market}'"
      )));
    }

    let quotes: Vec<MarketQuote> = serde_json::from_value(snapshot.data).map_err(|err| {
      EngineError::DataFetch(format!("malformed related-markets payload: {err}"))
    })?;

    let mut candidates = Vec::new();
    for quote in quotes {
      if let Some(split) = two_way_split(primary_odds, quote.odds, total_stake) {
        // Arbitrage: backing both sides per the split locks in profit.
        candidates.push(HedgeCandidate {
          market: quote.id,
          odds: quote.odds,
          recommended_stake: split.stake_b,
          guaranteed_profit: Some(split.profit),
        });
      } else if quote.odds < primary_odds {
        if let Some(counter) = equalizing_hedge_stake(primary_odds, quote.odds, total_stake) {
          candidates.push(HedgeCandidate {
            market: quote.id,
            odds: quote.odds,
            recommended_stake: counter,
            guaranteed_profit: None,
          });
        }
      }
    }

    debug!(candidates = candidates.len(), "Hedge scan complete");
    Ok(candidates)
  }
}
