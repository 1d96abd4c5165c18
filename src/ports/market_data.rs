//! Market Data Port - External Quote and Snapshot Interface
//!
//! Defines the trait for fetching market data from upstream providers
//! (prop platforms, odds aggregators). Caching, retry, and rate-limit
//! policy belong to the adapter behind this trait; the core only
//! requires that `status` distinguishes success from failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// Upstream data sources the engine knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
  /// Prop market platform (lines, projections).
  PrizePicks,
  /// Odds aggregator (related markets, live odds).
  OddsApi,
}

impl std::fmt::Display for DataSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::PrizePicks => write!(f, "prizepicks"),
      Self::OddsApi => write!(f, "odds_api"),
    }
  }
}

/// Outcome of one fetch, independent of transport detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
  Success,
  Failed,
}

/// A fetched market payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
  /// When the provider produced the payload.
  pub timestamp: DateTime<Utc>,
  /// Raw payload; the domain flattens this into features.
  pub data: Value,
  /// Whether the fetch succeeded.
  pub status: FetchStatus,
}

/// A related market quote parsed from an odds payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
  /// Related market identifier.
  pub id: String,
  /// Decimal odds quoted on that market.
  pub odds: f64,
}

/// Trait for market data providers.
///
/// Implementors talk to the outside world (HTTP, cache layers); the
/// hexagonal architecture ensures the engine never depends on
/// transport details.
#[async_trait]
pub trait MarketDataProvider: Send + Sync + 'static {
  /// Fetch `endpoint` from `source` with the given query params.
  ///
  /// A transport-level failure is an `Err(DataFetch)`; a payload the
  /// provider itself marks bad arrives as `FetchStatus::Failed`.
  async fn fetch(
    &self,
    source: DataSource,
    endpoint: &str,
    params: &[(String, String)],
  ) -> Result<MarketSnapshot>;
}
