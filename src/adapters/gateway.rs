//! HTTP Market Data Gateway - Rate-limited REST Client
//!
//! Wraps reqwest with concurrency limiting and retries and implements
//! the `MarketDataProvider` port against the configured upstream base
//! URLs (one per data source).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::ports::market_data::{DataSource, FetchStatus, MarketDataProvider, MarketSnapshot};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
  /// Base URL for the prop market platform.
  pub prizepicks_url: String,
  /// Base URL for the odds aggregator.
  pub odds_api_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
  fn default() -> Self {
    Self {
      prizepicks_url: "https://api.prizepicks.com".to_string(),
      odds_api_url: "https://api.the-odds-api.com/v4".to_string(),
      timeout: Duration::from_secs(10),
      max_concurrent: 8,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// Rate-limited HTTP client implementing the market data port.
pub struct HttpMarketData {
  /// Underlying HTTP client.
  http: Client,
  /// Gateway configuration.
  config: GatewayConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
}

impl HttpMarketData {
  /// Create a new gateway.
  pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  fn base_url(&self, source: DataSource) -> &str {
    match source {
      DataSource::PrizePicks => &self.config.prizepicks_url,
      DataSource::OddsApi => &self.config.odds_api_url,
    }
  }

  /// Execute a GET with concurrency limiting and retries.
  ///
  /// Retries transient failures (transport errors, 429, 5xx); any
  /// other non-2xx status is terminal and surfaces as a snapshot
  /// with `FetchStatus::Failed`.
  async fn get_with_retry(
    &self,
    url: &str,
    params: &[(String, String)],
  ) -> Result<MarketSnapshot, EngineError> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| EngineError::DataFetch("request limiter closed".to_string()))?;

    let mut last_error: Option<String> = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying request");
        sleep(delay).await;
      }

      let request = self.http.get(url).query(params);

      match request.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => {
            let data: Value = response
              .json()
              .await
              .map_err(|e| EngineError::DataFetch(format!("invalid JSON payload: {e}")))?;
            return Ok(MarketSnapshot {
              timestamp: Utc::now(),
              data,
              status: FetchStatus::Success,
            });
          }
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(url, "Rate limited by upstream, backing off");
            sleep(Duration::from_secs(2)).await;
            last_error = Some("rate limited".to_string());
            continue;
          }
          status if status.is_server_error() => {
            warn!(url, status = %status, "Server error, retrying");
            last_error = Some(format!("server error: {status}"));
            continue;
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            warn!(url, status = %status, body, "Upstream rejected request");
            return Ok(MarketSnapshot {
              timestamp: Utc::now(),
              data: Value::Null,
              status: FetchStatus::Failed,
            });
          }
        },
        Err(e) => {
          warn!(url, error = %e, attempt, "Request failed");
          last_error = Some(e.to_string());
          continue;
        }
      }
    }

    Err(EngineError::DataFetch(format!(
      "retries exhausted for {url}: {}",
      last_error.unwrap_or_else(|| "unknown error".to_string())
    )))
  }
}

#[async_trait]
impl MarketDataProvider for HttpMarketData {
  async fn fetch(
    &self,
    source: DataSource,
    endpoint: &str,
    params: &[(String, String)],
  ) -> crate::errors::Result<MarketSnapshot> {
    let url = format!("{}{endpoint}", self.base_url(source));
    debug!(source = %source, url, "Fetching market data");
    self.get_with_retry(&url, params).await
  }
}
