//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`. The model
//! roster, risk parameters, and upstream endpoints are externalized
//! here - nothing is hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::adapters::gateway::GatewayConfig;
use crate::domain::prediction::ModelSpec;
use crate::domain::staking::{RiskCalculator, RiskMultipliers};
use crate::usecases::EngineSettings;

/// Top-level engine configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the engine begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and metadata.
  pub bot: BotConfig,
  /// Analysis pipeline parameters.
  #[serde(default)]
  pub engine: EngineConfig,
  /// Risk tiering and staking parameters.
  #[serde(default)]
  pub risk: RiskConfig,
  /// Ensemble model roster.
  pub ensemble: EnsembleConfig,
  /// Markets to watch in the analysis loop.
  pub markets: Vec<MarketWatchConfig>,
  /// Upstream API endpoints.
  pub api: ApiConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

/// Analysis pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Per-model prediction deadline (milliseconds).
  #[serde(default = "default_deadline_ms")]
  pub prediction_deadline_ms: u64,
  /// Rolling window for calibration accuracy reads.
  #[serde(default = "default_accuracy_window")]
  pub accuracy_window: usize,
  /// Maximum retained accuracy records per model.
  #[serde(default = "default_accuracy_capacity")]
  pub accuracy_capacity: usize,
  /// Relative odds change that counts as movement (0.05 = 5%).
  #[serde(default = "default_odds_movement")]
  pub odds_movement_threshold: f64,
  /// Interval between analysis sweeps (seconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_seconds: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      prediction_deadline_ms: default_deadline_ms(),
      accuracy_window: default_accuracy_window(),
      accuracy_capacity: default_accuracy_capacity(),
      odds_movement_threshold: default_odds_movement(),
      poll_interval_seconds: default_poll_interval(),
    }
  }
}

impl EngineConfig {
  /// Convert to engine settings.
  pub fn to_settings(&self) -> EngineSettings {
    EngineSettings {
      prediction_deadline: Duration::from_millis(self.prediction_deadline_ms),
      accuracy_window: self.accuracy_window,
      accuracy_capacity: self.accuracy_capacity,
      odds_movement_threshold: self.odds_movement_threshold,
    }
  }
}

/// Risk tiering and staking configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
  /// Kelly cap as fraction of the base stake (0.10 = 10%).
  #[serde(default = "default_stake_cap")]
  pub stake_cap_fraction: f64,
  /// Per-tier stake multipliers.
  #[serde(default)]
  pub multipliers: MultiplierConfig,
}

impl Default for RiskConfig {
  fn default() -> Self {
    Self {
      stake_cap_fraction: default_stake_cap(),
      multipliers: MultiplierConfig::default(),
    }
  }
}

impl RiskConfig {
  /// Convert to a risk calculator.
  pub fn to_calculator(&self) -> RiskCalculator {
    RiskCalculator::new(
      self.stake_cap_fraction,
      RiskMultipliers {
        low: self.multipliers.low,
        medium: self.multipliers.medium,
        high: self.multipliers.high,
      },
    )
  }
}

/// Stake multipliers per risk tier.
#[derive(Debug, Clone, Deserialize)]
pub struct MultiplierConfig {
  #[serde(default = "default_mult_low")]
  pub low: f64,
  #[serde(default = "default_mult_medium")]
  pub medium: f64,
  #[serde(default = "default_mult_high")]
  pub high: f64,
}

impl Default for MultiplierConfig {
  fn default() -> Self {
    Self {
      low: default_mult_low(),
      medium: default_mult_medium(),
      high: default_mult_high(),
    }
  }
}

/// Ensemble model roster.
#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
  /// Base models. Weights are relative, not required to sum to 1.
  pub models: Vec<ModelSpec>,
  /// Optional second-stage model trained on base outputs. Its
  /// `features` list is derived at engine construction and may be
  /// left empty here.
  pub meta_learner: Option<ModelSpec>,
}

/// One market the analysis loop watches.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketWatchConfig {
  /// Market identifier as the prop platform knows it.
  pub id: String,
  /// Quoted decimal odds for the position under consideration.
  pub decimal_odds: f64,
  /// Base stake (bankroll share) the Kelly sizing works from.
  pub stake: f64,
  /// Whether this market is actively analyzed.
  #[serde(default = "default_true")]
  pub active: bool,
}

/// Upstream API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Prop market platform base URL.
  pub prizepicks_url: String,
  /// Odds aggregator base URL.
  pub odds_api_url: String,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Maximum concurrent upstream requests.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between retries (milliseconds).
  #[serde(default = "default_retry_delay_ms")]
  pub retry_base_delay_ms: u64,
}

impl ApiConfig {
  /// Convert to a gateway configuration.
  pub fn to_gateway(&self) -> GatewayConfig {
    GatewayConfig {
      prizepicks_url: self.prizepicks_url.clone(),
      odds_api_url: self.odds_api_url.clone(),
      timeout: Duration::from_millis(self.timeout_ms),
      max_concurrent: self.max_concurrent,
      max_retries: self.max_retries,
      retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for JSONL decision logs and the accuracy snapshot.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Whether to persist decisions and accuracy at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      enabled: true,
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_health_port() -> u16 {
  9090
}

fn default_deadline_ms() -> u64 {
  1500
}

fn default_accuracy_window() -> usize {
  200
}

fn default_accuracy_capacity() -> usize {
  500
}

fn default_odds_movement() -> f64 {
  0.05
}

fn default_poll_interval() -> u64 {
  30
}

fn default_stake_cap() -> f64 {
  0.10
}

fn default_mult_low() -> f64 {
  1.0
}

fn default_mult_medium() -> f64 {
  0.7
}

fn default_mult_high() -> f64 {
  0.4
}

fn default_true() -> bool {
  true
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_max_concurrent() -> usize {
  8
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_delay_ms() -> u64 {
  200
}

fn default_data_dir() -> String {
  "data".to_string()
}
