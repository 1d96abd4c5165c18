//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails (including unknown model kinds)
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    models = config.ensemble.models.len(),
    meta_learner = config.ensemble.meta_learner.is_some(),
    markets = config.markets.len(),
    stake_cap = config.risk.stake_cap_fraction,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A non-empty model roster with unique ids and usable weights
/// - Valid probability/fraction ranges (0..1)
/// - Priced markets (decimal odds > 1, positive stakes)
/// - Non-empty endpoint URLs
fn validate_config(config: &AppConfig) -> Result<()> {
  // Ensemble validation
  anyhow::ensure!(
    !config.ensemble.models.is_empty(),
    "At least one ensemble model must be configured"
  );

  let mut total_weight = 0.0;
  for (i, model) in config.ensemble.models.iter().enumerate() {
    anyhow::ensure!(!model.id.is_empty(), "Model {} has empty id", i);
    anyhow::ensure!(
      model.weight >= 0.0 && model.weight.is_finite(),
      "Model {} ({}) has invalid weight {}",
      i,
      model.id,
      model.weight
    );
    anyhow::ensure!(
      !model.target.is_empty(),
      "Model {} ({}) has empty target field",
      i,
      model.id
    );
    anyhow::ensure!(
      !config.ensemble.models[..i].iter().any(|m| m.id == model.id),
      "Duplicate model id '{}'",
      model.id
    );
    total_weight += model.weight;
  }
  anyhow::ensure!(
    total_weight > 0.0,
    "Ensemble weights must not all be zero"
  );

  if let Some(meta) = &config.ensemble.meta_learner {
    anyhow::ensure!(!meta.id.is_empty(), "Meta-learner has empty id");
    anyhow::ensure!(
      !meta.target.is_empty(),
      "Meta-learner has empty target field"
    );
    anyhow::ensure!(
      !config.ensemble.models.iter().any(|m| m.id == meta.id),
      "Meta-learner id '{}' collides with a base model",
      meta.id
    );
  }

  // Engine validation
  anyhow::ensure!(
    config.engine.prediction_deadline_ms > 0,
    "prediction_deadline_ms must be positive"
  );
  anyhow::ensure!(
    config.engine.accuracy_window > 0,
    "accuracy_window must be positive"
  );
  anyhow::ensure!(
    config.engine.odds_movement_threshold > 0.0
      && config.engine.odds_movement_threshold < 1.0,
    "odds_movement_threshold must be in (0, 1), got {}",
    config.engine.odds_movement_threshold
  );

  // Risk validation
  anyhow::ensure!(
    config.risk.stake_cap_fraction > 0.0 && config.risk.stake_cap_fraction <= 1.0,
    "stake_cap_fraction must be in (0, 1], got {}",
    config.risk.stake_cap_fraction
  );
  for (name, mult) in [
    ("low", config.risk.multipliers.low),
    ("medium", config.risk.multipliers.medium),
    ("high", config.risk.multipliers.high),
  ] {
    anyhow::ensure!(
      mult > 0.0 && mult <= 1.0,
      "risk multiplier '{}' must be in (0, 1], got {}",
      name,
      mult
    );
  }
  anyhow::ensure!(
    config.risk.multipliers.low >= config.risk.multipliers.medium
      && config.risk.multipliers.medium >= config.risk.multipliers.high,
    "risk multipliers must not grow with risk: low {} >= medium {} >= high {}",
    config.risk.multipliers.low,
    config.risk.multipliers.medium,
    config.risk.multipliers.high
  );

  // Market validation
  for (i, market) in config.markets.iter().enumerate() {
    anyhow::ensure!(!market.id.is_empty(), "Market {} has empty id", i);
    anyhow::ensure!(
      market.decimal_odds > 1.0,
      "Market {} ({}) has decimal odds {} (must be > 1)",
      i,
      market.id,
      market.decimal_odds
    );
    anyhow::ensure!(
      market.stake > 0.0,
      "Market {} ({}) has non-positive stake",
      i,
      market.id
    );
  }

  // API validation
  anyhow::ensure!(
    !config.api.prizepicks_url.is_empty(),
    "PrizePicks API URL must not be empty"
  );
  anyhow::ensure!(
    !config.api.odds_api_url.is_empty(),
    "Odds API URL must not be empty"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::prediction::ModelKind;

  const VALID_TOML: &str = r#"
    [bot]
    name = "prop-edge-bot"

    [[ensemble.models]]
    id = "ewma"
    kind = "time-series"
    weight = 0.4
    features = ["points_line"]
    target = "outcome"

    [[ensemble.models]]
    id = "logit"
    kind = "logistic"
    weight = 0.6
    features = ["points_line", "minutes"]
    target = "outcome"

    [ensemble.models.hyperparameters]
    learning_rate = 0.05

    [[markets]]
    id = "nba-lbj-points"
    decimal_odds = 2.1
    stake = 100.0

    [api]
    prizepicks_url = "https://api.prizepicks.com"
    odds_api_url = "https://api.the-odds-api.com/v4"
  "#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_parse_valid_config() {
    let config = parse_config(VALID_TOML).unwrap();
    assert_eq!(config.ensemble.models.len(), 2);
    assert_eq!(config.ensemble.models[0].kind, ModelKind::TimeSeries);
    assert_eq!(config.ensemble.models[1].hyper("learning_rate", 0.1), 0.05);
    assert_eq!(config.engine.prediction_deadline_ms, 1500);
    assert_eq!(config.risk.stake_cap_fraction, 0.10);
    assert!(config.markets[0].active);
  }

  #[test]
  fn test_unknown_model_kind_is_rejected() {
    let toml = VALID_TOML.replace("time-series", "quantum-annealer");
    let result = parse_config(&toml);
    assert!(result.is_err());
  }

  #[test]
  fn test_zero_total_weight_is_rejected() {
    let toml = VALID_TOML
      .replace("weight = 0.4", "weight = 0.0")
      .replace("weight = 0.6", "weight = 0.0");
    let result = parse_config(&toml);
    assert!(result.unwrap_err().to_string().contains("weights"));
  }

  #[test]
  fn test_duplicate_model_id_is_rejected() {
    let toml = VALID_TOML.replace("id = \"logit\"", "id = \"ewma\"");
    assert!(parse_config(&toml).is_err());
  }

  #[test]
  fn test_inverted_risk_multipliers_are_rejected() {
    let toml = format!(
      "{VALID_TOML}\n[risk.multipliers]\nlow = 0.4\nmedium = 0.7\nhigh = 1.0\n"
    );
    let err = parse_config(&toml).unwrap_err();
    assert!(err.to_string().contains("multipliers"));
  }

  #[test]
  fn test_invalid_market_odds_are_rejected() {
    let toml = VALID_TOML.replace("decimal_odds = 2.1", "decimal_odds = 0.9");
    assert!(parse_config(&toml).is_err());
  }
}
