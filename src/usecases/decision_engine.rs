//! Decision Engine - Ensemble Analysis Facade
//!
//! The main use case orchestrating one betting decision:
//! 1. Validates the priced opportunity
//! 2. Fetches the market snapshot and extracts features
//! 3. Queries every forecasting model concurrently under a deadline
//! 4. Aggregates (weighted average or meta-learner)
//! 5. Applies historical calibration, risk tiering, and Kelly sizing
//! 6. Scans related markets for hedges without blocking the main path
//!
//! Stateless per request: the only state that evolves between calls
//! is the accuracy tracker, the model roster, and the models
//! themselves, all updated through explicit operations behind async
//! locks so every entry point works on a shared handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::accuracy::AccuracyTracker;
use crate::domain::ensemble::{self, ScoredPrediction};
use crate::domain::features;
use crate::domain::models::{self, ForecastModel};
use crate::domain::prediction::{
  BettingAnalysis, EnsemblePrediction, Features, ModelBreakdown, ModelSpec, Opportunity,
  Prediction,
};
use crate::domain::staking::RiskCalculator;
use crate::errors::{EngineError, Result};
use crate::ports::market_data::{DataSource, FetchStatus, MarketDataProvider};
use crate::ports::notifier::{EngineEvent, Notifier};

use super::hedge_finder::HedgeFinder;

/// A model wrapped for shared access: `predict` takes the read side,
/// `train`/`update` take the write side, so incremental updates can
/// never corrupt a concurrently running prediction.
type SharedModel = Arc<RwLock<Box<dyn ForecastModel>>>;

struct ModelSlot {
  spec: ModelSpec,
  model: SharedModel,
}

impl ModelSlot {
  fn build(spec: ModelSpec) -> Self {
    let model = Arc::new(RwLock::new(models::build(&spec)));
    Self { spec, model }
  }
}

/// The mutable ensemble membership: base models plus the optional
/// meta-learner, guarded as one unit so the meta feature shape always
/// matches the current base roster.
struct Roster {
  slots: Vec<ModelSlot>,
  meta: Option<ModelSlot>,
}

/// Tunables for the analysis pipeline.
#[derive(Debug, Clone)]
pub struct EngineSettings {
  /// Per-model prediction deadline.
  pub prediction_deadline: Duration,
  /// Rolling window for calibration accuracy reads.
  pub accuracy_window: usize,
  /// Maximum retained accuracy records per model.
  pub accuracy_capacity: usize,
  /// Relative odds change that counts as movement (0.05 = 5%).
  pub odds_movement_threshold: f64,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      prediction_deadline: Duration::from_millis(1500),
      accuracy_window: 200,
      accuracy_capacity: 500,
      odds_movement_threshold: 0.05,
    }
  }
}

/// Ensemble decision engine.
///
/// Explicitly constructed and dependency-injected: callers own the
/// instance (typically behind an `Arc`) instead of reaching for a
/// process-global singleton. Every operation, roster mutation
/// included, takes `&self`.
pub struct DecisionEngine<P: MarketDataProvider> {
  provider: Arc<P>,
  notifier: Arc<dyn Notifier>,
  roster: RwLock<Roster>,
  accuracy: RwLock<AccuracyTracker>,
  risk: RiskCalculator,
  hedges: HedgeFinder<P>,
  settings: EngineSettings,
}

impl<P: MarketDataProvider> DecisionEngine<P> {
  /// Configure the ensemble and build every model.
  ///
  /// # Errors
  /// `Configuration` for duplicate ids, negative weights, or weights
  /// summing to zero.
  pub fn new(
    specs: Vec<ModelSpec>,
    meta_spec: Option<ModelSpec>,
    risk: RiskCalculator,
    settings: EngineSettings,
    provider: Arc<P>,
    notifier: Arc<dyn Notifier>,
  ) -> Result<Self> {
    validate_specs(&specs)?;

    let slots: Vec<ModelSlot> = specs.into_iter().map(ModelSlot::build).collect();

    // The meta-learner consumes first-stage outputs, so its feature
    // set is derived from the roster, not configured.
    let meta = meta_spec.map(|mut spec| {
      spec.features = derived_meta_features(&slots);
      ModelSlot::build(spec)
    });

    let hedges = HedgeFinder::new(Arc::clone(&provider));
    let accuracy = RwLock::new(AccuracyTracker::new(settings.accuracy_capacity));

    info!(
      models = slots.len(),
      meta_learner = meta.is_some(),
      deadline_ms = settings.prediction_deadline.as_millis() as u64,
      "Decision engine configured"
    );

    Ok(Self {
      provider,
      notifier,
      roster: RwLock::new(Roster { slots, meta }),
      accuracy,
      risk,
      hedges,
      settings,
    })
  }

  /// Analyze one priced opportunity end to end.
  ///
  /// Emits `analysis_complete` on success; on any fatal failure emits
  /// `error` with the taxonomy code and rejects the request.
  #[instrument(skip(self, opportunity), fields(market = %opportunity.market))]
  pub async fn analyze(&self, opportunity: &Opportunity) -> Result<BettingAnalysis> {
    match self.analyze_inner(opportunity).await {
      Ok(analysis) => {
        info!(
          probability = analysis.ensemble.probability,
          risk = %analysis.ensemble.risk_level,
          stake = analysis.ensemble.recommended_stake,
          hedges = analysis.hedges.len(),
          "Analysis complete"
        );
        self
          .notifier
          .notify(EngineEvent::AnalysisComplete(Box::new(analysis.clone())));
        Ok(analysis)
      }
      Err(err) => {
        self.notifier.notify(EngineEvent::Error {
          market: opportunity.market.clone(),
          code: err.code(),
          message: err.to_string(),
        });
        Err(err)
      }
    }
  }

  async fn analyze_inner(&self, opportunity: &Opportunity) -> Result<BettingAnalysis> {
    validate_opportunity(opportunity)?;

    // Hedge scan is independent of the prediction path: start it now,
    // collect it last, and never let it fail the request.
    let hedge_task = {
      let finder = self.hedges.clone();
      let market = opportunity.market.clone();
      let odds = opportunity.decimal_odds;
      let stake = opportunity.stake;
      tokio::spawn(async move { finder.find_hedges(&market, odds, stake).await })
    };

    let snapshot = self
      .provider
      .fetch(
        DataSource::PrizePicks,
        &format!("/markets/{}", opportunity.market),
        &[],
      )
      .await?;
    if snapshot.status == FetchStatus::Failed {
      return Err(EngineError::DataFetch(format!(
        "provider reported failure for market '{}'",
        opportunity.market
      )));
    }
    let feature_row = features::from_snapshot(&snapshot.data);

    let mut factors = Vec::new();
    self.detect_odds_movement(opportunity, &feature_row, &mut factors);

    let roster = self.roster.read().await;
    let total_models = roster.slots.len();
    let outcomes =
      Self::predict_all(&roster.slots, &feature_row, self.settings.prediction_deadline).await;

    let mut scored = Vec::new();
    let mut breakdown = Vec::new();
    let mut timeouts = 0usize;
    for (id, result) in outcomes {
      match result {
        Ok(pred) => {
          breakdown.push(ModelBreakdown {
            model_id: id.clone(),
            probability: pred.probability,
            confidence: pred.confidence,
            weight: pred.weight,
          });
          scored.push(ScoredPrediction::new(id, pred));
        }
        Err(err) => {
          warn!(model = %id, error = %err, "Model excluded from ensemble");
          if roster.meta.is_some() {
            // Stacking needs a fixed-shape input; one hole sinks it.
            return Err(EngineError::Configuration(format!(
              "meta-learner requires all base models; '{id}' failed: {err}"
            )));
          }
          if matches!(err, EngineError::PredictionTimeout { .. }) {
            timeouts += 1;
            factors.push(format!("Model {id} excluded: deadline exceeded"));
          } else {
            factors.push(format!("Model {id} excluded: inference failure"));
          }
        }
      }
    }

    let (probability, confidence) = match &roster.meta {
      Some(meta) => self.meta_predict(meta, &scored).await?,
      // Survivor weights are the denominator, which renormalizes the
      // ensemble after exclusions.
      None => ensemble::weighted_average(&scored)?,
    };
    drop(roster);

    if timeouts > 0 {
      factors.push(format!(
        "Degraded: {timeouts} of {total_models} models missed the prediction deadline"
      ));
    }
    factors.extend(ensemble::consensus_factors(&scored));

    let historical_accuracy = self
      .accuracy
      .read()
      .await
      .ensemble_accuracy(
        scored.iter().map(|s| s.model_id.as_str()),
        Some(self.settings.accuracy_window),
      );

    let plan = self.risk.evaluate(
      probability,
      confidence,
      opportunity.decimal_odds,
      historical_accuracy,
      opportunity.stake,
    )?;

    let hedges = match hedge_task.await {
      Ok(Ok(candidates)) => candidates,
      Ok(Err(err)) => {
        warn!(error = %err, "Hedge scan failed, continuing without hedges");
        factors.push(format!("Hedge scan unavailable: {err}"));
        Vec::new()
      }
      Err(err) => {
        warn!(error = %err, "Hedge scan task panicked, continuing without hedges");
        factors.push("Hedge scan unavailable: internal task failure".to_string());
        Vec::new()
      }
    };

    Ok(BettingAnalysis {
      id: Uuid::new_v4(),
      opportunity: opportunity.clone(),
      ensemble: EnsemblePrediction {
        probability,
        confidence,
        breakdown,
        factors,
        historical_accuracy,
        expected_value: plan.expected_value,
        risk_level: plan.risk_level,
        recommended_stake: plan.recommended_stake,
        edge: plan.edge,
      },
      hedges,
      analyzed_at: Utc::now(),
    })
  }

  /// Query every base model concurrently, bounding each by the
  /// prediction deadline. Result order matches roster order.
  async fn predict_all(
    slots: &[ModelSlot],
    feature_row: &Features,
    deadline: Duration,
  ) -> Vec<(String, Result<Prediction>)> {
    let tasks = slots.iter().map(|slot| {
      let model = Arc::clone(&slot.model);
      let id = slot.spec.id.clone();
      let row = feature_row.clone();
      async move {
        let result = match timeout(deadline, async {
          model.read().await.predict(&row).await
        })
        .await
        {
          Ok(res) => res,
          Err(_) => Err(EngineError::PredictionTimeout {
            model: id.clone(),
            deadline_ms: deadline.as_millis() as u64,
          }),
        };
        (id, result)
      }
    });
    join_all(tasks).await
  }

  async fn meta_predict(
    &self,
    meta: &ModelSlot,
    scored: &[ScoredPrediction],
  ) -> Result<(f64, f64)> {
    if scored.is_empty() {
      return Err(EngineError::Configuration(
        "meta-learner has no base model outputs".to_string(),
      ));
    }
    let meta_row = ensemble::meta_features(scored);
    let result = timeout(self.settings.prediction_deadline, async {
      meta.model.read().await.predict(&meta_row).await
    })
    .await;
    match result {
      Ok(Ok(pred)) => Ok((pred.probability, pred.confidence)),
      Ok(Err(err)) => Err(EngineError::Configuration(format!(
        "meta-learner inference failed: {err}"
      ))),
      Err(_) => Err(EngineError::Configuration(
        "meta-learner missed the prediction deadline".to_string(),
      )),
    }
  }

  /// Train every base model on the dataset, then the meta-learner on
  /// generated first-stage outputs.
  #[instrument(skip(self, dataset), fields(rows = dataset.len()))]
  pub async fn train(&self, dataset: &[Features]) -> Result<()> {
    let roster = self.roster.read().await;
    let results = join_all(roster.slots.iter().map(|slot| {
      let model = Arc::clone(&slot.model);
      async move { model.write().await.train(dataset).await }
    }))
    .await;
    for result in results {
      result?;
    }

    if let Some(meta) = &roster.meta {
      let meta_rows = Self::generate_meta_rows(&roster.slots, meta, dataset).await?;
      meta.model.write().await.train(&meta_rows).await?;
    }

    info!(models = roster.slots.len(), "Ensemble trained");
    Ok(())
  }

  /// Incrementally update every model with fresh rows, feeding the
  /// accuracy tracker with each model's call versus the realized
  /// target before the model absorbs the row.
  #[instrument(skip(self, rows), fields(rows = rows.len()))]
  pub async fn update_models(&self, rows: &[Features]) -> Result<()> {
    if rows.is_empty() {
      return Ok(());
    }

    let roster = self.roster.read().await;
    for row in rows {
      for slot in &roster.slots {
        let Some(&realized) = row.get(&slot.spec.target) else {
          continue;
        };
        if let Ok(pred) = slot.model.read().await.predict(row).await {
          self
            .accuracy
            .write()
            .await
            .record(&slot.spec.id, pred.probability, realized);
        }
      }
    }

    let results = join_all(roster.slots.iter().map(|slot| {
      let model = Arc::clone(&slot.model);
      async move { model.write().await.update(rows).await }
    }))
    .await;
    for result in results {
      result?;
    }

    if let Some(meta) = &roster.meta {
      let meta_rows = Self::generate_meta_rows(&roster.slots, meta, rows).await?;
      meta.model.write().await.train(&meta_rows).await?;
    }

    let models = roster.slots.iter().map(|s| s.spec.id.clone()).collect();
    drop(roster);

    self.notifier.notify(EngineEvent::PredictionsUpdated {
      models,
      rows: rows.len(),
    });
    Ok(())
  }

  /// First-stage outputs for each row, keyed for the meta-learner and
  /// carrying the realized target through.
  async fn generate_meta_rows(
    slots: &[ModelSlot],
    meta: &ModelSlot,
    dataset: &[Features],
  ) -> Result<Vec<Features>> {
    let mut meta_rows = Vec::with_capacity(dataset.len());
    for row in dataset {
      let mut scored = Vec::new();
      for slot in slots {
        let pred = slot.model.read().await.predict(row).await?;
        scored.push(ScoredPrediction::new(slot.spec.id.clone(), pred));
      }
      let mut meta_row = ensemble::meta_features(&scored);
      let target = row
        .get(&meta.spec.target)
        .copied()
        .ok_or_else(|| EngineError::Training {
          model: meta.spec.id.clone(),
          reason: format!("row missing target field '{}'", meta.spec.target),
        })?;
      meta_row.insert(meta.spec.target.clone(), target);
      meta_rows.push(meta_row);
    }
    Ok(meta_rows)
  }

  /// Record a realized outcome against a model's earlier prediction.
  pub async fn record_outcome(
    &self,
    model_id: &str,
    predicted: f64,
    outcome: f64,
  ) -> Result<()> {
    if !(0.0..=1.0).contains(&predicted) {
      return Err(EngineError::Validation(format!(
        "predicted probability must be in [0, 1], got {predicted}"
      )));
    }
    if !self
      .roster
      .read()
      .await
      .slots
      .iter()
      .any(|s| s.spec.id == model_id)
    {
      return Err(EngineError::Validation(format!(
        "unknown model id '{model_id}'"
      )));
    }
    self
      .accuracy
      .write()
      .await
      .record(model_id, predicted, outcome);
    Ok(())
  }

  /// Rolling calibration accuracy for one model.
  pub async fn accuracy_of(&self, model_id: &str) -> f64 {
    self
      .accuracy
      .read()
      .await
      .accuracy_of(model_id, Some(self.settings.accuracy_window))
  }

  /// Add a model to the ensemble. Takes the roster write lock, so a
  /// shared handle can grow the ensemble at runtime.
  pub async fn add_model(&self, spec: ModelSpec) -> Result<()> {
    if spec.weight < 0.0 {
      return Err(EngineError::Configuration(format!(
        "model '{}' has negative weight {}",
        spec.id, spec.weight
      )));
    }
    let mut roster = self.roster.write().await;
    if roster.slots.iter().any(|s| s.spec.id == spec.id) {
      return Err(EngineError::Configuration(format!(
        "duplicate model id '{}'",
        spec.id
      )));
    }
    let model_id = spec.id.clone();
    roster.slots.push(ModelSlot::build(spec));
    let Roster { slots, meta } = &mut *roster;
    if let Some(meta) = meta {
      meta.spec.features = derived_meta_features(slots);
    }
    drop(roster);
    self.notifier.notify(EngineEvent::ModelAdded { model_id });
    Ok(())
  }

  /// Remove a model from the ensemble. The last model cannot be
  /// removed — an empty ensemble cannot aggregate.
  pub async fn remove_model(&self, model_id: &str) -> Result<()> {
    let mut roster = self.roster.write().await;
    if roster.slots.len() == 1 && roster.slots[0].spec.id == model_id {
      return Err(EngineError::Configuration(
        "cannot remove the last ensemble model".to_string(),
      ));
    }
    let before = roster.slots.len();
    roster.slots.retain(|s| s.spec.id != model_id);
    if roster.slots.len() == before {
      return Err(EngineError::Configuration(format!(
        "unknown model id '{model_id}'"
      )));
    }
    let Roster { slots, meta } = &mut *roster;
    if let Some(meta) = meta {
      meta.spec.features = derived_meta_features(slots);
    }
    drop(roster);
    self.notifier.notify(EngineEvent::ModelRemoved {
      model_id: model_id.to_string(),
    });
    Ok(())
  }

  /// Configured model ids, in ensemble order.
  pub async fn model_ids(&self) -> Vec<String> {
    self
      .roster
      .read()
      .await
      .slots
      .iter()
      .map(|s| s.spec.id.clone())
      .collect()
  }

  /// Clone of the accuracy tracker for snapshot persistence.
  pub async fn accuracy_snapshot(&self) -> AccuracyTracker {
    self.accuracy.read().await.clone()
  }

  /// Replace the accuracy tracker from a persisted snapshot.
  pub async fn restore_accuracy(&self, tracker: AccuracyTracker) {
    *self.accuracy.write().await = tracker;
  }

  /// Flag material divergence between the quoted odds and the live
  /// odds carried in the snapshot, when the snapshot has any.
  fn detect_odds_movement(
    &self,
    opportunity: &Opportunity,
    feature_row: &Features,
    factors: &mut Vec<String>,
  ) {
    let Some(&live_odds) = feature_row.get("odds") else {
      return;
    };
    if live_odds <= 1.0 {
      return;
    }
    let relative = (live_odds - opportunity.decimal_odds).abs() / opportunity.decimal_odds;
    if relative > self.settings.odds_movement_threshold {
      debug!(
        quoted = opportunity.decimal_odds,
        live = live_odds,
        "Odds moved since quote"
      );
      factors.push(format!(
        "Market odds moved since quote: {} -> {}",
        opportunity.decimal_odds, live_odds
      ));
      self.notifier.notify(EngineEvent::OddsMovement {
        market: opportunity.market.clone(),
        quoted_odds: opportunity.decimal_odds,
        live_odds,
      });
    }
  }
}

/// Meta-learner feature names for the current base roster, sorted by
/// model id so the shape is stable across prediction arrival order.
fn derived_meta_features(slots: &[ModelSlot]) -> Vec<String> {
  let mut ids: Vec<&str> = slots.iter().map(|s| s.spec.id.as_str()).collect();
  ids.sort_unstable();
  ids
    .iter()
    .flat_map(|id| [format!("{id}_conf"), format!("{id}_prob")])
    .collect()
}

fn validate_specs(specs: &[ModelSpec]) -> Result<()> {
  if specs.is_empty() {
    return Err(EngineError::Configuration(
      "ensemble requires at least one model".to_string(),
    ));
  }
  let mut total_weight = 0.0;
  for (i, spec) in specs.iter().enumerate() {
    if spec.weight < 0.0 {
      return Err(EngineError::Configuration(format!(
        "model '{}' has negative weight {}",
        spec.id, spec.weight
      )));
    }
    if specs[..i].iter().any(|other| other.id == spec.id) {
      return Err(EngineError::Configuration(format!(
        "duplicate model id '{}'",
        spec.id
      )));
    }
    total_weight += spec.weight;
  }
  if total_weight <= 0.0 {
    return Err(EngineError::Configuration(
      "ensemble weights sum to zero".to_string(),
    ));
  }
  Ok(())
}

fn validate_opportunity(opportunity: &Opportunity) -> Result<()> {
  if opportunity.market.is_empty() {
    return Err(EngineError::Validation("market id is empty".to_string()));
  }
  if !(opportunity.decimal_odds > 1.0 && opportunity.decimal_odds.is_finite()) {
    return Err(EngineError::Validation(format!(
      "decimal odds must be > 1, got {}",
      opportunity.decimal_odds
    )));
  }
  if !(opportunity.stake > 0.0 && opportunity.stake.is_finite()) {
    return Err(EngineError::Validation(format!(
      "stake must be positive, got {}",
      opportunity.stake
    )));
  }
  Ok(())
}
