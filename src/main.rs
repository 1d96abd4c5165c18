//! Prop Edge Bot — Entry Point
//!
//! Initializes configuration, logging, the market data gateway, and
//! the ensemble decision engine. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create HTTP gateway (MarketDataProvider port, retry + rate limit)
//! 4. Create decision log (JSONL persistence) and restore accuracy
//! 5. Build DecisionEngine from the configured model roster
//! 6. Spawn health server (/live + /ready)
//! 7. Spawn periodic analysis loop over the configured markets
//! 8. Wait for SIGINT → graceful shutdown (snapshot→drain→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

mod adapters;
mod config;
mod domain;
mod errors;
mod ports;
mod usecases;

use adapters::gateway::HttpMarketData;
use adapters::notify::TracingNotifier;
use adapters::persistence::DecisionLog;
use domain::prediction::Opportunity;
use usecases::DecisionEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.bot.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        models = config.ensemble.models.len(),
        markets = config.markets.len(),
        "Starting prop edge bot"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (health_tx, health_rx) = watch::channel(true);

    // ── 4. Create HTTP gateway (MarketDataProvider port) ────
    let gateway = Arc::new(
        HttpMarketData::new(config.api.to_gateway())
            .context("Failed to create market data gateway")?,
    );

    // ── 5. Create decision log + restore accuracy snapshot ──
    let decision_log = if config.persistence.enabled {
        Some(Arc::new(
            DecisionLog::new(&config.persistence.data_dir)
                .await
                .context("Failed to create decision log")?,
        ))
    } else {
        None
    };

    // ── 6. Build the ensemble decision engine ───────────────
    let engine = Arc::new(
        DecisionEngine::new(
            config.ensemble.models.clone(),
            config.ensemble.meta_learner.clone(),
            config.risk.to_calculator(),
            config.engine.to_settings(),
            Arc::clone(&gateway),
            Arc::new(TracingNotifier),
        )
        .context("Failed to build decision engine")?,
    );

    if let Some(log) = &decision_log {
        match log.load_accuracy_snapshot().await {
            Ok(Some(tracker)) => {
                info!("Accuracy snapshot restored");
                engine.restore_accuracy(tracker).await;
            }
            Ok(None) => info!("No accuracy snapshot found, starting cold"),
            Err(e) => warn!(error = %e, "Failed to restore accuracy snapshot"),
        }
    }

    // ── 7. Spawn health server ──────────────────────────────
    let health_handle = tokio::spawn(serve_health(health_rx, config.bot.health_port));

    // ── 8. Spawn periodic analysis loop ─────────────────────
    let loop_shutdown = shutdown_tx.subscribe();
    let loop_engine = Arc::clone(&engine);
    let loop_log = decision_log.clone();
    let loop_config = config.clone();
    let engine_handle = tokio::spawn(async move {
        if let Err(e) = run_analysis_loop(loop_config, loop_engine, loop_log, loop_shutdown).await
        {
            error!(error = %e, "Analysis loop failed");
        }
    });

    info!("All tasks spawned — bot is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown (checklist: signal→snapshot→drain→exit) ──

    // 1. Signal all tasks to stop
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 2. Mark health as unhealthy (readiness probe → 503)
    let _ = health_tx.send(false);

    // 3. Persist the accuracy tracker
    if let Some(log) = &decision_log {
        let snapshot = engine.accuracy_snapshot().await;
        match log.save_accuracy_snapshot(&snapshot).await {
            Ok(()) => info!("Accuracy snapshot saved"),
            Err(e) => warn!(error = %e, "Failed to save accuracy snapshot"),
        }
    }

    // 4. Wait for the analysis loop to finish (up to 30s)
    info!("Waiting for analysis loop shutdown...");
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        engine_handle,
    )
    .await;

    // 5. Stop health server
    health_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Periodically analyze every active market until shutdown.
///
/// Per-market failures are logged and skipped; one bad market never
/// stalls the sweep.
async fn run_analysis_loop(
    config: config::AppConfig,
    engine: Arc<DecisionEngine<HttpMarketData>>,
    decision_log: Option<Arc<DecisionLog>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let active: Vec<Opportunity> = config
        .markets
        .iter()
        .filter(|m| m.active)
        .map(|m| Opportunity::new(&m.id, m.decimal_odds, m.stake))
        .collect();

    if active.is_empty() {
        warn!("No active markets configured — engine idle");
        let _ = shutdown_rx.recv().await;
        return Ok(());
    }

    info!(
        markets = active.len(),
        interval_s = config.engine.poll_interval_seconds,
        "Analysis loop started"
    );

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        config.engine.poll_interval_seconds,
    ));

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!("Analysis loop received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                for opportunity in &active {
                    match engine.analyze(opportunity).await {
                        Ok(analysis) => {
                            if let Some(log) = &decision_log {
                                if let Err(e) = log.append_analysis(&analysis).await {
                                    warn!(error = %e, "Failed to persist analysis");
                                }
                            }
                        }
                        Err(e) => {
                            warn!(
                                market = %opportunity.market,
                                error = %e,
                                "Market analysis failed"
                            );
                        }
                    }
                }
            }
        }
    }

    info!("Analysis loop stopped cleanly");
    Ok(())
}

/// Serve health endpoints.
///
/// - `/live`  — Liveness probe: 200 if process is running
/// - `/ready` — Readiness probe: 503 during graceful shutdown
async fn serve_health(health_rx: watch::Receiver<bool>, port: u16) -> Result<()> {
    use axum::{extract::State, http::StatusCode, routing::get, Router};

    let app = Router::new()
        .route("/live", get(|| async { StatusCode::OK }))
        .route(
            "/ready",
            get(
                move |State(rx): State<watch::Receiver<bool>>| async move {
                    if *rx.borrow() {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                },
            ),
        )
        .with_state(health_rx);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Health server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
