//! CAPFLOW: capital deployment scheduler.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the scheduler against the paper exchange, starts the dashboard,
//! and runs until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use capflow::config;
use capflow::dashboard;
use capflow::dashboard::routes::DashboardState;
use capflow::engine::scheduler::Scheduler;
use capflow::exchange::paper::{PaperRouter, StaticBackend};
use capflow::signal::SnapshotScorer;
use capflow::store::StateStore;

const BANNER: &str = r#"
  ____    _    ____  _____ _     _____        __
 / ___|  / \  |  _ \|  ___| |   / _ \ \      / /
| |     / _ \ | |_) | |_  | |  | | | \ \ /\ / /
| |___ / ___ \|  __/|  _| | |__| |_| |\ V  V /
 \____/_/   \_\_|   |_|   |_____\___/  \_/\_/

  Capital Deployment Scheduler
  v0.1.0 - Paper Mode
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        fast_tick_ms = cfg.scheduler.fast_tick_ms,
        market_tick_ms = cfg.scheduler.market_tick_ms,
        metrics_tick_ms = cfg.scheduler.metrics_tick_ms,
        full_sync_secs = cfg.scheduler.full_sync_secs,
        auto_deploy = cfg.auto_deploy.enabled,
        "CAPFLOW starting up"
    );

    // -- Wire components --------------------------------------------------

    let store = Arc::new(StateStore::new(
        cfg.queue.clone(),
        cfg.idle_alert.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store),
        Arc::new(PaperRouter::new()),
        Arc::new(SnapshotScorer::new()),
        Arc::new(StaticBackend::demo()),
        cfg.auto_deploy.clone(),
        cfg.scheduler.clone(),
    ));

    // Seed authoritative state before the loops start so the first
    // metrics tick has something to report.
    scheduler.full_sync_once().await;

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(
            Arc::clone(&store),
            scheduler.auto_deploy(),
        ));
        dashboard::spawn_dashboard(state, cfg.dashboard.port)?;
    }

    scheduler.start(false).await;

    // -- Run until Ctrl-C --------------------------------------------------

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    scheduler.stop().await;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("capflow=info"));

    let json_logging = std::env::var("CAPFLOW_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}
