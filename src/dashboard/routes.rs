//! Dashboard API route handlers.
//!
//! All endpoints return JSON. Handlers take read locks on the world and
//! never block on anything else.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::StateStore;
use crate::types::{
    AutoDeployConfig, DeploymentOrder, EfficiencyRecord, IdleAlert, Opportunity,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub store: Arc<StateStore>,
    pub auto_deploy: Arc<RwLock<AutoDeployConfig>>,
}

impl DashboardState {
    pub fn new(store: Arc<StateStore>, auto_deploy: Arc<RwLock<AutoDeployConfig>>) -> Self {
        Self { store, auto_deploy }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CapitalResponse {
    pub total_capital: String,
    pub deployed_capital: String,
    pub idle_funds: String,
    pub utilization_pct: f64,
    pub by_venue: Vec<VenueRow>,
    pub last_full_sync: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueRow {
    pub venue: String,
    pub deployed: String,
    pub positions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    pub open: usize,
    pub failed: usize,
    pub executing: Option<DeploymentOrder>,
    pub items: Vec<DeploymentOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyResponse {
    pub score: f64,
    pub trend: String,
    pub history: Vec<EfficiencyRecord>,
    pub avg_execution_time_ms: f64,
    pub success_rate: f64,
    pub trades_per_minute: usize,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/capital
pub async fn get_capital(State(state): State<AppState>) -> Json<CapitalResponse> {
    let world = state.store.read().await;
    let mut by_venue: Vec<VenueRow> = world
        .capital
        .by_venue
        .iter()
        .map(|(venue, v)| VenueRow {
            venue: venue.clone(),
            deployed: format!("{:.2}", v.deployed),
            positions: v.positions,
        })
        .collect();
    by_venue.sort_by(|a, b| a.venue.cmp(&b.venue));

    Json(CapitalResponse {
        total_capital: format!("{:.2}", world.capital.total_capital),
        deployed_capital: format!("{:.2}", world.capital.deployed_capital),
        idle_funds: format!("{:.2}", world.capital.idle_funds),
        utilization_pct: world.capital.utilization_pct,
        by_venue,
        last_full_sync: world.last_full_sync.map(|t| t.to_rfc3339()),
    })
}

/// GET /api/queue
pub async fn get_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    let world = state.store.read().await;
    Json(QueueResponse {
        open: world.queue.open_count(),
        failed: world.queue.failed_count(),
        executing: world.queue.executing().cloned(),
        items: world.queue.items().to_vec(),
    })
}

/// GET /api/efficiency
pub async fn get_efficiency(State(state): State<AppState>) -> Json<EfficiencyResponse> {
    let world = state.store.read().await;
    Json(EfficiencyResponse {
        score: world.efficiency.latest().unwrap_or(0.0),
        trend: format!("{}", world.last_trend),
        history: world.efficiency.history().to_vec(),
        avg_execution_time_ms: world.exec_stats.avg_execution_time_ms,
        success_rate: world.exec_stats.success_rate,
        trades_per_minute: world.exec_stats.trades_per_minute,
    })
}

/// GET /api/opportunities
pub async fn get_opportunities(State(state): State<AppState>) -> Json<Vec<Opportunity>> {
    let world = state.store.read().await;
    Json(world.ranker.ranked().to_vec())
}

/// GET /api/alerts
pub async fn get_alerts(State(state): State<AppState>) -> Json<Vec<IdleAlert>> {
    let world = state.store.read().await;
    Json(world.alerts.clone())
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<AutoDeployConfig> {
    let config = state.auto_deploy.read().await;
    Json(config.clone())
}

/// PUT /api/config: replace the deploy parameters. The scheduler picks
/// them up on its next fast tick.
pub async fn put_config(
    State(state): State<AppState>,
    Json(new_config): Json<AutoDeployConfig>,
) -> Json<AutoDeployConfig> {
    let mut config = state.auto_deploy.write().await;
    *config = new_config;
    Json(config.clone())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
