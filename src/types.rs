//! Shared types for the CAPFLOW scheduler.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that engine, store, exchange,
//! and dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Lifecycle status of a trading bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStatus {
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotStatus::Running => write!(f, "RUNNING"),
            BotStatus::Paused => write!(f, "PAUSED"),
            BotStatus::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Lifecycle status of a deployment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl OrderStatus {
    /// Whether the order still occupies the queue ("open" = pending or
    /// executing). Failed orders linger only for observability.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Executing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Executing => write!(f, "EXECUTING"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Failed => write!(f, "FAILED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bots & positions (full-sync inputs)
// ---------------------------------------------------------------------------

/// A trading bot with capital allocated to it. Synced from the external
/// state backend; only `Running` bots contribute to total capital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingBot {
    pub id: String,
    pub name: String,
    pub venue: String,
    pub status: BotStatus,
    pub allocated_capital: Decimal,
}

impl TradingBot {
    pub fn is_running(&self) -> bool {
        self.status == BotStatus::Running
    }
}

impl fmt::Display for TradingBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @{} ${:.2} ({})",
            self.id, self.name, self.venue, self.allocated_capital, self.status,
        )
    }
}

/// An open position held by one of the bots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub id: String,
    pub bot_id: String,
    pub symbol: String,
    pub venue: String,
    pub side: Direction,
    /// Capital committed at entry (value of the position when opened).
    pub entry_value: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl fmt::Display for OpenPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} @{} ${:.2}",
            self.id, self.side, self.symbol, self.venue, self.entry_value,
        )
    }
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

/// A scored trading opportunity produced by the external scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub symbol: String,
    pub venue: String,
    pub direction: Direction,
    /// Scorer confidence in [0, 1].
    pub confidence: f64,
    pub volatility: f64,
    /// Computed ranking priority; higher deploys first.
    pub priority: f64,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Whether this opportunity meets the configured confidence floor.
    pub fn qualifies(&self, min_confidence: f64) -> bool {
        self.confidence >= min_confidence
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @{} conf={:.0}% vol={:.2} prio={:.2}",
            self.direction,
            self.symbol,
            self.venue,
            self.confidence * 100.0,
            self.volatility,
            self.priority,
        )
    }
}

// ---------------------------------------------------------------------------
// Deployment orders
// ---------------------------------------------------------------------------

/// A capital-deployment order owned by the deployment queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentOrder {
    pub id: Uuid,
    pub symbol: String,
    pub venue: String,
    pub side: Direction,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Set when the order transitions to `Executing`.
    pub executing_since: Option<DateTime<Utc>>,
    /// Set when the order transitions to `Failed`.
    pub failed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl DeploymentOrder {
    pub fn new(symbol: &str, venue: &str, side: Direction, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            venue: venue.to_string(),
            side,
            amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            executing_since: None,
            failed_at: None,
            failure_reason: None,
        }
    }

    /// How long this order has been executing, in milliseconds.
    /// Returns 0 for orders that never started executing.
    pub fn execution_age_ms(&self, now: DateTime<Utc>) -> i64 {
        self.executing_since
            .map(|since| (now - since).num_milliseconds())
            .unwrap_or(0)
    }
}

impl fmt::Display for DeploymentOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @{} ${:.2} [{}]",
            self.status, self.side, self.symbol, self.venue, self.amount, self.id,
        )
    }
}

// ---------------------------------------------------------------------------
// Capital metrics
// ---------------------------------------------------------------------------

/// Per-venue capital breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueCapital {
    pub deployed: Decimal,
    pub positions: usize,
}

/// Derived snapshot of capital allocation. Never persisted authoritatively;
/// recomputed on every metrics tick from bots and open positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalMetrics {
    pub total_capital: Decimal,
    pub deployed_capital: Decimal,
    /// `max(0, total − deployed)`.
    pub idle_funds: Decimal,
    /// Deployed as a percentage of total, in [0, 100]. 0 when total is 0.
    pub utilization_pct: f64,
    pub by_venue: HashMap<String, VenueCapital>,
    pub computed_at: DateTime<Utc>,
}

impl Default for CapitalMetrics {
    fn default() -> Self {
        Self {
            total_capital: Decimal::ZERO,
            deployed_capital: Decimal::ZERO,
            idle_funds: Decimal::ZERO,
            utilization_pct: 0.0,
            by_venue: HashMap::new(),
            computed_at: Utc::now(),
        }
    }
}

impl fmt::Display for CapitalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total=${:.2} deployed=${:.2} idle=${:.2} util={:.1}%",
            self.total_capital, self.deployed_capital, self.idle_funds, self.utilization_pct,
        )
    }
}

impl CapitalMetrics {
    /// Idle funds as f64 for score math. Decimal stays authoritative for
    /// all sizing decisions.
    pub fn idle_funds_f64(&self) -> f64 {
        self.idle_funds.to_f64().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Execution & efficiency records
// ---------------------------------------------------------------------------

/// Outcome of a single order submission, kept in a bounded ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub trade_id: Uuid,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// One point of efficiency-score history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EfficiencyRecord {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

/// Direction of the efficiency score over the recent history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencyTrend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for EfficiencyTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EfficiencyTrend::Improving => write!(f, "improving"),
            EfficiencyTrend::Stable => write!(f, "stable"),
            EfficiencyTrend::Declining => write!(f, "declining"),
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts & events
// ---------------------------------------------------------------------------

/// Payload emitted when the idle-alert machine fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleAlert {
    pub triggered_at: DateTime<Utc>,
    pub idle_funds: Decimal,
    pub utilization_pct: f64,
    /// How long the idle condition persisted before firing.
    pub idle_for_ms: i64,
}

impl fmt::Display for IdleAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "idle funds ${:.2} (util {:.1}%) for {}s",
            self.idle_funds,
            self.utilization_pct,
            self.idle_for_ms / 1000,
        )
    }
}

/// State-change notifications broadcast to observers (dashboard, UI, tests).
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    MetricsUpdated(CapitalMetrics),
    QueueChanged { open: usize, failed: usize },
    IdleAlert(IdleAlert),
    EfficiencyUpdated { score: f64, trend: EfficiencyTrend },
    OrderSettled { order_id: Uuid, success: bool },
}

// ---------------------------------------------------------------------------
// Auto-deploy configuration
// ---------------------------------------------------------------------------

/// Deploy-decision parameters. Read at the start of each fast tick;
/// changes take effect on the next tick, never mid-decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDeployConfig {
    pub enabled: bool,
    pub min_idle_funds: Decimal,
    pub max_positions: usize,
    /// Minimum scorer confidence in [0, 1].
    pub min_confidence: f64,
    /// Ceiling on the amount committed per deployment.
    pub per_trade_cap: Decimal,
    #[serde(default)]
    pub preferred_venues: Vec<String>,
    #[serde(default)]
    pub excluded_symbols: Vec<String>,
}

impl Default for AutoDeployConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_idle_funds: Decimal::from(50),
            max_positions: 5,
            min_confidence: 0.7,
            per_trade_cap: Decimal::from(100),
            preferred_venues: Vec::new(),
            excluded_symbols: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

/// Latest externally-supplied price/volume view for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolTick {
    pub price: f64,
    pub volume_24h: f64,
    pub change_24h_pct: f64,
}

/// Snapshot of the market consumed by the market tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticks: HashMap<String, SymbolTick>,
    pub taken_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(ticks: HashMap<String, SymbolTick>) -> Self {
        Self {
            ticks,
            taken_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for CAPFLOW.
#[derive(Debug, thiserror::Error)]
pub enum CapflowError {
    #[error("Order submission failed ({venue}): {message}")]
    Submission { venue: String, message: String },

    #[error("State backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
