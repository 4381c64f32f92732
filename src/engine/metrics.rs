//! Metrics aggregator for capital and execution statistics.
//!
//! Capital metrics are a pure function over the current bots and open
//! positions; they are recomputed on every metrics tick and never stored
//! authoritatively. Execution stats hold a bounded ring of recent
//! submission outcomes and recompute their derived figures on append.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;

use crate::types::{CapitalMetrics, ExecutionRecord, OpenPosition, TradingBot, VenueCapital};

/// Ring-buffer bound for execution records.
pub const MAX_EXECUTION_RECORDS: usize = 50;

/// Trailing window for the trades-per-minute figure.
const TRADES_WINDOW_MS: i64 = 60_000;

// ---------------------------------------------------------------------------
// Capital metrics
// ---------------------------------------------------------------------------

/// Derive capital metrics from the current bots and open positions.
///
/// `total` counts only running bots; `deployed` sums entry values of all
/// open positions. Utilization is 0 when total is 0, never NaN.
pub fn compute_capital_metrics(bots: &[TradingBot], positions: &[OpenPosition]) -> CapitalMetrics {
    let total_capital: Decimal = bots
        .iter()
        .filter(|b| b.is_running())
        .map(|b| b.allocated_capital)
        .sum();

    let deployed_capital: Decimal = positions.iter().map(|p| p.entry_value).sum();

    let idle_funds = (total_capital - deployed_capital).max(Decimal::ZERO);

    let utilization_pct = if total_capital.is_zero() {
        0.0
    } else {
        use rust_decimal::prelude::ToPrimitive;
        let ratio = (deployed_capital / total_capital)
            .to_f64()
            .unwrap_or(0.0);
        (ratio * 100.0).clamp(0.0, 100.0)
    };

    let mut by_venue: std::collections::HashMap<String, VenueCapital> =
        std::collections::HashMap::new();
    for pos in positions {
        let entry = by_venue.entry(pos.venue.clone()).or_default();
        entry.deployed += pos.entry_value;
        entry.positions += 1;
    }

    CapitalMetrics {
        total_capital,
        deployed_capital,
        idle_funds,
        utilization_pct,
        by_venue,
        computed_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Execution stats
// ---------------------------------------------------------------------------

/// Bounded history of order-submission outcomes with derived figures.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    records: VecDeque<ExecutionRecord>,
    pub avg_execution_time_ms: f64,
    /// Fraction of all recorded submissions that succeeded, in [0, 1].
    pub success_rate: f64,
    /// Records with a timestamp inside the trailing 60-second window.
    pub trades_per_minute: usize,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and recompute every derived figure.
    pub fn record(&mut self, record: ExecutionRecord) {
        self.records.push_back(record);
        while self.records.len() > MAX_EXECUTION_RECORDS {
            self.records.pop_front();
        }
        self.recompute(Utc::now());
    }

    /// Recompute derived figures relative to `now` (the trades-per-minute
    /// window is wall-clock based).
    pub fn recompute(&mut self, now: DateTime<Utc>) {
        let successes: Vec<&ExecutionRecord> =
            self.records.iter().filter(|r| r.success).collect();

        self.avg_execution_time_ms = if successes.is_empty() {
            0.0
        } else {
            successes.iter().map(|r| r.duration_ms as f64).sum::<f64>() / successes.len() as f64
        };

        self.success_rate = if self.records.is_empty() {
            0.0
        } else {
            successes.len() as f64 / self.records.len() as f64
        };

        self.trades_per_minute = self
            .records
            .iter()
            .filter(|r| (now - r.timestamp).num_milliseconds() <= TRADES_WINDOW_MS)
            .count();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn recent(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
