//! Opportunity scoring.
//!
//! The scheduler consumes an `OpportunityScorer` on the market cadence.
//! The contract is small: given the latest snapshot and the operator's
//! deploy preferences, return scored candidates. `SnapshotScorer` is the
//! built-in momentum heuristic used in paper mode; a live deployment can
//! plug in anything else.

use chrono::Utc;
use tracing::trace;

use crate::types::{AutoDeployConfig, Direction, MarketSnapshot, Opportunity};

/// Symbols scanned when no market snapshot has arrived yet. Keeps the
/// ranker populated so the dashboard never shows an empty scan state.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT", "XRPUSDT", "ADAUSDT",
];

#[cfg_attr(test, mockall::automock)]
pub trait OpportunityScorer: Send + Sync {
    /// Score the snapshot into deployment candidates. Excluded symbols
    /// must not appear in the result; preferred venues are a hint for
    /// the venue field.
    fn score(&self, snapshot: &MarketSnapshot, config: &AutoDeployConfig) -> Vec<Opportunity>;
}

/// Momentum heuristic over 24h change. Confidence grows with the size of
/// the move and saturates at 1.0; direction follows the sign.
pub struct SnapshotScorer;

impl SnapshotScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SnapshotScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl OpportunityScorer for SnapshotScorer {
    fn score(&self, snapshot: &MarketSnapshot, config: &AutoDeployConfig) -> Vec<Opportunity> {
        let venue = config
            .preferred_venues
            .first()
            .cloned()
            .unwrap_or_else(|| "binance".to_string());
        let now = Utc::now();

        let mut out = Vec::new();
        for (symbol, tick) in &snapshot.ticks {
            if config.excluded_symbols.iter().any(|s| s == symbol) {
                continue;
            }
            let change = tick.change_24h_pct;
            let direction = if change >= 0.0 {
                Direction::Long
            } else {
                Direction::Short
            };
            // A 10% daily move maps to full confidence.
            let confidence = (change.abs() / 10.0).min(1.0);
            let volatility = change.abs();
            let priority = confidence * 100.0 + volatility;
            trace!(symbol, confidence, priority, "scored opportunity");
            out.push(Opportunity {
                symbol: symbol.clone(),
                venue: venue.clone(),
                direction,
                confidence,
                volatility,
                priority,
                detected_at: now,
            });
        }
        out
    }
}
