//! Exchange-facing seams.
//!
//! `OrderRouter` submits deployment orders to a venue; `StateBackend`
//! supplies the authoritative bot roster and open positions on the full
//! sync cadence. Both are trait objects so the scheduler runs identically
//! against live connectors and the paper implementations.

pub mod paper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CapflowError, Direction, OpenPosition, TradingBot};

/// A deployment order as handed to a venue connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub venue: String,
    pub side: Direction,
    pub amount: Decimal,
}

/// Venue acknowledgement for a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueReceipt {
    pub venue_order_id: String,
    pub accepted_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRouter: Send + Sync {
    /// Submit an order to the venue. May take arbitrarily long; the
    /// caller enforces its own timeout via stuck-item eviction.
    async fn submit(&self, request: &OrderRequest) -> Result<VenueReceipt, CapflowError>;

    fn name(&self) -> &str;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateBackend: Send + Sync {
    async fn fetch_bots(&self) -> Result<Vec<TradingBot>, CapflowError>;

    async fn fetch_positions(&self) -> Result<Vec<OpenPosition>, CapflowError>;
}
