//! Mock exchange for integration testing.
//!
//! Provides deterministic `OrderRouter` and `StateBackend` implementations
//! backed by in-memory state. Latency, failures, and the roster are all
//! controllable from test code.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use capflow::exchange::{OrderRequest, OrderRouter, StateBackend, VenueReceipt};
use capflow::types::{BotStatus, CapflowError, Direction, OpenPosition, TradingBot};

/// A mock exchange with fully controllable behaviour.
pub struct MockExchange {
    latency: Duration,
    /// If set, all submissions fail with this message.
    force_error: Arc<Mutex<Option<String>>>,
    submitted: Arc<Mutex<Vec<OrderRequest>>>,
    bots: Arc<Mutex<Vec<TradingBot>>>,
    positions: Arc<Mutex<Vec<OpenPosition>>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(1),
            force_error: Arc::new(Mutex::new(None)),
            submitted: Arc::new(Mutex::new(Vec::new())),
            bots: Arc::new(Mutex::new(default_bots())),
            positions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::new()
        }
    }

    /// Force all subsequent submissions to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn set_roster(&self, bots: Vec<TradingBot>, positions: Vec<OpenPosition>) {
        *self.bots.lock().unwrap() = bots;
        *self.positions.lock().unwrap() = positions;
    }

    /// Requests that reached the venue, in submission order.
    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRouter for MockExchange {
    async fn submit(&self, request: &OrderRequest) -> Result<VenueReceipt, CapflowError> {
        tokio::time::sleep(self.latency).await;

        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(CapflowError::Submission {
                venue: request.venue.clone(),
                message: msg,
            });
        }

        self.submitted.lock().unwrap().push(request.clone());
        Ok(VenueReceipt {
            venue_order_id: format!("mock-{}", Uuid::new_v4()),
            accepted_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[async_trait]
impl StateBackend for MockExchange {
    async fn fetch_bots(&self) -> Result<Vec<TradingBot>, CapflowError> {
        Ok(self.bots.lock().unwrap().clone())
    }

    async fn fetch_positions(&self) -> Result<Vec<OpenPosition>, CapflowError> {
        Ok(self.positions.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

pub fn bot(id: &str, capital: Decimal) -> TradingBot {
    TradingBot {
        id: id.to_string(),
        name: format!("bot-{id}"),
        venue: "binance".to_string(),
        status: BotStatus::Running,
        allocated_capital: capital,
    }
}

pub fn position(id: &str, bot_id: &str, entry_value: Decimal) -> OpenPosition {
    OpenPosition {
        id: id.to_string(),
        bot_id: bot_id.to_string(),
        symbol: "BTCUSDT".to_string(),
        venue: "binance".to_string(),
        side: Direction::Long,
        entry_value,
        opened_at: Utc::now(),
    }
}

fn default_bots() -> Vec<TradingBot> {
    vec![bot("alpha", dec!(600)), bot("beta", dec!(400))]
}
