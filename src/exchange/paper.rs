//! Paper-trading implementations of the exchange seams.
//!
//! `PaperRouter` acknowledges every order after a small simulated latency;
//! `StaticBackend` serves a fixed roster so the scheduler can run
//! stand-alone with no live connectivity.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use crate::exchange::{OrderRequest, OrderRouter, StateBackend, VenueReceipt};
use crate::types::{BotStatus, CapflowError, Direction, OpenPosition, TradingBot};

/// Acknowledges every order. Latency is fixed per instance.
pub struct PaperRouter {
    latency: Duration,
}

impl PaperRouter {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(25),
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for PaperRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRouter for PaperRouter {
    async fn submit(&self, request: &OrderRequest) -> Result<VenueReceipt, CapflowError> {
        tokio::time::sleep(self.latency).await;
        let receipt = VenueReceipt {
            venue_order_id: format!("paper-{}", Uuid::new_v4()),
            accepted_at: Utc::now(),
        };
        info!(
            symbol = %request.symbol,
            venue = %request.venue,
            amount = %request.amount,
            venue_order_id = %receipt.venue_order_id,
            "paper order filled"
        );
        Ok(receipt)
    }

    fn name(&self) -> &str {
        "paper"
    }
}

/// Serves a fixed set of bots and positions.
pub struct StaticBackend {
    bots: Vec<TradingBot>,
    positions: Vec<OpenPosition>,
}

impl StaticBackend {
    pub fn new(bots: Vec<TradingBot>, positions: Vec<OpenPosition>) -> Self {
        Self { bots, positions }
    }

    /// A small demo roster: two running bots, one position already open.
    pub fn demo() -> Self {
        let bots = vec![
            TradingBot {
                id: "demo-alpha".to_string(),
                name: "Alpha Momentum".to_string(),
                venue: "binance".to_string(),
                status: BotStatus::Running,
                allocated_capital: dec!(600),
            },
            TradingBot {
                id: "demo-beta".to_string(),
                name: "Beta Reversion".to_string(),
                venue: "bybit".to_string(),
                status: BotStatus::Running,
                allocated_capital: dec!(400),
            },
        ];
        let positions = vec![OpenPosition {
            id: "demo-pos-1".to_string(),
            bot_id: "demo-alpha".to_string(),
            symbol: "BTCUSDT".to_string(),
            venue: "binance".to_string(),
            side: Direction::Long,
            entry_value: dec!(250),
            opened_at: Utc::now(),
        }];
        Self::new(bots, positions)
    }
}

#[async_trait]
impl StateBackend for StaticBackend {
    async fn fetch_bots(&self) -> Result<Vec<TradingBot>, CapflowError> {
        Ok(self.bots.clone())
    }

    async fn fetch_positions(&self) -> Result<Vec<OpenPosition>, CapflowError> {
        Ok(self.positions.clone())
    }
}
