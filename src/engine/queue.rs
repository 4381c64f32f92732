//! Deployment queue.
//!
//! FIFO for submission order with out-of-band removal. Enforces the
//! single-in-flight invariant: at most one order is `Executing` at any
//! time. Hung submissions are recovered by stuck-item eviction, which is
//! the system's only timeout on the order-routing collaborator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::types::{DeploymentOrder, Direction, OrderStatus};

#[derive(Debug)]
pub struct DeploymentQueue {
    config: QueueConfig,
    items: Vec<DeploymentOrder>,
}

impl DeploymentQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
        }
    }

    /// Enqueue a new deployment order. Refuses a symbol that already has a
    /// pending or executing order; duplicate decisions for the same symbol
    /// are dropped rather than stacked.
    pub fn enqueue(
        &mut self,
        symbol: &str,
        venue: &str,
        side: Direction,
        amount: Decimal,
    ) -> Option<Uuid> {
        if self
            .items
            .iter()
            .any(|o| o.symbol == symbol && o.status.is_open())
        {
            debug!(symbol, "duplicate deployment suppressed");
            return None;
        }

        let order = DeploymentOrder::new(symbol, venue, side, amount);
        let id = order.id;
        info!(order = %order, "deployment order queued");
        self.items.push(order);
        Some(id)
    }

    /// Claim the next pending order for execution. Returns `None` when an
    /// order is already executing (single-in-flight) or nothing is pending.
    /// The returned clone is what the caller submits outside the lock.
    pub fn claim_next(&mut self, now: DateTime<Utc>) -> Option<DeploymentOrder> {
        if self.executing().is_some() {
            return None;
        }
        let item = self
            .items
            .iter_mut()
            .find(|o| o.status == OrderStatus::Pending)?;
        item.status = OrderStatus::Executing;
        item.executing_since = Some(now);
        Some(item.clone())
    }

    /// Settle a claimed order: completed orders are removed immediately,
    /// failed ones are marked and retained for the grace period.
    pub fn settle(&mut self, id: Uuid, outcome: Result<(), String>, now: DateTime<Utc>) {
        let Some(idx) = self.items.iter().position(|o| o.id == id) else {
            // Evicted while the submission was in flight; nothing to record.
            debug!(order_id = %id, "settle for unknown order ignored");
            return;
        };

        match outcome {
            Ok(()) => {
                let order = self.items.remove(idx);
                info!(order_id = %order.id, symbol = %order.symbol, "deployment completed");
            }
            Err(reason) => {
                let order = &mut self.items[idx];
                order.status = OrderStatus::Failed;
                order.failed_at = Some(now);
                order.failure_reason = Some(reason.clone());
                warn!(order_id = %order.id, symbol = %order.symbol, reason, "deployment failed");
            }
        }
    }

    /// Force-remove executing orders older than the execution timeout.
    /// Restores the single-in-flight invariant when a collaborator hangs.
    /// Returns the evicted orders so the caller can record failures.
    pub fn evict_stuck(&mut self, now: DateTime<Utc>) -> Vec<DeploymentOrder> {
        let timeout = self.config.execution_timeout_ms;
        let mut evicted = Vec::new();
        self.items.retain(|o| {
            let stuck = o.status == OrderStatus::Executing && o.execution_age_ms(now) > timeout;
            if stuck {
                evicted.push(o.clone());
            }
            !stuck
        });
        for order in &evicted {
            warn!(
                order_id = %order.id,
                symbol = %order.symbol,
                age_ms = order.execution_age_ms(now),
                "stuck deployment evicted"
            );
        }
        evicted
    }

    /// Drop failed orders whose grace period has elapsed.
    pub fn purge_failed(&mut self, now: DateTime<Utc>) -> usize {
        let grace = self.config.failed_grace_ms;
        let before = self.items.len();
        self.items.retain(|o| {
            o.status != OrderStatus::Failed
                || o.failed_at
                    .map(|t| (now - t).num_milliseconds() <= grace)
                    .unwrap_or(true)
        });
        before - self.items.len()
    }

    /// The currently executing order, if any.
    pub fn executing(&self) -> Option<&DeploymentOrder> {
        self.items.iter().find(|o| o.status == OrderStatus::Executing)
    }

    /// Whether any order is pending or executing.
    pub fn has_open(&self) -> bool {
        self.items.iter().any(|o| o.status.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.items.iter().filter(|o| o.status.is_open()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|o| o.status == OrderStatus::Failed)
            .count()
    }

    /// All queue items in FIFO order (including retained failures).
    pub fn items(&self) -> &[DeploymentOrder] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
