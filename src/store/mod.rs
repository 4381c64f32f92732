//! Shared scheduler state.
//!
//! One `RwLock` guards the whole world; tick bodies take the write lock
//! briefly and never hold it across I/O. Dashboard handlers take read
//! locks. State changes fan out on a broadcast channel for anything that
//! wants push updates.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::config::{IdleAlertConfig, QueueConfig};
use crate::engine::efficiency::EfficiencyScorer;
use crate::engine::idle_alert::IdleAlertMachine;
use crate::engine::metrics::ExecutionStats;
use crate::engine::queue::DeploymentQueue;
use crate::engine::ranker::OpportunityRanker;
use crate::types::{
    CapitalMetrics, EfficiencyTrend, IdleAlert, MarketSnapshot, OpenPosition, SchedulerEvent,
    TradingBot,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const MAX_ALERT_HISTORY: usize = 20;

/// Everything the scheduler mutates, under one lock.
pub struct WorldState {
    pub bots: Vec<TradingBot>,
    pub positions: Vec<OpenPosition>,
    pub market_snapshot: Option<MarketSnapshot>,
    pub ranker: OpportunityRanker,
    pub queue: DeploymentQueue,
    pub capital: CapitalMetrics,
    pub exec_stats: ExecutionStats,
    pub efficiency: EfficiencyScorer,
    pub idle_alert: IdleAlertMachine,
    pub alerts: Vec<IdleAlert>,
    pub last_trend: EfficiencyTrend,
    pub last_full_sync: Option<DateTime<Utc>>,
}

impl WorldState {
    fn new(queue_config: QueueConfig, idle_config: IdleAlertConfig) -> Self {
        Self {
            bots: Vec::new(),
            positions: Vec::new(),
            market_snapshot: None,
            ranker: OpportunityRanker::new(),
            queue: DeploymentQueue::new(queue_config),
            capital: CapitalMetrics::default(),
            exec_stats: ExecutionStats::new(),
            efficiency: EfficiencyScorer::new(),
            idle_alert: IdleAlertMachine::new(idle_config),
            alerts: Vec::new(),
            last_trend: EfficiencyTrend::Stable,
            last_full_sync: None,
        }
    }

    /// Record a fired alert, keeping only the most recent few.
    pub fn push_alert(&mut self, alert: IdleAlert) {
        self.alerts.push(alert);
        if self.alerts.len() > MAX_ALERT_HISTORY {
            let excess = self.alerts.len() - MAX_ALERT_HISTORY;
            self.alerts.drain(..excess);
        }
    }
}

pub struct StateStore {
    world: RwLock<WorldState>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl StateStore {
    pub fn new(queue_config: QueueConfig, idle_config: IdleAlertConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            world: RwLock::new(WorldState::new(queue_config, idle_config)),
            events,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, WorldState> {
        self.world.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, WorldState> {
        self.world.write().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    /// Publish an event. Lagging or absent subscribers are fine.
    pub fn publish(&self, event: SchedulerEvent) {
        if self.events.send(event).is_err() {
            debug!("no event subscribers");
        }
    }
}
