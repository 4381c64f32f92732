//! Capital-deployment scheduler.
//!
//! Four independently-cadenced loops over one shared world: the fast tick
//! drives queue hygiene and the deploy decision, the market tick re-ranks
//! opportunities, the metrics tick recomputes capital and efficiency, and
//! the full sync reconciles authoritative state from the backend. Only
//! full sync and order submission touch I/O; submission runs in its own
//! task so a slow venue never stalls a tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::engine::efficiency::ScoreInputs;
use crate::engine::metrics::compute_capital_metrics;
use crate::exchange::{OrderRequest, OrderRouter, StateBackend};
use crate::signal::{OpportunityScorer, DEFAULT_SYMBOLS};
use crate::store::{StateStore, WorldState};
use crate::types::{
    AutoDeployConfig, DeploymentOrder, ExecutionRecord, MarketSnapshot, OrderStatus,
    SchedulerEvent, SymbolTick,
};

pub struct Scheduler {
    store: Arc<StateStore>,
    router: Arc<dyn OrderRouter>,
    scorer: Arc<dyn OpportunityScorer>,
    backend: Arc<dyn StateBackend>,
    auto_deploy: Arc<RwLock<AutoDeployConfig>>,
    config: SchedulerConfig,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<StateStore>,
        router: Arc<dyn OrderRouter>,
        scorer: Arc<dyn OpportunityScorer>,
        backend: Arc<dyn StateBackend>,
        auto_deploy: AutoDeployConfig,
        config: SchedulerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            router,
            scorer,
            backend,
            auto_deploy: Arc::new(RwLock::new(auto_deploy)),
            config,
            started: AtomicBool::new(false),
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// The live deploy parameters. Edits apply from the next fast tick.
    pub fn auto_deploy(&self) -> Arc<RwLock<AutoDeployConfig>> {
        Arc::clone(&self.auto_deploy)
    }

    /// Replace the market snapshot consumed by the next market tick.
    pub async fn ingest_snapshot(&self, snapshot: MarketSnapshot) {
        let mut world = self.store.write().await;
        world.market_snapshot = Some(snapshot);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Spawn the four tick loops. Calling twice is a no-op. Auto-deploy is
    /// only flipped on when the caller asks for it explicitly.
    pub async fn start(self: &Arc<Self>, force_enable_auto_deploy: bool) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("scheduler already started");
            return;
        }
        let _ = self.shutdown.send(false);
        if force_enable_auto_deploy {
            let mut deploy = self.auto_deploy.write().await;
            if !deploy.enabled {
                info!("auto-deploy force-enabled on start");
                deploy.enabled = true;
            }
        }
        info!(
            fast_ms = self.config.fast_tick_ms,
            market_ms = self.config.market_tick_ms,
            metrics_ms = self.config.metrics_tick_ms,
            full_sync_s = self.config.full_sync_secs,
            "scheduler starting"
        );

        let mut handles = self.handles.lock().await;

        let scheduler = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.fast_tick());
            loop {
                tokio::select! {
                    _ = ticker.tick() => scheduler.fast_tick_once().await,
                    _ = stop.changed() => break,
                }
            }
        }));

        let scheduler = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.market_tick());
            loop {
                tokio::select! {
                    _ = ticker.tick() => scheduler.market_tick_once().await,
                    _ = stop.changed() => break,
                }
            }
        }));

        let scheduler = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.metrics_tick());
            loop {
                tokio::select! {
                    _ = ticker.tick() => scheduler.metrics_tick_once().await,
                    _ = stop.changed() => break,
                }
            }
        }));

        let scheduler = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.full_sync());
            loop {
                tokio::select! {
                    _ = ticker.tick() => scheduler.full_sync_once().await,
                    _ = stop.changed() => break,
                }
            }
        }));
    }

    /// Stop all loops and wait for them to finish. In-flight submissions
    /// that complete afterwards are discarded, not recorded.
    pub async fn stop(&self) {
        info!("scheduler stopping");
        let _ = self.shutdown.send(true);
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.started.store(false, Ordering::SeqCst);
        info!("scheduler stopped");
    }

    fn is_live(&self) -> bool {
        !*self.shutdown.borrow()
    }

    // -----------------------------------------------------------------------
    // Fast tick: queue hygiene, deploy decision, submission dispatch
    // -----------------------------------------------------------------------

    pub async fn fast_tick_once(self: &Arc<Self>) {
        let now = Utc::now();
        let deploy = self.auto_deploy.read().await.clone();

        let claimed = {
            let mut world = self.store.write().await;
            let state = &mut *world;

            let evicted = state.queue.evict_stuck(now);
            for order in &evicted {
                state.exec_stats.record(ExecutionRecord {
                    trade_id: order.id,
                    duration_ms: order.execution_age_ms(now).max(0) as u64,
                    timestamp: now,
                    success: false,
                });
                self.store.publish(SchedulerEvent::OrderSettled {
                    order_id: order.id,
                    success: false,
                });
            }
            let purged = state.queue.purge_failed(now);
            if !evicted.is_empty() || purged > 0 {
                self.publish_queue_changed(state);
            }

            if deploy.enabled {
                self.maybe_enqueue(state, &deploy);
            }

            state.queue.claim_next(now)
        };

        if let Some(order) = claimed {
            self.spawn_submission(order);
        }
    }

    /// One deploy decision per tick: enough idle funds, a free position
    /// slot, and a qualifying top candidate. A successful enqueue clears
    /// the ranker so the next decision waits for a fresh scan.
    fn maybe_enqueue(&self, state: &mut WorldState, deploy: &AutoDeployConfig) {
        if state.queue.executing().is_some() {
            return;
        }
        if state.capital.idle_funds < deploy.min_idle_funds {
            return;
        }
        if state.positions.len() >= deploy.max_positions {
            debug!(
                open = state.positions.len(),
                max = deploy.max_positions,
                "deploy skipped, position limit reached"
            );
            return;
        }
        let Some(candidate) = state.ranker.top_qualifying(deploy.min_confidence).cloned() else {
            return;
        };

        let amount = state.capital.idle_funds.min(deploy.per_trade_cap);
        if state
            .queue
            .enqueue(&candidate.symbol, &candidate.venue, candidate.direction, amount)
            .is_some()
        {
            info!(
                symbol = %candidate.symbol,
                venue = %candidate.venue,
                confidence = candidate.confidence,
                amount = %amount,
                "auto-deploy decision"
            );
            state.ranker.clear();
            self.publish_queue_changed(state);
        }
    }

    /// Submit a claimed order off the tick path. The wall clock of the
    /// whole submission becomes the execution duration.
    fn spawn_submission(self: &Arc<Self>, order: DeploymentOrder) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let request = OrderRequest {
                symbol: order.symbol.clone(),
                venue: order.venue.clone(),
                side: order.side,
                amount: order.amount,
            };
            let started = Instant::now();
            let result = scheduler.router.submit(&request).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            if !scheduler.is_live() {
                debug!(order_id = %order.id, "submission completed after shutdown, discarded");
                return;
            }

            let outcome = result.map(|_| ()).map_err(|e| e.to_string());
            let success = outcome.is_ok();
            let now = Utc::now();

            let mut world = scheduler.store.write().await;
            let state = &mut *world;
            // An eviction may have raced us; only a still-executing order
            // gets an execution record.
            let live = state
                .queue
                .items()
                .iter()
                .any(|o| o.id == order.id && o.status == OrderStatus::Executing);
            state.queue.settle(order.id, outcome, now);
            if live {
                state.exec_stats.record(ExecutionRecord {
                    trade_id: order.id,
                    duration_ms,
                    timestamp: now,
                    success,
                });
                scheduler.store.publish(SchedulerEvent::OrderSettled {
                    order_id: order.id,
                    success,
                });
                scheduler.publish_queue_changed(state);
            }
        });
    }

    fn publish_queue_changed(&self, state: &WorldState) {
        self.store.publish(SchedulerEvent::QueueChanged {
            open: state.queue.open_count(),
            failed: state.queue.failed_count(),
        });
    }

    // -----------------------------------------------------------------------
    // Market tick: re-rank opportunities
    // -----------------------------------------------------------------------

    pub async fn market_tick_once(&self) {
        let deploy = self.auto_deploy.read().await.clone();
        let mut world = self.store.write().await;
        let snapshot = world
            .market_snapshot
            .clone()
            .unwrap_or_else(default_snapshot);
        for opportunity in self.scorer.score(&snapshot, &deploy) {
            world.ranker.insert(opportunity);
        }
    }

    // -----------------------------------------------------------------------
    // Metrics tick: capital, idle alert, efficiency
    // -----------------------------------------------------------------------

    pub async fn metrics_tick_once(&self) {
        let now = Utc::now();
        let mut world = self.store.write().await;
        let state = &mut *world;

        state.capital = compute_capital_metrics(&state.bots, &state.positions);
        state.exec_stats.recompute(now);
        self.store
            .publish(SchedulerEvent::MetricsUpdated(state.capital.clone()));

        if let Some(alert) = state.idle_alert.evaluate(&state.capital, now) {
            self.store.publish(SchedulerEvent::IdleAlert(alert.clone()));
            state.push_alert(alert);
        }

        let inputs = ScoreInputs {
            utilization_pct: state.capital.utilization_pct,
            avg_execution_time_ms: state.exec_stats.avg_execution_time_ms,
            idle_since: state.idle_alert.counting_since(),
            max_idle_duration_ms: state.idle_alert.max_idle_duration_ms(),
        };
        let score = state.efficiency.score(inputs, now);
        let trend = state.efficiency.trend();
        state.last_trend = trend;
        self.store
            .publish(SchedulerEvent::EfficiencyUpdated { score, trend });
    }

    // -----------------------------------------------------------------------
    // Full sync: reconcile authoritative state
    // -----------------------------------------------------------------------

    pub async fn full_sync_once(&self) {
        let bots = match self.backend.fetch_bots().await {
            Ok(bots) => bots,
            Err(e) => {
                warn!(error = %e, "bot sync failed, keeping previous roster");
                return;
            }
        };
        let positions = match self.backend.fetch_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                warn!(error = %e, "position sync failed, keeping previous state");
                return;
            }
        };

        let mut world = self.store.write().await;
        debug!(
            bots = bots.len(),
            positions = positions.len(),
            "full sync applied"
        );
        world.bots = bots;
        world.positions = positions;
        world.last_full_sync = Some(Utc::now());
    }
}

/// Neutral snapshot over the default symbol set, used until a real one
/// arrives. Scores stay below any sensible confidence floor.
fn default_snapshot() -> MarketSnapshot {
    let ticks = DEFAULT_SYMBOLS
        .iter()
        .map(|s| {
            (
                s.to_string(),
                SymbolTick {
                    price: 0.0,
                    volume_24h: 0.0,
                    change_24h_pct: 0.5,
                },
            )
        })
        .collect();
    MarketSnapshot::new(ticks)
}
