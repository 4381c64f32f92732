//! End-to-end scheduler scenarios.
//!
//! Each test drives the tick bodies by hand so timing stays deterministic,
//! with the mock exchange standing in for the venue and the state store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;

use capflow::config::{IdleAlertConfig, QueueConfig, SchedulerConfig};
use capflow::engine::scheduler::Scheduler;
use capflow::signal::OpportunityScorer;
use capflow::store::StateStore;
use capflow::types::{AutoDeployConfig, Direction, MarketSnapshot, Opportunity};

use super::mock_exchange::{bot, position, MockExchange};

/// Scorer that returns the same candidates on every scan.
struct FixedScorer(Vec<Opportunity>);

impl OpportunityScorer for FixedScorer {
    fn score(&self, _snapshot: &MarketSnapshot, _config: &AutoDeployConfig) -> Vec<Opportunity> {
        self.0.clone()
    }
}

fn deploy_config() -> AutoDeployConfig {
    AutoDeployConfig {
        enabled: true,
        ..AutoDeployConfig::default()
    }
}

fn candidate(symbol: &str, confidence: f64, priority: f64) -> Opportunity {
    Opportunity {
        symbol: symbol.to_string(),
        venue: "binance".to_string(),
        direction: Direction::Long,
        confidence,
        volatility: 2.0,
        priority,
        detected_at: Utc::now(),
    }
}

fn build_scheduler(
    exchange: Arc<MockExchange>,
    candidates: Vec<Opportunity>,
    queue_config: QueueConfig,
    idle_config: IdleAlertConfig,
    auto_deploy: AutoDeployConfig,
) -> (Arc<Scheduler>, Arc<StateStore>) {
    let store = Arc::new(StateStore::new(queue_config, idle_config));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store),
        Arc::clone(&exchange) as Arc<dyn capflow::exchange::OrderRouter>,
        Arc::new(FixedScorer(candidates)),
        exchange,
        auto_deploy,
        SchedulerConfig::default(),
    ));
    (scheduler, store)
}

#[tokio::test]
async fn test_full_deploy_pipeline() {
    let exchange = Arc::new(MockExchange::new());
    let (scheduler, store) = build_scheduler(
        Arc::clone(&exchange),
        vec![candidate("BTCUSDT", 0.9, 92.0)],
        QueueConfig::default(),
        IdleAlertConfig::default(),
        deploy_config(),
    );

    scheduler.full_sync_once().await;
    scheduler.metrics_tick_once().await;
    scheduler.market_tick_once().await;
    scheduler.fast_tick_once().await;

    // Give the spawned submission a moment to settle.
    tokio::time::sleep(Duration::from_millis(30)).await;

    let submitted = exchange.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].symbol, "BTCUSDT");
    // min(idle 1000, per-trade cap 100)
    assert_eq!(submitted[0].amount, dec!(100));

    let world = store.read().await;
    assert!(world.queue.is_empty(), "completed order removed from queue");
    assert_eq!(world.exec_stats.len(), 1);
    assert!((world.exec_stats.success_rate - 1.0).abs() < f64::EPSILON);
    assert!(world.ranker.is_empty(), "ranker cleared after deploy");
}

#[tokio::test]
async fn test_failed_submission_retained_then_purged() {
    let exchange = Arc::new(MockExchange::new());
    exchange.set_error("insufficient margin");
    let (scheduler, store) = build_scheduler(
        Arc::clone(&exchange),
        vec![candidate("BTCUSDT", 0.9, 92.0)],
        QueueConfig {
            execution_timeout_ms: 10_000,
            failed_grace_ms: 50,
        },
        IdleAlertConfig::default(),
        deploy_config(),
    );

    scheduler.full_sync_once().await;
    scheduler.metrics_tick_once().await;
    scheduler.market_tick_once().await;
    scheduler.fast_tick_once().await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    {
        let world = store.read().await;
        assert_eq!(world.queue.failed_count(), 1);
        assert!(world.queue.items()[0]
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("insufficient margin"));
        assert!(world.exec_stats.success_rate.abs() < f64::EPSILON);
    }

    // Past the grace period the next fast tick purges the failure. The
    // ranker was cleared on enqueue, so no new decision interferes.
    tokio::time::sleep(Duration::from_millis(60)).await;
    scheduler.fast_tick_once().await;

    let world = store.read().await;
    assert_eq!(world.queue.failed_count(), 0);
    assert!(world.queue.is_empty());
}

#[tokio::test]
async fn test_stuck_submission_evicted() {
    // A venue that never answers within the timeout.
    let exchange = Arc::new(MockExchange::with_latency(Duration::from_secs(60)));
    let (scheduler, store) = build_scheduler(
        Arc::clone(&exchange),
        vec![candidate("BTCUSDT", 0.9, 92.0)],
        QueueConfig {
            execution_timeout_ms: 100,
            failed_grace_ms: 5_000,
        },
        IdleAlertConfig::default(),
        deploy_config(),
    );

    scheduler.full_sync_once().await;
    scheduler.metrics_tick_once().await;
    scheduler.market_tick_once().await;
    scheduler.fast_tick_once().await;

    {
        let world = store.read().await;
        assert!(world.queue.executing().is_some(), "order in flight");
    }

    // Wait past the execution timeout, then let the next tick recover.
    tokio::time::sleep(Duration::from_millis(150)).await;
    scheduler.fast_tick_once().await;

    let world = store.read().await;
    assert!(world.queue.executing().is_none(), "stuck order evicted");
    assert_eq!(world.exec_stats.len(), 1);
    assert!(
        world.exec_stats.success_rate.abs() < f64::EPSILON,
        "eviction recorded as a failed execution"
    );
}

#[tokio::test]
async fn test_idle_alert_fires_once_then_rearms() {
    let exchange = Arc::new(MockExchange::new());
    // Fully idle roster, 100% of capital unallocated.
    exchange.set_roster(vec![bot("alpha", dec!(1_000))], Vec::new());
    let (scheduler, store) = build_scheduler(
        Arc::clone(&exchange),
        Vec::new(),
        QueueConfig::default(),
        IdleAlertConfig {
            threshold_amount: 100.0,
            threshold_percent: 80.0,
            max_idle_duration_ms: 100,
        },
        AutoDeployConfig {
            enabled: false,
            ..AutoDeployConfig::default()
        },
    );

    scheduler.full_sync_once().await;

    // First tick starts the idle timer, no alert yet.
    scheduler.metrics_tick_once().await;
    assert!(store.read().await.alerts.is_empty());

    // Breach persists past the duration, alert fires exactly once.
    tokio::time::sleep(Duration::from_millis(120)).await;
    scheduler.metrics_tick_once().await;
    assert_eq!(store.read().await.alerts.len(), 1);

    // Immediately after firing the machine has reset; no duplicate.
    scheduler.metrics_tick_once().await;
    assert_eq!(store.read().await.alerts.len(), 1);

    // A fresh continuous breach re-arms it.
    tokio::time::sleep(Duration::from_millis(120)).await;
    scheduler.metrics_tick_once().await;
    assert_eq!(store.read().await.alerts.len(), 2);
}

#[tokio::test]
async fn test_position_limit_blocks_deploys() {
    let exchange = Arc::new(MockExchange::new());
    let positions = (0..5)
        .map(|i| position(&format!("p{i}"), "alpha", dec!(50)))
        .collect();
    exchange.set_roster(vec![bot("alpha", dec!(1_000))], positions);
    let (scheduler, store) = build_scheduler(
        Arc::clone(&exchange),
        vec![candidate("BTCUSDT", 0.9, 92.0)],
        QueueConfig::default(),
        IdleAlertConfig::default(),
        deploy_config(),
    );

    scheduler.full_sync_once().await;
    scheduler.metrics_tick_once().await;
    scheduler.market_tick_once().await;
    scheduler.fast_tick_once().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(exchange.submitted().is_empty());
    assert!(store.read().await.queue.is_empty());
}

#[tokio::test]
async fn test_dashboard_reads_live_state() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use capflow::dashboard::routes::DashboardState;
    use tower::ServiceExt;

    let exchange = Arc::new(MockExchange::new());
    exchange.set_roster(
        vec![bot("alpha", dec!(1_000))],
        vec![position("p1", "alpha", dec!(400))],
    );
    let (scheduler, store) = build_scheduler(
        Arc::clone(&exchange),
        Vec::new(),
        QueueConfig::default(),
        IdleAlertConfig::default(),
        deploy_config(),
    );

    scheduler.full_sync_once().await;
    scheduler.metrics_tick_once().await;

    let state = Arc::new(DashboardState::new(store, scheduler.auto_deploy()));
    let app = capflow::dashboard::build_router(state);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/capital")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_capital"].as_str().unwrap(), "1000.00");
    assert_eq!(json["deployed_capital"].as_str().unwrap(), "400.00");
    assert!((json["utilization_pct"].as_f64().unwrap() - 40.0).abs() < 1e-9);
}
