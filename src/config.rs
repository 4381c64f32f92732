//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Intervals and timeouts default to the production cadences so a minimal
//! config file stays minimal.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::AutoDeployConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub auto_deploy: AutoDeployConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub idle_alert: IdleAlertConfig,
    pub dashboard: DashboardConfig,
}

/// Tick cadences for the four scheduler tasks.
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_fast_tick_ms")]
    pub fast_tick_ms: u64,
    #[serde(default = "default_market_tick_ms")]
    pub market_tick_ms: u64,
    #[serde(default = "default_metrics_tick_ms")]
    pub metrics_tick_ms: u64,
    #[serde(default = "default_full_sync_secs")]
    pub full_sync_secs: u64,
}

impl SchedulerConfig {
    pub fn fast_tick(&self) -> Duration {
        Duration::from_millis(self.fast_tick_ms)
    }

    pub fn market_tick(&self) -> Duration {
        Duration::from_millis(self.market_tick_ms)
    }

    pub fn metrics_tick(&self) -> Duration {
        Duration::from_millis(self.metrics_tick_ms)
    }

    pub fn full_sync(&self) -> Duration {
        Duration::from_secs(self.full_sync_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: default_fast_tick_ms(),
            market_tick_ms: default_market_tick_ms(),
            metrics_tick_ms: default_metrics_tick_ms(),
            full_sync_secs: default_full_sync_secs(),
        }
    }
}

/// Deployment-queue timeouts.
#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Executing items older than this are force-evicted.
    #[serde(default = "default_execution_timeout_ms")]
    pub execution_timeout_ms: i64,
    /// Failed items are retained this long for observability.
    #[serde(default = "default_failed_grace_ms")]
    pub failed_grace_ms: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            execution_timeout_ms: default_execution_timeout_ms(),
            failed_grace_ms: default_failed_grace_ms(),
        }
    }
}

/// Idle-alert hysteresis thresholds.
#[derive(Debug, Deserialize, Clone)]
pub struct IdleAlertConfig {
    /// Idle funds above this amount start the idle timer.
    #[serde(default = "default_threshold_amount")]
    pub threshold_amount: f64,
    /// Utilization below (100 − this) starts the idle timer.
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,
    /// Continuous breach duration required before the alert fires.
    #[serde(default = "default_max_idle_duration_ms")]
    pub max_idle_duration_ms: i64,
}

impl Default for IdleAlertConfig {
    fn default() -> Self {
        Self {
            threshold_amount: default_threshold_amount(),
            threshold_percent: default_threshold_percent(),
            max_idle_duration_ms: default_max_idle_duration_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_fast_tick_ms() -> u64 {
    50
}

fn default_market_tick_ms() -> u64 {
    200
}

fn default_metrics_tick_ms() -> u64 {
    100
}

fn default_full_sync_secs() -> u64 {
    5
}

fn default_execution_timeout_ms() -> i64 {
    10_000
}

fn default_failed_grace_ms() -> i64 {
    5_000
}

fn default_threshold_amount() -> f64 {
    100.0
}

fn default_threshold_percent() -> f64 {
    80.0
}

fn default_max_idle_duration_ms() -> i64 {
    300_000
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
