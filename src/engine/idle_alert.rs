//! Idle-alert state machine.
//!
//! Hysteresis timer over capital metrics: the idle condition must persist
//! continuously for `max_idle_duration_ms` before an alert fires. Any dip
//! below threshold resets the timer with no partial credit, and a fired
//! alert resets immediately so a single sustained breach produces exactly
//! one alert.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::IdleAlertConfig;
use crate::types::{CapitalMetrics, IdleAlert};

/// Machine state. There is no fired state; firing emits the alert and
/// resets to `Clear` within the same evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Clear,
    Counting { since_ms: i64 },
}

#[derive(Debug)]
pub struct IdleAlertMachine {
    config: IdleAlertConfig,
    state: AlertState,
    /// Counting start as a timestamp, kept alongside the epoch-ms state
    /// discriminant for alert payloads and the efficiency idle score.
    counting_since: Option<DateTime<Utc>>,
}

impl IdleAlertMachine {
    pub fn new(config: IdleAlertConfig) -> Self {
        Self {
            config,
            state: AlertState::Clear,
            counting_since: None,
        }
    }

    /// Whether the idle condition currently holds for the given metrics.
    fn breached(&self, metrics: &CapitalMetrics) -> bool {
        metrics.idle_funds_f64() > self.config.threshold_amount
            || metrics.utilization_pct < (100.0 - self.config.threshold_percent)
    }

    /// Evaluate the machine against fresh metrics. Returns an alert when
    /// the breach has persisted past the configured duration.
    pub fn evaluate(&mut self, metrics: &CapitalMetrics, now: DateTime<Utc>) -> Option<IdleAlert> {
        let breached = self.breached(metrics);

        match self.state {
            AlertState::Clear => {
                if breached {
                    self.state = AlertState::Counting {
                        since_ms: now.timestamp_millis(),
                    };
                    self.counting_since = Some(now);
                    debug!(
                        idle_funds = %metrics.idle_funds,
                        utilization = metrics.utilization_pct,
                        "idle condition detected, timer started"
                    );
                }
                None
            }
            AlertState::Counting { since_ms } => {
                if !breached {
                    // Condition cleared before the duration elapsed, full reset.
                    self.reset();
                    debug!("idle condition cleared, timer reset");
                    return None;
                }

                let elapsed_ms = now.timestamp_millis() - since_ms;
                if elapsed_ms >= self.config.max_idle_duration_ms {
                    let alert = IdleAlert {
                        triggered_at: now,
                        idle_funds: metrics.idle_funds,
                        utilization_pct: metrics.utilization_pct,
                        idle_for_ms: elapsed_ms,
                    };
                    warn!(alert = %alert, "idle-funds alert fired");
                    // Reset immediately so the same breach cannot re-fire.
                    self.reset();
                    Some(alert)
                } else {
                    None
                }
            }
        }
    }

    /// Start of the current idle timer, if one is running. Feeds the
    /// efficiency scorer's idle score.
    pub fn counting_since(&self) -> Option<DateTime<Utc>> {
        self.counting_since
    }

    pub fn max_idle_duration_ms(&self) -> i64 {
        self.config.max_idle_duration_ms
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    fn reset(&mut self) {
        self.state = AlertState::Clear;
        self.counting_since = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
