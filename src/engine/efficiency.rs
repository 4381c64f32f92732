//! Efficiency scorer.
//!
//! Derives a composite capital-efficiency score from utilization, execution
//! speed, and idle duration, and classifies the trend over a bounded score
//! history.

use chrono::{DateTime, Utc};

use crate::types::{EfficiencyRecord, EfficiencyTrend};

/// Ring-buffer bound for score history.
pub const MAX_HISTORY: usize = 60;

/// Minimum history length before a trend can be classified.
const TREND_MIN_POINTS: usize = 5;

/// Trend window: mean of the newest `TREND_WINDOW` points vs the mean of
/// the up-to-`TREND_WINDOW` points before them.
const TREND_WINDOW: usize = 3;

/// Score difference beyond which the trend is non-stable.
const TREND_EPSILON: f64 = 5.0;

/// Average execution time at or below which speed scores 100.
const SPEED_BASELINE_MS: f64 = 500.0;

/// Average execution time at which speed scores 0.
const SPEED_FLOOR_MS: f64 = 5_000.0;

/// Component weights: utilization 0.4, speed 0.3, idle 0.3.
const WEIGHT_UTILIZATION: f64 = 0.4;
const WEIGHT_SPEED: f64 = 0.3;
const WEIGHT_IDLE: f64 = 0.3;

/// Inputs for one scoring pass.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    /// Capital utilization percentage in [0, 100].
    pub utilization_pct: f64,
    /// Mean duration of recent successful executions (0 when none).
    pub avg_execution_time_ms: f64,
    /// Start of the current idle timer, if the idle condition holds.
    pub idle_since: Option<DateTime<Utc>>,
    /// Idle duration at which the idle score bottoms out.
    pub max_idle_duration_ms: i64,
}

#[derive(Debug, Default)]
pub struct EfficiencyScorer {
    history: Vec<EfficiencyRecord>,
}

impl EfficiencyScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the composite score, append it to history, and return it.
    pub fn score(&mut self, inputs: ScoreInputs, now: DateTime<Utc>) -> f64 {
        let utilization_score = inputs.utilization_pct.min(100.0).max(0.0);
        let speed_score = speed_score(inputs.avg_execution_time_ms);
        let idle_score = idle_score(inputs.idle_since, inputs.max_idle_duration_ms, now);

        let score = WEIGHT_UTILIZATION * utilization_score
            + WEIGHT_SPEED * speed_score
            + WEIGHT_IDLE * idle_score;

        self.history.push(EfficiencyRecord {
            timestamp: now,
            score,
        });
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }

        score
    }

    /// Classify the score trend. Requires at least `TREND_MIN_POINTS`
    /// history entries; with exactly five, the earlier window holds two.
    pub fn trend(&self) -> EfficiencyTrend {
        if self.history.len() < TREND_MIN_POINTS {
            return EfficiencyTrend::Stable;
        }

        let n = self.history.len();
        let recent = &self.history[n - TREND_WINDOW..];
        let earlier_start = n.saturating_sub(TREND_WINDOW * 2);
        let earlier = &self.history[earlier_start..n - TREND_WINDOW];

        let recent_mean = mean(recent);
        let earlier_mean = mean(earlier);
        let diff = recent_mean - earlier_mean;

        if diff > TREND_EPSILON {
            EfficiencyTrend::Improving
        } else if diff < -TREND_EPSILON {
            EfficiencyTrend::Declining
        } else {
            EfficiencyTrend::Stable
        }
    }

    pub fn history(&self) -> &[EfficiencyRecord] {
        &self.history
    }

    pub fn latest(&self) -> Option<f64> {
        self.history.last().map(|r| r.score)
    }
}

/// 100 at or below the baseline, falling linearly to 0 at the floor.
fn speed_score(avg_execution_time_ms: f64) -> f64 {
    if avg_execution_time_ms <= SPEED_BASELINE_MS {
        return 100.0;
    }
    let span = SPEED_FLOOR_MS - SPEED_BASELINE_MS;
    let over = avg_execution_time_ms - SPEED_BASELINE_MS;
    (100.0 * (1.0 - over / span)).clamp(0.0, 100.0)
}

/// 100 with no active idle timer, falling linearly to 0 as the idle
/// duration approaches the configured maximum.
fn idle_score(idle_since: Option<DateTime<Utc>>, max_idle_duration_ms: i64, now: DateTime<Utc>) -> f64 {
    let Some(since) = idle_since else {
        return 100.0;
    };
    if max_idle_duration_ms <= 0 {
        return 0.0;
    }
    let elapsed = (now - since).num_milliseconds().max(0) as f64;
    (100.0 * (1.0 - elapsed / max_idle_duration_ms as f64)).clamp(0.0, 100.0)
}

fn mean(records: &[EfficiencyRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(utilization: f64, avg_ms: f64) -> ScoreInputs {
        ScoreInputs {
            utilization_pct: utilization,
            avg_execution_time_ms: avg_ms,
            idle_since: None,
            max_idle_duration_ms: 300_000,
        }
    }

    #[test]
    fn test_perfect_score() {
        let mut scorer = EfficiencyScorer::new();
        // Full utilization, fast executions, no idle timer.
        let score = scorer.score(inputs(100.0, 200.0), Utc::now());
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_score_linear_decay() {
        assert_eq!(speed_score(0.0), 100.0);
        assert_eq!(speed_score(500.0), 100.0);
        // Halfway between baseline and floor.
        assert!((speed_score(2750.0) - 50.0).abs() < 1e-9);
        assert_eq!(speed_score(5000.0), 0.0);
        assert_eq!(speed_score(60_000.0), 0.0);
    }

    #[test]
    fn test_idle_score_decay() {
        let now = Utc::now();
        assert_eq!(idle_score(None, 300_000, now), 100.0);

        let half = now - chrono::Duration::milliseconds(150_000);
        assert!((idle_score(Some(half), 300_000, now) - 50.0).abs() < 1e-9);

        let past = now - chrono::Duration::milliseconds(600_000);
        assert_eq!(idle_score(Some(past), 300_000, now), 0.0);
    }

    #[test]
    fn test_components_weighted() {
        let mut scorer = EfficiencyScorer::new();
        // utilization 50 → 0.4 * 50 = 20; speed 100 → 30; idle 100 → 30.
        let score = scorer.score(inputs(50.0, 100.0), Utc::now());
        assert!((score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounded() {
        let mut scorer = EfficiencyScorer::new();
        let score = scorer.score(inputs(250.0, 0.0), Utc::now());
        // Utilization component clamps at 100.
        assert!(score <= 100.0);
        let score = scorer.score(inputs(-10.0, 99_999.0), Utc::now());
        assert!(score >= 0.0);
    }

    #[test]
    fn test_history_bounded() {
        let mut scorer = EfficiencyScorer::new();
        let now = Utc::now();
        for _ in 0..(MAX_HISTORY + 15) {
            scorer.score(inputs(50.0, 100.0), now);
        }
        assert_eq!(scorer.history().len(), MAX_HISTORY);
    }

    #[test]
    fn test_trend_needs_five_points() {
        let mut scorer = EfficiencyScorer::new();
        let now = Utc::now();
        for _ in 0..4 {
            scorer.score(inputs(100.0, 100.0), now);
        }
        assert_eq!(scorer.trend(), EfficiencyTrend::Stable);
    }

    #[test]
    fn test_trend_improving() {
        let mut scorer = EfficiencyScorer::new();
        let now = Utc::now();
        // Three poor scores then three strong ones.
        for _ in 0..3 {
            scorer.score(inputs(10.0, 100.0), now); // 0.4*10 + 60 = 64
        }
        for _ in 0..3 {
            scorer.score(inputs(100.0, 100.0), now); // 100
        }
        assert_eq!(scorer.trend(), EfficiencyTrend::Improving);
    }

    #[test]
    fn test_trend_declining() {
        let mut scorer = EfficiencyScorer::new();
        let now = Utc::now();
        for _ in 0..3 {
            scorer.score(inputs(100.0, 100.0), now);
        }
        for _ in 0..3 {
            scorer.score(inputs(10.0, 100.0), now);
        }
        assert_eq!(scorer.trend(), EfficiencyTrend::Declining);
    }

    #[test]
    fn test_trend_stable_within_epsilon() {
        let mut scorer = EfficiencyScorer::new();
        let now = Utc::now();
        for _ in 0..3 {
            scorer.score(inputs(80.0, 100.0), now); // 92
        }
        for _ in 0..3 {
            scorer.score(inputs(85.0, 100.0), now); // 94, diff 2 < epsilon
        }
        assert_eq!(scorer.trend(), EfficiencyTrend::Stable);
    }

    #[test]
    fn test_trend_with_exactly_five_points() {
        let mut scorer = EfficiencyScorer::new();
        let now = Utc::now();
        // Earlier window holds two points, recent window three.
        for _ in 0..2 {
            scorer.score(inputs(10.0, 100.0), now);
        }
        for _ in 0..3 {
            scorer.score(inputs(100.0, 100.0), now);
        }
        assert_eq!(scorer.history().len(), 5);
        assert_eq!(scorer.trend(), EfficiencyTrend::Improving);
    }

    #[test]
    fn test_latest() {
        let mut scorer = EfficiencyScorer::new();
        assert!(scorer.latest().is_none());
        let score = scorer.score(inputs(50.0, 100.0), Utc::now());
        assert_eq!(scorer.latest(), Some(score));
    }
}
