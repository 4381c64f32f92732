//! Scheduling engine: queue, ranker, metrics, efficiency, idle alerts,
//! and the tick loops that drive them.

pub mod efficiency;
pub mod idle_alert;
pub mod metrics;
pub mod queue;
pub mod ranker;
pub mod scheduler;
