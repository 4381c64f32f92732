//! CAPFLOW: capital deployment scheduler.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod engine;
pub mod store;
pub mod exchange;
pub mod signal;
pub mod dashboard;
