//! matchintel: market vs model discrepancy board for Premier League
//! match predictions.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod gateway;
pub mod analysis;
pub mod engine;
pub mod teams;
pub mod board;
pub mod dashboard;
