//! FUNDRANK: fund ranking scraper and composite-score screener.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod ranking;
pub mod analysis;
pub mod source;
pub mod storage;
pub mod engine;
