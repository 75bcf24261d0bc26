//! MarketRadar Core: domain types, multi-provider acquisition, normalization
//! and indicators.
//!
//! - Domain types (candles, instruments, snapshots, statuses)
//! - Provider capability table, fixed-backoff retry and the fallback chain
//! - Schema normalization of raw provider tables
//! - Rolling indicators (MA, MACD, KDJ, RSI) and pattern signals

pub mod data;
pub mod domain;
pub mod indicators;
