//! MarketRadar Runner: run orchestration on top of `radar-core`.
//!
//! - `RunConfig`: one immutable configuration per run, loaded from TOML
//! - `TargetCatalog`: instrument groups to track
//! - `ConcurrentScheduler`: bounded worker pool with per-task timeouts
//! - `StatusAggregator`: one status per instrument plus summary counts
//! - `run_catalog`: every group in order, assembled into a `RunReport`

pub mod catalog;
pub mod config;
pub mod report;
pub mod scheduler;
pub mod status;

pub use catalog::{CatalogEntry, CatalogError, CatalogGroup, TargetCatalog};
pub use config::{ConfigError, RunConfig, RunWindows};
pub use report::{run_catalog, RunError, RunReport};
pub use scheduler::{ConcurrentScheduler, GroupOutput};
pub use status::{StatusAggregator, StatusSummary};
