//! Robots Harvester Core Library
//!
//! This library fetches `robots.txt` for large lists of domains and stores
//! every terminal result in `SQLite`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - HTTP attempts, retry/fallback policy, and the worker pool
//! - [`store`] - The response sink (`robots` table) and batched writes
//! - [`pipeline`] - Persistence stage and the coordinator that drains it all
//! - [`config`] - Run configuration and validation
//! - [`db`] - Database connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod fetch;
pub mod pipeline;
pub mod store;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, DEFAULT_WORKERS, HarvestConfig};
pub use db::{Database, DbError};
pub use fetch::{
    Action, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_REDIRECTS, FailureKind, FetchOutcome, FetchPolicy,
    FetchRequest, FetchResult, FetcherSettings, HttpFetcher, RobotsFetcher, WorkerReport,
};
pub use pipeline::{HarvestReport, Harvester, PersistenceReport, PersistenceStage, PipelineError};
pub use store::{RobotsBatch, RobotsStore, StoreError, StoreErrorKind, StoredRobots};
