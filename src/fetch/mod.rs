//! robots.txt fetch stage: HTTP attempts, retry policy, and the worker pool.
//!
//! # Features
//!
//! - One-shot GETs with independent connect/header/total deadlines
//! - Manual redirect following with an exact per-request hop count
//! - DNS failures retried once against the `www.`-prefixed domain
//! - Timeouts and temporary errors retried with exponential backoff
//! - Bounded concurrency: a fixed number of workers share one request queue
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::fetch::{FetcherSettings, HttpFetcher, RobotsFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new(FetcherSettings::default())?;
//! let outcome = fetcher.fetch("example.com").await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod classify;
mod client;
pub mod constants;
mod policy;
mod types;
pub(crate) mod worker;

pub use client::{ClientError, FetcherSettings, HttpFetcher, RobotsFetcher};
pub use constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_REDIRECTS};
pub use policy::{Action, FetchPolicy};
pub use types::{
    FailureKind, FetchOutcome, FetchRequest, FetchResult, HttpResponse, is_robots_response,
    robots_url,
};
pub use worker::WorkerReport;
