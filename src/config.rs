//! Run configuration for a harvest.
//!
//! [`HarvestConfig`] carries every tunable of the pipeline. Defaults match
//! the reference deployment (50 workers, 7s/9s/11s timeouts, two retries,
//! ten redirects, one-second commits).

use std::time::Duration;

use thiserror::Error;

use crate::fetch::{FetchPolicy, FetcherSettings};
use crate::fetch::constants::{
    CONNECT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_REDIRECTS, DEFAULT_RETRY_BASE_DELAY,
    REQUEST_TIMEOUT, RESPONSE_HEADER_TIMEOUT,
};

/// Default number of fetch workers.
pub const DEFAULT_WORKERS: usize = 50;

/// Upper bound on fetch workers. Each one can hold a socket open.
pub const MAX_WORKERS: usize = 1000;

/// Upper bound on the transient-fault retry budget.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Upper bound on the redirect cap.
pub const MAX_REDIRECTS_LIMIT: u32 = 50;

/// Default interval between sink commits.
pub const DEFAULT_COMMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Default request queue capacity: a handoff point, not a buffer.
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 1;

/// Upper bound on the request queue capacity.
pub const MAX_REQUEST_QUEUE_CAPACITY: usize = 1024;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric setting is outside its allowed range.
    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// Rejected value, formatted.
        value: String,
        /// Human-readable allowed range.
        expected: &'static str,
    },

    /// A duration setting is zero.
    #[error("invalid value for `{field}`: must be greater than zero")]
    ZeroDuration {
        /// Setting name.
        field: &'static str,
    },
}

/// Tunables for one harvest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Number of concurrent fetch workers.
    pub workers: usize,
    /// TCP connect deadline.
    pub connect_timeout: Duration,
    /// Total-request deadline.
    pub request_timeout: Duration,
    /// Response-header deadline.
    pub response_header_timeout: Duration,
    /// Retry budget for timeouts and temporary errors.
    pub max_attempts: u32,
    /// Redirect hops allowed per attempt.
    pub max_redirects: u32,
    /// How often the persistence stage commits.
    pub commit_interval: Duration,
    /// Backoff base before a same-domain retry; zero disables backoff.
    pub retry_base_delay: Duration,
    /// Request queue capacity.
    pub request_queue_capacity: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            response_header_timeout: RESPONSE_HEADER_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
        }
    }
}

impl HarvestConfig {
    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            return Err(ConfigError::OutOfRange {
                field: "workers",
                value: self.workers.to_string(),
                expected: "1..=1000",
            });
        }
        if self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::OutOfRange {
                field: "max_attempts",
                value: self.max_attempts.to_string(),
                expected: "0..=10",
            });
        }
        if self.max_redirects > MAX_REDIRECTS_LIMIT {
            return Err(ConfigError::OutOfRange {
                field: "max_redirects",
                value: self.max_redirects.to_string(),
                expected: "0..=50",
            });
        }
        if !(1..=MAX_REQUEST_QUEUE_CAPACITY).contains(&self.request_queue_capacity) {
            return Err(ConfigError::OutOfRange {
                field: "request_queue_capacity",
                value: self.request_queue_capacity.to_string(),
                expected: "1..=1024",
            });
        }
        for (field, value) in [
            ("connect_timeout", self.connect_timeout),
            ("request_timeout", self.request_timeout),
            ("response_header_timeout", self.response_header_timeout),
            ("commit_interval", self.commit_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        Ok(())
    }

    /// HTTP settings for the fetcher.
    #[must_use]
    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            response_header_timeout: self.response_header_timeout,
            max_redirects: self.max_redirects,
        }
    }

    /// Retry policy for the workers.
    #[must_use]
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy::new(self.max_attempts, self.retry_base_delay)
    }
}
