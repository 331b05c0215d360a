//! Retry and classification policy for robots.txt fetch attempts.
//!
//! [`FetchPolicy::decide`] maps one attempt's [`FetchOutcome`] to an
//! [`Action`]. Rules, first match wins:
//!
//! 1. DNS failure on a domain without `www.` → [`Action::RetryFallbackDomain`]
//!    with the prefixed domain. The attempt count is untouched.
//! 2. Timeout, temporary error, or DNS failure on an already-prefixed domain
//!    → [`Action::RetrySame`] while `attempt < max_attempts`, otherwise
//!    [`Action::Abandon`].
//! 3. Any other transport failure, including an overrun redirect cap →
//!    [`Action::Accept`] with an unreachable result (empty final URL).
//! 4. A response → [`Action::Accept`], success iff status is `200..=206` and
//!    all content types are `text/plain`.
//!
//! Abandoned lineages never produce a [`FetchResult`].
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use harvester_core::fetch::{Action, FailureKind, FetchOutcome, FetchPolicy, FetchRequest};
//!
//! let policy = FetchPolicy::default();
//! let request = FetchRequest::new("nasa.gov");
//! let action = policy.decide(&request, FetchOutcome::Transport(FailureKind::Dns), Utc::now());
//! assert!(matches!(action, Action::RetryFallbackDomain(ref next) if next.domain == "www.nasa.gov"));
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, instrument};

use super::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY, MAX_RETRY_DELAY};
use super::types::{FailureKind, FetchOutcome, FetchRequest, FetchResult};

/// Backoff multiplier (doubles each attempt).
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// What a worker does after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The lineage is over; record this result.
    Accept(FetchResult),
    /// Try the same domain again with the attempt counter bumped.
    RetrySame(FetchRequest),
    /// Try the `www.`-prefixed domain, same attempt counter.
    RetryFallbackDomain(FetchRequest),
    /// Retry budget exhausted; drop the lineage without a record.
    Abandon,
}

impl Action {
    /// Stable label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accept(_) => "accept",
            Self::RetrySame(_) => "retry_same",
            Self::RetryFallbackDomain(_) => "retry_fallback_domain",
            Self::Abandon => "abandon",
        }
    }
}

/// Decision logic for fetch attempts plus the backoff schedule for retries.
///
/// # Default Values
///
/// - `max_attempts`: 2 (so at most three tries per domain)
/// - `base_delay`: 1 second
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), 32s) + jitter(0..=base_delay/2)
/// ```
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl FetchPolicy {
    /// Creates a policy with an explicit retry budget and backoff base.
    ///
    /// A zero `base_delay` disables backoff entirely.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Returns the retry budget for transient faults.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Classifies one attempt and picks the next step for its lineage.
    #[instrument(level = "debug", skip(self, outcome, fetched_at), fields(domain = %request.domain, attempt = request.attempt))]
    pub fn decide(
        &self,
        request: &FetchRequest,
        outcome: FetchOutcome,
        fetched_at: DateTime<Utc>,
    ) -> Action {
        match outcome {
            FetchOutcome::Transport(FailureKind::Dns) => match request.with_www_fallback() {
                Some(fallback) => Action::RetryFallbackDomain(fallback),
                None => self.retry_or_abandon(request),
            },
            FetchOutcome::Transport(FailureKind::Timeout | FailureKind::Temporary) => {
                self.retry_or_abandon(request)
            }
            FetchOutcome::Transport(FailureKind::Other) => {
                Action::Accept(FetchResult::unreachable(&request.domain, fetched_at))
            }
            FetchOutcome::Response(response) => {
                if response.is_robots() {
                    Action::Accept(FetchResult::found(
                        &request.domain,
                        response.final_url,
                        response.body,
                        response.redirect_count,
                        fetched_at,
                    ))
                } else {
                    Action::Accept(FetchResult::rejected(
                        &request.domain,
                        response.final_url,
                        response.redirect_count,
                        fetched_at,
                    ))
                }
            }
        }
    }

    fn retry_or_abandon(&self, request: &FetchRequest) -> Action {
        if request.attempt < self.max_attempts {
            Action::RetrySame(request.next_attempt())
        } else {
            debug!(max = self.max_attempts, "max attempts reached");
            Action::Abandon
        }
    }

    /// Delay before re-queueing a [`Action::RetrySame`] request whose
    /// attempt counter is `attempt` (1 for the first retry).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = (base_ms * BACKOFF_MULTIPLIER.powf(exponent))
            .min(MAX_RETRY_DELAY.as_millis() as f64);

        Duration::from_millis(delay_ms as u64) + self.jitter()
    }

    /// Random jitter between 0 and half the base delay, so workers that
    /// failed together do not retry together.
    fn jitter(&self) -> Duration {
        let max_ms = (self.base_delay.as_millis() / 2) as u64;
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=max_ms))
    }
}
