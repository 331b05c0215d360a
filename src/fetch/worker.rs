//! Fixed-size pool of fetch workers.
//!
//! Every worker loops: pull one [`FetchRequest`] from the shared request
//! queue, run one attempt, ask the [`FetchPolicy`] what to do, and act.
//! Accepted results go to the result queue. Retries go back onto the request
//! queue when it still exists and has room; otherwise the worker keeps the
//! request and runs the next attempt itself. That way a retry is never lost,
//! never blocks on a closed or full queue, and one lineage is only ever held
//! by one worker at a time.
//!
//! Workers share no mutable state. Each counts its own activity in a
//! [`WorkerReport`], summed once every worker has exited.

use std::ops::AddAssign;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::client::RobotsFetcher;
use super::policy::{Action, FetchPolicy};
use super::types::{FetchRequest, FetchResult};

/// Receiving end of the request queue, shared by all workers.
type SharedRequests = Arc<Mutex<mpsc::Receiver<FetchRequest>>>;

/// Per-worker activity counters, merged after the pool drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    /// HTTP attempts made.
    pub attempts: u64,
    /// Lineages that ended with a result.
    pub accepted: u64,
    /// Same-domain retries scheduled.
    pub retries: u64,
    /// `www.` fallbacks scheduled.
    pub fallbacks: u64,
    /// Lineages dropped after exhausting retries.
    pub abandoned: u64,
}

impl AddAssign for WorkerReport {
    fn add_assign(&mut self, other: Self) {
        self.attempts += other.attempts;
        self.accepted += other.accepted;
        self.retries += other.retries;
        self.fallbacks += other.fallbacks;
        self.abandoned += other.abandoned;
    }
}

/// Everything one worker needs; cloned per worker.
#[derive(Clone)]
struct WorkerContext {
    fetcher: Arc<dyn RobotsFetcher>,
    policy: FetchPolicy,
    requests: SharedRequests,
    resubmit: mpsc::WeakSender<FetchRequest>,
    results: mpsc::UnboundedSender<FetchResult>,
}

/// Handles of the running workers.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    /// Starts `size` workers pulling from `requests`.
    ///
    /// `resubmit` must be a weak handle to the sender side of `requests`, so
    /// the queue closes as soon as the coordinator drops its sender.
    pub(crate) fn spawn(
        size: usize,
        fetcher: Arc<dyn RobotsFetcher>,
        policy: FetchPolicy,
        requests: mpsc::Receiver<FetchRequest>,
        resubmit: mpsc::WeakSender<FetchRequest>,
        results: &mpsc::UnboundedSender<FetchResult>,
    ) -> Self {
        let context = WorkerContext {
            fetcher,
            policy,
            requests: Arc::new(Mutex::new(requests)),
            resubmit,
            results: results.clone(),
        };

        let handles = (0..size)
            .map(|id| tokio::spawn(run_worker(id, context.clone())))
            .collect();

        debug!(size, "spawned fetch workers");
        Self { handles }
    }

    /// Number of workers started.
    pub(crate) fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit and sums their reports.
    ///
    /// Workers exit once the request queue is closed and drained, or when
    /// the result queue has gone away.
    pub(crate) async fn join(self) -> WorkerReport {
        let mut total = WorkerReport::default();
        for handle in self.handles {
            match handle.await {
                Ok(report) => total += report,
                // A panicking worker loses its in-hand lineage; the rest carry on.
                Err(e) => warn!(error = %e, "fetch worker panicked"),
            }
        }
        total
    }
}

#[instrument(level = "debug", skip(context))]
async fn run_worker(id: usize, context: WorkerContext) -> WorkerReport {
    let mut report = WorkerReport::default();

    while let Some(request) = next_request(&context.requests).await {
        if !run_lineage(&context, request, &mut report).await {
            break;
        }
    }

    debug!(?report, "worker exiting");
    report
}

async fn next_request(requests: &SharedRequests) -> Option<FetchRequest> {
    requests.lock().await.recv().await
}

/// Runs attempts for one lineage until it is accepted, abandoned, or handed
/// back to the queue. Returns `false` once the result queue is closed.
async fn run_lineage(
    context: &WorkerContext,
    mut request: FetchRequest,
    report: &mut WorkerReport,
) -> bool {
    loop {
        report.attempts += 1;
        debug!(domain = %request.domain, attempt = request.attempt, "fetching robots.txt");

        let outcome = context.fetcher.fetch(&request.domain).await;
        let action = context.policy.decide(&request, outcome, Utc::now());
        debug!(domain = %request.domain, action = action.label(), "attempt classified");
        let next = match action {
            Action::Accept(result) => {
                report.accepted += 1;
                debug!(domain = %result.domain, success = result.success, "lineage complete");
                if context.results.send(result).is_err() {
                    warn!("result queue closed, stopping worker");
                    return false;
                }
                return true;
            }
            Action::Abandon => {
                report.abandoned += 1;
                warn!(
                    domain = %request.domain,
                    max_attempts = context.policy.max_attempts(),
                    "maximum attempts reached, abandoning domain"
                );
                return true;
            }
            Action::RetryFallbackDomain(next) => {
                report.fallbacks += 1;
                warn!(from = %request.domain, to = %next.domain, "DNS failure, retrying with www prefix");
                next
            }
            Action::RetrySame(next) => {
                report.retries += 1;
                let delay = context.policy.retry_delay(next.attempt);
                warn!(
                    domain = %next.domain,
                    attempt = next.attempt,
                    delay_ms = delay.as_millis(),
                    "timeout or temporary failure, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                next
            }
        };

        match resubmit(&context.resubmit, next) {
            Ok(()) => return true,
            Err(kept) => {
                debug!(domain = %kept.domain, "request queue unavailable, retrying in place");
                request = kept;
            }
        }
    }
}

/// Pushes a retry back onto the request queue without waiting.
///
/// Hands the request back when the queue is closed or full.
fn resubmit(
    queue: &mpsc::WeakSender<FetchRequest>,
    request: FetchRequest,
) -> Result<(), FetchRequest> {
    let Some(sender) = queue.upgrade() else {
        return Err(request);
    };
    sender.try_send(request).map_err(|error| match error {
        TrySendError::Full(request) | TrySendError::Closed(request) => request,
    })
}
