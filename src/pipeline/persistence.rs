//! Persistence stage: the single writer of the sink.
//!
//! The stage keeps one batch (transaction) open at a time. Each incoming
//! [`FetchResult`] is inserted into the open batch; every commit interval
//! the batch is committed and a fresh one begun. Ticks are independent of
//! message arrival. When the result queue closes and drains, the last batch
//! is committed and the total row count reported.
//!
//! Any sink error ends the stage immediately.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument};

use crate::fetch::FetchResult;
use crate::store::{RobotsStore, StoreError};

/// What the persistence stage wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceReport {
    /// Results inserted, successful or not.
    pub saved: u64,
    /// Inserted results with an empty final URL (unreachable domains).
    pub failed: u64,
    /// Commits performed, including the final one.
    pub batches: u64,
    /// Committed rows in the sink after the final commit.
    pub rows_in_store: i64,
}

/// Counts for one batch window.
#[derive(Debug, Default)]
struct WindowCounts {
    saved: u64,
    failed: u64,
}

impl WindowCounts {
    fn record(&mut self, result: &FetchResult) {
        self.saved += 1;
        if result.is_unreachable() {
            self.failed += 1;
        }
    }
}

/// Serializes all writes to the sink and commits them in timed batches.
#[derive(Debug, Clone)]
pub struct PersistenceStage {
    store: RobotsStore,
    commit_interval: Duration,
}

impl PersistenceStage {
    /// Creates a stage writing to `store`, committing every `commit_interval`.
    #[must_use]
    pub fn new(store: RobotsStore, commit_interval: Duration) -> Self {
        Self {
            store,
            commit_interval,
        }
    }

    /// Consumes results until the queue closes, then commits and reports.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on the first failed insert, commit, or count.
    /// Rows of the open batch are rolled back in that case.
    #[instrument(skip_all, fields(commit_interval_ms = self.commit_interval.as_millis()))]
    pub async fn run(
        self,
        mut results: mpsc::UnboundedReceiver<FetchResult>,
    ) -> Result<PersistenceReport, StoreError> {
        let mut ticker = interval_at(Instant::now() + self.commit_interval, self.commit_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut report = PersistenceReport::default();
        let mut window = WindowCounts::default();
        let mut batch = self.store.begin_batch().await?;

        loop {
            tokio::select! {
                received = results.recv() => {
                    let Some(result) = received else {
                        break;
                    };
                    batch.insert(&result).await?;
                    window.record(&result);
                }
                _ = ticker.tick() => {
                    let committed = batch.commit().await?;
                    report.batches += 1;
                    report.saved += window.saved;
                    report.failed += window.failed;
                    if committed > 0 {
                        info!(saved = window.saved, failed = window.failed, "committed batch");
                    } else {
                        debug!("empty batch window");
                    }
                    window = WindowCounts::default();
                    batch = self.store.begin_batch().await?;
                }
            }
        }

        batch.commit().await?;
        report.batches += 1;
        report.saved += window.saved;
        report.failed += window.failed;
        report.rows_in_store = self.store.count().await?;

        info!(
            saved = report.saved,
            failed = report.failed,
            batches = report.batches,
            rows = report.rows_in_store,
            "persistence drained"
        );
        Ok(report)
    }
}
