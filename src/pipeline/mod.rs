//! Pipeline coordinator: input → fetch workers → persistence.
//!
//! [`Harvester::run`] owns the lifecycle of one harvest:
//!
//! 1. start the persistence stage and the fetch worker pool
//! 2. feed input domains as attempt-0 requests into the bounded request queue
//! 3. close the request queue once input is exhausted
//! 4. wait for every worker to exit (queue closed and drained)
//! 5. only then close the result queue
//! 6. wait for the persistence stage's final commit
//!
//! The request queue is small, so a busy pool throttles how fast input is
//! read.

mod error;
mod persistence;

pub use error::PipelineError;
pub use persistence::{PersistenceReport, PersistenceStage};

use std::io;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::config::HarvestConfig;
use crate::fetch::worker::WorkerPool;
use crate::fetch::{FetchRequest, HttpFetcher, RobotsFetcher, WorkerReport};
use crate::store::RobotsStore;

/// Summary of one harvest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// Non-blank input lines queued for fetching.
    pub domains_read: u64,
    /// Fetch activity summed over all workers.
    pub workers: WorkerReport,
    /// What the persistence stage wrote.
    pub persistence: PersistenceReport,
}

/// Runs harvests against one sink with one fetcher.
pub struct Harvester {
    config: HarvestConfig,
    store: RobotsStore,
    fetcher: Arc<dyn RobotsFetcher>,
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Harvester {
    /// Creates a harvester that fetches over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for invalid settings and
    /// [`PipelineError::Client`] if the HTTP client cannot be built.
    pub fn new(config: HarvestConfig, store: RobotsStore) -> Result<Self, PipelineError> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.fetcher_settings())?;
        Ok(Self {
            config,
            store,
            fetcher: Arc::new(fetcher),
        })
    }

    /// Creates a harvester with a caller-supplied fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for invalid settings.
    pub fn with_fetcher(
        config: HarvestConfig,
        store: RobotsStore,
        fetcher: Arc<dyn RobotsFetcher>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            fetcher,
        })
    }

    /// Harvests every domain in `input`, one per line, and drains cleanly.
    ///
    /// Blank lines and lines that are not UTF-8 are skipped. A read error on
    /// `input` ends input early; already-queued domains are still fetched and
    /// persisted before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if the sink fails at any point,
    /// [`PipelineError::Input`] if reading `input` fails, and
    /// [`PipelineError::Join`] if the persistence task dies.
    #[instrument(skip_all, fields(workers = self.config.workers))]
    pub async fn run<R>(&self, input: R) -> Result<HarvestReport, PipelineError>
    where
        R: AsyncBufRead + Unpin,
    {
        let (request_tx, request_rx) = mpsc::channel(self.config.request_queue_capacity);
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let stage = PersistenceStage::new(self.store.clone(), self.config.commit_interval);
        let persistence = tokio::spawn(stage.run(result_rx));

        let pool = WorkerPool::spawn(
            self.config.workers,
            Arc::clone(&self.fetcher),
            self.config.policy(),
            request_rx,
            request_tx.downgrade(),
            &result_tx,
        );
        info!(workers = pool.size(), "harvest started");

        let fed = feed(input, &request_tx).await;
        drop(request_tx);
        match &fed {
            Ok(domains_read) => info!(domains_read, "input exhausted, draining workers"),
            Err(e) => warn!(error = %e, "input failed, draining queued domains"),
        }

        let workers = pool.join().await;
        // Every worker has exited; no result can be in flight any more.
        drop(result_tx);
        info!(
            accepted = workers.accepted,
            abandoned = workers.abandoned,
            "workers drained"
        );

        let persistence = persistence.await??;
        let domains_read = fed?;
        info!(rows = persistence.rows_in_store, "harvest complete");

        Ok(HarvestReport {
            domains_read,
            workers,
            persistence,
        })
    }
}

/// Queues one attempt-0 request per non-blank line. Returns how many were queued.
async fn feed<R>(input: R, requests: &mpsc::Sender<FetchRequest>) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.split(b'\n');
    let mut queued = 0;
    let mut line_number = 0u64;
    while let Some(raw) = lines.next_segment().await? {
        line_number += 1;
        let Ok(line) = String::from_utf8(raw) else {
            warn!(line = line_number, "skipping input line that is not UTF-8");
            continue;
        };
        let domain = line.trim();
        if domain.is_empty() {
            continue;
        }
        if requests.send(FetchRequest::new(domain)).await.is_err() {
            // All workers are gone, which only happens when the sink died.
            warn!("request queue closed, stopping input");
            break;
        }
        queued += 1;
    }
    Ok(queued)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::{AsyncRead, BufReader, ReadBuf};

    use super::*;
    use crate::db::Database;
    use crate::fetch::{FailureKind, FetchOutcome, HttpResponse};

    /// Answers from a fixed table; unknown domains get a connection refusal.
    #[derive(Default)]
    struct TableFetcher {
        table: Mutex<HashMap<String, Vec<FetchOutcome>>>,
    }

    impl TableFetcher {
        fn with(self, domain: &str, outcomes: Vec<FetchOutcome>) -> Self {
            self.table
                .lock()
                .unwrap()
                .insert(domain.to_string(), outcomes.into_iter().rev().collect());
            self
        }
    }

    #[async_trait]
    impl RobotsFetcher for TableFetcher {
        async fn fetch(&self, domain: &str) -> FetchOutcome {
            self.table
                .lock()
                .unwrap()
                .get_mut(domain)
                .and_then(Vec::pop)
                .unwrap_or(FetchOutcome::Transport(FailureKind::Other))
        }
    }

    fn response(domain: &str, status: u16, body: &[u8]) -> FetchOutcome {
        FetchOutcome::Response(HttpResponse {
            status,
            content_types: vec!["text/plain; charset=utf-8".to_string()],
            final_url: format!("http://{domain}/robots.txt"),
            redirect_count: 0,
            body: body.to_vec(),
        })
    }

    /// Yields `data` once, then fails every read.
    struct BrokenInput {
        data: Option<Vec<u8>>,
    }

    impl AsyncRead for BrokenInput {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(&data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::other("device went away"))),
            }
        }
    }

    fn test_config() -> HarvestConfig {
        HarvestConfig {
            workers: 4,
            retry_base_delay: Duration::ZERO,
            commit_interval: Duration::from_millis(50),
            ..HarvestConfig::default()
        }
    }

    async fn store() -> RobotsStore {
        RobotsStore::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_run_persists_each_terminal_result() {
        let fetcher = TableFetcher::default()
            .with("ok.com", vec![response("ok.com", 200, b"User-agent: *\n")])
            .with("missing.com", vec![response("missing.com", 404, b"")])
            .with(
                "slow.com",
                vec![FetchOutcome::Transport(FailureKind::Timeout); 3],
            );
        let store = store().await;
        let harvester =
            Harvester::with_fetcher(test_config(), store.clone(), Arc::new(fetcher)).unwrap();

        let input = b"ok.com\n\n  missing.com  \nslow.com\nrefused.com\n";
        let report = harvester.run(&input[..]).await.unwrap();

        assert_eq!(report.domains_read, 4);
        assert_eq!(report.workers.abandoned, 1);
        assert_eq!(report.persistence.saved, 3);
        assert_eq!(report.persistence.failed, 1);
        assert_eq!(report.persistence.rows_in_store, 3);

        assert!(store.rows_for_domain("ok.com").await.unwrap()[0].has_robots);
        assert!(!store.rows_for_domain("missing.com").await.unwrap()[0].has_robots);
        assert!(store.rows_for_domain("slow.com").await.unwrap().is_empty());
        assert!(store.rows_for_domain("refused.com").await.unwrap()[0].url.is_empty());
    }

    #[tokio::test]
    async fn test_run_with_empty_input() {
        let harvester =
            Harvester::with_fetcher(test_config(), store().await, Arc::new(TableFetcher::default()))
                .unwrap();

        let report = harvester.run(&b""[..]).await.unwrap();

        assert_eq!(report, HarvestReport {
            domains_read: 0,
            workers: WorkerReport::default(),
            persistence: PersistenceReport {
                batches: 1,
                ..PersistenceReport::default()
            },
        });
    }

    #[tokio::test]
    async fn test_many_domains_few_workers() {
        let harvester = Harvester::with_fetcher(
            HarvestConfig {
                workers: 3,
                ..test_config()
            },
            store().await,
            Arc::new(TableFetcher::default()),
        )
        .unwrap();
        let input: String = (0..200).map(|i| format!("d{i}.example\n")).collect();

        let report = harvester.run(input.as_bytes()).await.unwrap();

        assert_eq!(report.domains_read, 200);
        assert_eq!(report.workers.accepted, 200);
        assert_eq!(report.persistence.rows_in_store, 200);
    }

    #[tokio::test]
    async fn test_sink_failure_surfaces() {
        let db = Database::new_in_memory().await.unwrap();
        let store = RobotsStore::new(db.clone());
        db.close().await;
        let harvester =
            Harvester::with_fetcher(test_config(), store, Arc::new(TableFetcher::default()))
                .unwrap();

        let err = harvester.run(&b"a.com\nb.com\n"[..]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = HarvestConfig {
            workers: 0,
            ..HarvestConfig::default()
        };
        let err = Harvester::with_fetcher(config, store().await, Arc::new(TableFetcher::default()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_skipped_not_fatal() {
        let store = store().await;
        let harvester =
            Harvester::with_fetcher(test_config(), store.clone(), Arc::new(TableFetcher::default()))
                .unwrap();

        let report = harvester
            .run(&b"a.com\n\xffbad.com\nb.com\nc.com\n"[..])
            .await
            .unwrap();

        assert_eq!(report.domains_read, 3);
        assert_eq!(report.persistence.rows_in_store, 3);
        for domain in ["a.com", "b.com", "c.com"] {
            assert_eq!(store.rows_for_domain(domain).await.unwrap().len(), 1, "{domain}");
        }
    }

    #[tokio::test]
    async fn test_crlf_input_is_trimmed() {
        let store = store().await;
        let harvester =
            Harvester::with_fetcher(test_config(), store.clone(), Arc::new(TableFetcher::default()))
                .unwrap();

        let report = harvester.run(&b"a.com\r\nb.com"[..]).await.unwrap();

        assert_eq!(report.domains_read, 2);
        assert_eq!(store.rows_for_domain("a.com").await.unwrap().len(), 1);
        assert_eq!(store.rows_for_domain("b.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_input_read_error_drains_then_fails() {
        let store = store().await;
        let harvester =
            Harvester::with_fetcher(test_config(), store.clone(), Arc::new(TableFetcher::default()))
                .unwrap();
        let input = BufReader::new(BrokenInput {
            data: Some(b"a.com\nb.com\n".to_vec()),
        });

        let err = harvester.run(input).await.unwrap_err();

        assert!(matches!(err, PipelineError::Input(_)), "got {err:?}");
        assert_eq!(store.count().await.unwrap(), 2, "queued domains still persist");
    }
}
