//! Response sink: append-only `SQLite` storage for fetch results.
//!
//! The sink is not safe for concurrent writers; the persistence stage is
//! its only writer. Rows are normally written through a [`RobotsBatch`]
//! (one open transaction) and only become visible to [`RobotsStore::count`]
//! once that batch commits.
//!
//! # Example
//!
//! ```ignore
//! use harvester_core::{Database, RobotsStore};
//!
//! let store = RobotsStore::new(Database::new(Path::new("robots.db")).await?);
//! let mut batch = store.begin_batch().await?;
//! batch.insert(&result).await?;
//! batch.commit().await?;
//! println!("{} rows", store.count().await?);
//! ```

mod error;

pub use error::{StoreError, StoreErrorKind};

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::instrument;

use crate::db::Database;
use crate::fetch::FetchResult;

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, StoreError>;

const INSERT_SQL: &str = r"INSERT INTO robots (domain, url, has_robots, fetched_at, body, redirects)
    VALUES (?, ?, ?, ?, ?, ?)";

/// One row as read back from the sink.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredRobots {
    /// Row id.
    pub id: i64,
    /// Domain of the terminal attempt.
    pub domain: String,
    /// Final URL; empty for unreachable domains.
    pub url: String,
    /// Whether a usable robots.txt was found.
    pub has_robots: bool,
    /// When the terminal attempt completed.
    pub fetched_at: DateTime<Utc>,
    /// Raw robots.txt bytes.
    pub body: Vec<u8>,
    /// Redirect hops followed.
    pub redirects: i64,
}

/// Handle to the `robots` table.
#[derive(Debug, Clone)]
pub struct RobotsStore {
    db: Database,
}

impl RobotsStore {
    /// Creates a sink over an opened (and migrated) database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts one result in its own implicit transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self, result), fields(domain = %result.domain))]
    pub async fn insert(&self, result: &FetchResult) -> Result<i64> {
        let done = bind_result(sqlx::query(INSERT_SQL), result)
            .execute(self.db.pool())
            .await
            .map_err(|e| StoreError::database("insert", e))?;
        Ok(done.last_insert_rowid())
    }

    /// Opens a transaction that subsequent inserts join until commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if no connection is available or
    /// `BEGIN` fails.
    pub async fn begin_batch(&self) -> Result<RobotsBatch> {
        let tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| StoreError::database("begin", e))?;
        Ok(RobotsBatch { tx, inserted: 0 })
    }

    /// Counts committed rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM robots")
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| StoreError::database("count", e))?;
        Ok(count)
    }

    /// Returns committed rows for `domain`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn rows_for_domain(&self, domain: &str) -> Result<Vec<StoredRobots>> {
        sqlx::query_as::<_, StoredRobots>(
            "SELECT id, domain, url, has_robots, fetched_at, body, redirects
             FROM robots WHERE domain = ? ORDER BY id",
        )
        .bind(domain)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| StoreError::database("select", e))
    }
}

/// An open transaction against the sink.
///
/// Dropping a batch without committing rolls it back.
#[derive(Debug)]
pub struct RobotsBatch {
    tx: Transaction<'static, Sqlite>,
    inserted: u64,
}

impl RobotsBatch {
    /// Adds a result to the batch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    pub async fn insert(&mut self, result: &FetchResult) -> Result<()> {
        bind_result(sqlx::query(INSERT_SQL), result)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StoreError::database("insert", e))?;
        self.inserted += 1;
        Ok(())
    }

    /// Rows inserted into this batch so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inserted
    }

    /// True if nothing has been inserted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Commits the batch, returning how many rows it made visible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if `COMMIT` fails.
    pub async fn commit(self) -> Result<u64> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::database("commit", e))?;
        Ok(self.inserted)
    }
}

fn bind_result<'q>(
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    result: &'q FetchResult,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(result.domain.as_str())
        .bind(result.final_url.as_str())
        .bind(result.success)
        .bind(result.fetched_at)
        .bind(result.body.as_slice())
        .bind(i64::from(result.redirect_count))
}
