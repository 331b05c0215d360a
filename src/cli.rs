//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use harvester_core::HarvestConfig;
use harvester_core::fetch::constants::{CONNECT_TIMEOUT, REQUEST_TIMEOUT, RESPONSE_HEADER_TIMEOUT};
use harvester_core::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_REDIRECTS, DEFAULT_WORKERS};

/// Harvest robots.txt files for a list of domains.
///
/// Reads one domain per line from stdin (or --input), fetches
/// `http://<domain>/robots.txt` with a bounded worker pool, and stores every
/// terminal result in a `SQLite` database.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// `SQLite` database to write results to
    #[arg(short, long, default_value = "robots.db")]
    pub database: PathBuf,

    /// File with one domain per line (default: stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Concurrent fetch workers (1-1000)
    #[arg(short, long, default_value_t = DEFAULT_WORKERS as u16, value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub workers: u16,

    /// TCP connect timeout in seconds (1-300)
    #[arg(long, default_value_t = CONNECT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=300))]
    pub connect_timeout: u64,

    /// Total request timeout in seconds (1-300)
    #[arg(long, default_value_t = REQUEST_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=300))]
    pub request_timeout: u64,

    /// Response header timeout in seconds (1-300)
    #[arg(long, default_value_t = RESPONSE_HEADER_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=300))]
    pub header_timeout: u64,

    /// Retries for timeouts and temporary errors (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_attempts: u8,

    /// Redirects followed per request (0-50)
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS as u8, value_parser = clap::value_parser!(u8).range(0..=50))]
    pub max_redirects: u8,

    /// Interval between database commits in milliseconds (10-60000)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(10..=60000))]
    pub commit_interval_ms: u64,

    /// Base retry backoff in milliseconds (0 to disable, max 60000)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay_ms: u64,

    /// Request queue capacity (1-1024)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=1024))]
    pub queue_capacity: u16,
}

impl Args {
    /// Builds the run configuration from the parsed flags.
    pub fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            workers: usize::from(self.workers),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            request_timeout: Duration::from_secs(self.request_timeout),
            response_header_timeout: Duration::from_secs(self.header_timeout),
            max_attempts: u32::from(self.max_attempts),
            max_redirects: u32::from(self.max_redirects),
            commit_interval: Duration::from_millis(self.commit_interval_ms),
            retry_base_delay: Duration::from_millis(self.retry_delay_ms),
            request_queue_capacity: usize::from(self.queue_capacity),
        }
    }
}
