//! CLI entry point for the robots.txt harvester.

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{Database, Harvester, RobotsStore};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    info!(database = %args.database.display(), "Harvester starting");

    let db = Database::new(&args.database)
        .await
        .with_context(|| format!("failed to open database {}", args.database.display()))?;
    let store = RobotsStore::new(db.clone());
    let harvester = Harvester::new(args.harvest_config(), store)?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let report = harvester.run(input).await?;
    db.close().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Total rows in database: {}", report.persistence.rows_in_store);
    }

    info!(
        domains = report.domains_read,
        saved = report.persistence.saved,
        failed = report.persistence.failed,
        abandoned = report.workers.abandoned,
        "Harvest complete"
    );

    Ok(())
}
