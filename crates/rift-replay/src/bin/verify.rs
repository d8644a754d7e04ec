//! Rift Replay Verifier CLI Tool
//!
//! Replays every request of a fixture document against a running stub and
//! checks that each one comes back with the recorded response.
//!
//! Usage:
//!   rift-replay-verify --endpoint http://localhost:9797/ --fixtures requestResponseMap.json
//!
//! Features:
//! - Optional HEAD liveness probe before replaying
//! - Concurrent requests with a configurable bound
//! - Transparent gzip decompression
//! - Optional schema filtering, matching what the server would load

use anyhow::Context;
use clap::Parser;
use rift_replay::loader::load_schemas;
use rift_replay::{ReplayHarness, ReplayOptions, ReplaySummary};
use std::path::PathBuf;
use std::time::{Duration, Instant};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Rift Replay Verifier - replay fixtures against a live stub
#[derive(Parser, Debug)]
#[command(name = "rift-replay-verify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stub endpoint, optionally including the debug parameter
    #[arg(short, long, default_value = "http://127.0.0.1:9797/")]
    endpoint: String,

    /// Fixture document to replay (not validated unless schemas are given)
    #[arg(short, long, default_value = "requestResponseMap.json")]
    fixtures: PathBuf,

    /// Probe the endpoint with a HEAD request first
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    check_up: bool,

    /// Request gzip-compressed responses
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    gzip: bool,

    /// Maximum requests in flight
    #[arg(long, default_value = "64")]
    concurrency: usize,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Only replay entries this request schema accepts
    #[arg(long, requires = "response_schema")]
    request_schema: Option<PathBuf>,

    /// Only replay entries this response schema accepts
    #[arg(long, requires = "request_schema")]
    response_schema: Option<PathBuf>,

    /// Print every failure in full
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    println!("{BOLD}{CYAN}Rift Replay Verifier{RESET}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Endpoint:  {}", args.endpoint);
    println!("Fixtures:  {}", args.fixtures.display());
    println!("Check-up:  {}", args.check_up);
    println!("Gzip:      {}", args.gzip);
    println!();

    let document = std::fs::read_to_string(&args.fixtures)
        .with_context(|| format!("Unable to read {}", args.fixtures.display()))?;

    let options = ReplayOptions {
        check_up: args.check_up,
        gzip: args.gzip,
        concurrency: args.concurrency,
        timeout: Duration::from_secs(args.timeout),
    };
    let mut harness = ReplayHarness::new(args.endpoint.clone(), options)?;
    if let (Some(request), Some(response)) = (&args.request_schema, &args.response_schema) {
        harness = harness.with_schemas(load_schemas(request, response)?);
    }

    let started = Instant::now();
    let summary = match harness.replay(&document).await {
        Ok(summary) => summary,
        Err(e) => {
            println!("{RED}Aborted:{RESET} {e}");
            std::process::exit(1);
        }
    };

    print_summary(&summary, started.elapsed(), args.verbose);

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &ReplaySummary, elapsed: Duration, verbose: bool) {
    if !summary.failures.is_empty() {
        println!("{BOLD}Failures{RESET}");
        for failure in &summary.failures {
            if verbose {
                println!("   {RED}FAIL{RESET} #{} {}", failure.index, failure);
            } else {
                println!(
                    "   {RED}FAIL{RESET} #{} {} - {}",
                    failure.index,
                    failure.url,
                    truncate(&failure.reason, 120)
                );
            }
        }
        println!();
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{GREEN}Success Requests:{RESET} {}", summary.success);
    println!("{RED}Failed Requests:{RESET}  {}", summary.failure);
    if summary.skipped > 0 {
        println!("{YELLOW}Skipped:{RESET}          {}", summary.skipped);
    }
    println!(
        "Total requests sent: {} in {}ms",
        summary.total(),
        elapsed.as_millis()
    );

    if summary.is_success() {
        println!("{GREEN}{BOLD}All fixtures replayed successfully{RESET}");
    } else {
        println!("{RED}{BOLD}{} fixture(s) failed{RESET}", summary.failure);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}
