//! bucketkv Stress Binary
//!
//! Runs the CAS-counter contention workload against an in-memory engine and
//! checks that no increment was lost.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bucketkv::{Config, Gateway, KvError, MemEngine};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// bucketkv stress tool
#[derive(Parser, Debug)]
#[command(name = "bucketkv-stress")]
#[command(about = "Concurrent compare-and-swap counter against a bucketed gateway")]
#[command(version)]
struct Args {
    /// Number of buckets
    #[arg(short, long, default_value = "16")]
    buckets: usize,

    /// Per-bucket queue capacity
    #[arg(short, long, default_value = "8")]
    queue: usize,

    /// Concurrent incrementing threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Successful increments per thread
    #[arg(short, long, default_value = "1000")]
    iterations: usize,

    /// Counter key
    #[arg(short, long, default_value = "counter")]
    key: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bucketkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bucketkv stress v{}", bucketkv::VERSION);
    tracing::info!(
        buckets = args.buckets,
        queue = args.queue,
        threads = args.threads,
        iterations = args.iterations,
        "starting workload"
    );

    let config = Config::builder()
        .num_buckets(args.buckets)
        .queue_capacity(args.queue)
        .build();

    let gateway = match Gateway::open(MemEngine::new(), config) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            tracing::error!("Failed to open gateway: {}", e);
            std::process::exit(1);
        }
    };

    match run(&gateway, &args) {
        Ok(()) => {}
        Err(e) => {
            tracing::error!("Workload failed: {}", e);
            let _ = gateway.close();
            std::process::exit(1);
        }
    }

    if let Err(e) = gateway.close() {
        tracing::error!("Close failed: {}", e);
        std::process::exit(1);
    }
}

fn run(gateway: &Arc<Gateway<MemEngine>>, args: &Args) -> bucketkv::Result<()> {
    let key = args.key.as_bytes().to_vec();
    gateway.put(&key, b"0", None)?;

    let started = Instant::now();
    let mut handles = Vec::with_capacity(args.threads);
    for _ in 0..args.threads {
        let gateway = Arc::clone(gateway);
        let key = key.clone();
        let iterations = args.iterations;
        handles.push(thread::spawn(move || increment(&gateway, &key, iterations)));
    }

    let mut attempts = 0u64;
    for handle in handles {
        match handle.join() {
            Ok(result) => attempts += result?,
            Err(_) => return Err(KvError::Aborted("incrementing thread panicked".to_string())),
        }
    }
    let elapsed = started.elapsed();

    let expected = (args.threads * args.iterations) as u64;
    let stored = parse_counter(&gateway.get(&key, None)?)?;
    tracing::info!(
        expected,
        stored,
        attempts,
        elapsed_ms = elapsed.as_millis() as u64,
        ops_per_sec = (attempts as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
        "workload finished"
    );

    if stored != expected {
        return Err(KvError::Aborted(format!(
            "lost updates: expected {}, found {}",
            expected, stored
        )));
    }
    println!("ok: {} increments, {} CAS attempts in {:?}", stored, attempts, elapsed);
    Ok(())
}

/// Increment the counter `iterations` times; returns the number of CAS attempts
fn increment(gateway: &Gateway<MemEngine>, key: &[u8], iterations: usize) -> bucketkv::Result<u64> {
    let mut attempts = 0u64;
    let mut last_seen = 0u64;

    for _ in 0..iterations {
        loop {
            attempts += 1;
            let old = last_seen.to_string();
            let new = (last_seen + 1).to_string();
            let outcome = gateway.compare_and_swap_returning_previous(
                key,
                new.as_bytes(),
                old.as_bytes(),
                None,
                None,
            )?;
            if outcome.swapped {
                last_seen += 1;
                break;
            }
            last_seen = parse_counter(&outcome.observed)?;
        }
    }

    Ok(attempts)
}

fn parse_counter(bytes: &[u8]) -> bucketkv::Result<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| KvError::Corruption(format!("counter is not a number: {:?}", bytes)))
}
