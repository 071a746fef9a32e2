//! ttlkv - demo driver
//!
//! Fills an expiring store, then watches lazy and background expiry drain it.
//! Exits once the sweep has emptied the store, or on Ctrl+C.

use bytes::Bytes;
use std::str::FromStr;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use ttlkv::{Clock, ExpiringStore, StoreConfig, SystemClock};

/// Driver configuration
struct Config {
    /// TTL applied by `set`
    ttl: Duration,
    /// Background sweep interval
    sweep_interval: Duration,
    /// Keys inserted with the default TTL
    keys: usize,
    /// Keys inserted already expired
    expired: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(1),
            keys: 1000,
            expired: 100,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--ttl-ms" => config.ttl = Duration::from_millis(number_arg(&args, i)),
                "--sweep-ms" => {
                    config.sweep_interval = Duration::from_millis(number_arg(&args, i))
                }
                "--keys" => config.keys = number_arg(&args, i),
                "--expired" => config.expired = number_arg(&args, i),
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("ttlkv version {}", ttlkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 2;
        }

        config
    }
}

/// Reads the numeric value following the flag at `i`.
fn number_arg<T: FromStr>(args: &[String], i: usize) -> T {
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", args[i]);
        std::process::exit(1);
    };
    parse_number(raw).unwrap_or_else(|| {
        eprintln!("Error: invalid number for {}: {}", args[i], raw);
        std::process::exit(1);
    })
}

/// Parses a flag value into the flag's own type, rejecting out-of-range input.
fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}

fn print_help() {
    println!(
        r#"
ttlkv - In-memory key-value store with per-entry expiry (demo driver)

USAGE:
    ttlkv [OPTIONS]

OPTIONS:
        --ttl-ms <MS>      TTL applied to inserted keys (default: 2000)
        --sweep-ms <MS>    Background sweep interval (default: 1000)
        --keys <N>         Keys inserted with the TTL (default: 1000)
        --expired <N>      Keys inserted already expired (default: 100)
    -v, --version          Print version information
    -h, --help             Print this help message

Set RUST_LOG=debug to see sweep activity.
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let store_config = StoreConfig::new(config.ttl).with_sweep_interval(config.sweep_interval);
    let store: ExpiringStore<String, Bytes> = ExpiringStore::with_config(store_config)?;

    let now_ms = SystemClock.now_ms();
    for i in 0..config.keys {
        store.set(format!("key:{}", i), Bytes::from(format!("value:{}", i)));
    }
    for i in 0..config.expired {
        store.set_raw(
            format!("stale:{}", i),
            Bytes::from_static(b"stale"),
            now_ms.saturating_sub(1),
        );
    }

    info!(
        stored = store.len(),
        ttl_ms = config.ttl.as_millis() as u64,
        sweep_ms = config.sweep_interval.as_millis() as u64,
        "Store populated"
    );

    if let Some((key, entry)) = store.raw_entries().next() {
        info!(
            key = %key,
            remaining_ms = entry.remaining_ms(SystemClock.now_ms()),
            "Oldest key"
        );
    }

    // A full traversal evicts every already-expired entry it passes
    let live = store.keys().count();
    info!(live, stored = store.len(), "Traversed live keys");

    let mut ticker = tokio::time::interval(config.sweep_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = signal::ctrl_c() => {
                result?;
                info!("Shutdown signal received");
                break;
            }
        }

        let stats = store.stats();
        info!(
            stored = stats.stored,
            swept = stats.swept,
            lazily_evicted = stats.lazily_evicted,
            "Store status"
        );

        if !store.is_sweeping() {
            info!("Store drained, sweep stopped itself");
            break;
        }
    }

    store.stop_sweep();
    info!(stats = ?store.stats(), "Done");
    Ok(())
}
