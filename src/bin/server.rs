//! RespKV Server Binary
//!
//! Replays the log and starts the TCP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use respkv::config::WalSyncStrategy;
use respkv::network::Server;
use respkv::wal::WalRecovery;
use respkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// RespKV Server
#[derive(Parser, Debug)]
#[command(name = "respkv-server")]
#[command(about = "Key-value server with an append-only log")]
#[command(version)]
struct Args {
    /// Append-only log file
    #[arg(short, long, default_value = "database.aof")]
    aof: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Background flush period in milliseconds (0 = fsync every write)
    #[arg(short = 'f', long, default_value = "1000")]
    flush_ms: u64,

    /// Cut off a partially written final record instead of refusing to start
    #[arg(long)]
    repair: bool,

    /// Check the log file and exit without serving
    #[arg(long)]
    verify: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,respkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if args.verify {
        match WalRecovery::verify(&args.aof) {
            Ok(stats) => {
                tracing::info!(
                    "{:?}: {} records, {} bytes, {} trailing partial bytes",
                    args.aof,
                    stats.records_replayed,
                    stats.bytes_replayed,
                    stats.truncated_bytes
                );
                return;
            }
            Err(e) => {
                tracing::error!("Log verification failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing::info!("RespKV Server v{}", respkv::VERSION);
    tracing::info!("Log file: {:?}", args.aof);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = if args.flush_ms == 0 {
        WalSyncStrategy::EveryWrite
    } else {
        WalSyncStrategy::Interval {
            period: Duration::from_millis(args.flush_ms),
        }
    };

    // Build config from args
    let config = Config::builder()
        .aof_path(&args.aof)
        .listen_addr(&args.listen)
        .sync_strategy(sync_strategy)
        .repair_truncated_tail(args.repair)
        .build();

    // Open engine (replays the log before any client is accepted)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(&config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close log cleanly: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
