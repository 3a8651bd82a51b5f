//! Engine Module
//!
//! The core engine that coordinates the store, the dispatcher and the log.
//!
//! ## Responsibilities
//! - Replay the log into a fresh store on startup
//! - Classify requests and log mutating ones before applying them
//! - Handle concurrent read/write access
//! - Close the log deterministically on shutdown

use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::command::{Command, CommandExecutor, CommandType, Dispatcher, Request};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::Value;
use crate::store::Store;
use crate::wal::{ReplayStats, Wal};

/// The main engine
///
/// ## Concurrency Model
///
/// - **Writes** (`SET`/`HSET`): serialized by `write_lock`
///   - Must acquire: write_lock → log (append) → store table (write)
///   - Holding `write_lock` across append and apply keeps the log order equal
///     to the order mutations reached the store
///
/// - **Reads** (`GET`/`HGET`/`HGETALL`/`PING`): no write_lock
///   - Store tables use internal RwLocks (many concurrent readers)
///   - A read never waits on the log
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory data set (internal RwLocks)
    store: Arc<Store>,

    /// Command handlers over `store`
    dispatcher: Dispatcher,

    /// Append-only log (internal Mutex)
    wal: Wal,

    /// Serializes mutating commands
    write_lock: Mutex<()>,

    /// What startup replay found
    replay_stats: ReplayStats,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create the log file
    /// 2. Replay every record into an empty store
    /// 3. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create the log's directory if it doesn't exist
        if let Some(parent) = config.aof_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Step 2: Open the log
        let wal = Wal::open(&config.aof_path, config.sync_strategy)?;

        // Step 3: Replay into a fresh store through the same handlers live
        // traffic uses, without logging again
        let store = Arc::new(Store::new());
        let dispatcher = Dispatcher::new(Arc::clone(&store));

        let mut skipped = 0u64;
        let apply = |record: Value| {
            if !replay_record(&dispatcher, record) {
                skipped += 1;
            }
        };
        let replay_stats = if config.repair_truncated_tail {
            wal.replay_repairing(apply)?
        } else {
            wal.replay(apply)?
        };

        tracing::info!(
            records = replay_stats.records_replayed,
            skipped,
            bytes = replay_stats.bytes_replayed,
            truncated_bytes = replay_stats.truncated_bytes,
            strings = store.string_len(),
            hashes = store.hash_len(),
            "Replayed log {:?}",
            config.aof_path
        );

        Ok(Self {
            config,
            store,
            dispatcher,
            wal,
            write_lock: Mutex::new(()),
            replay_stats,
        })
    }

    /// Open with a log path (convenience method)
    ///
    /// Uses default config with the specified log path
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().aof_path(path).build())
    }

    /// Answer one decoded request value
    ///
    /// Values that are not command arrays get an error reply.
    pub fn handle_request(&self, request: Value) -> Value {
        match Request::from_value(request) {
            Ok(request) => self.execute_request(&request),
            Err(e) => {
                tracing::warn!("Invalid request: {}", e);
                e.to_reply()
            }
        }
    }

    /// Classify, log if mutating, then apply
    pub fn execute_request(&self, request: &Request) -> Value {
        let Some(kind) = CommandType::from_name(&request.name) else {
            tracing::debug!(
                "Unknown command: {}",
                String::from_utf8_lossy(&request.name)
            );
            return Dispatcher::unknown_command_reply();
        };

        let command = match Command::parse(kind, &request.args) {
            Ok(command) => command,
            Err(reply) => return reply,
        };

        if !command.is_mutating() {
            return self.dispatcher.apply(command);
        }

        let _write_guard = self.write_lock.lock();
        if let Err(e) = self.wal.append(&request.to_value()) {
            tracing::error!("Failed to log {} command: {}", kind.name(), e);
            return Value::error(format!("ERR persistence failure: {}", e));
        }
        self.dispatcher.apply(command)
    }

    /// Force logged mutations to stable storage
    pub fn sync(&self) -> Result<()> {
        self.wal.sync()
    }

    /// Close the engine gracefully
    ///
    /// Stops the background flusher and syncs the log. Later mutating
    /// requests fail with a persistence error.
    pub fn close(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.wal.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn wal(&self) -> &Wal {
        &self.wal
    }

    pub fn replay_stats(&self) -> ReplayStats {
        self.replay_stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl CommandExecutor for Engine {
    fn execute(&self, name: &[u8], args: &[Value]) -> Value {
        let request = Request::new(Bytes::copy_from_slice(name), args.to_vec());
        self.execute_request(&request)
    }
}

/// Apply one log record; false if it was skipped
fn replay_record(dispatcher: &Dispatcher, record: Value) -> bool {
    let request = match Request::from_value(record) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Skipping log record: {}", e);
            return false;
        }
    };
    let reply = dispatcher.execute(&request.name, &request.args);
    match &reply {
        Value::Error(message) => {
            tracing::warn!("Skipping log record: {}", message);
            false
        }
        Value::SimpleString(text) if text.is_empty() => {
            tracing::warn!(
                "Skipping log record with unknown command: {}",
                String::from_utf8_lossy(&request.name)
            );
            false
        }
        _ => true,
    }
}
