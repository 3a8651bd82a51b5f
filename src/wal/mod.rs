//! Append-Only Log Module
//!
//! Provides durability through an append-only command log.
//!
//! ## Responsibilities
//! - Append every accepted `SET`/`HSET` request before it is applied
//! - Flush and fsync on a background period (or after every append)
//! - Replay the log in file order at startup
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ *3\r\n$3\r\nSET\r\n$1\r\nx\r\n$1\r\n9\r\n    │  record 1
//! ├─────────────────────────────────────────┤
//! │ *4\r\n$4\r\nHSET\r\n...                     │  record 2
//! └─────────────────────────────────────────┘
//! ```
//! Records are wire-encoded request arrays, back to back. There is no header,
//! checksum or extra framing; the protocol's own length prefixes delimit
//! records. The file never shrinks except when a partial final record is cut
//! off during a repairing replay.

mod writer;
mod flusher;
mod reader;
mod recovery;

pub use writer::Wal;
pub use reader::WalReader;
pub use recovery::{ReplayStats, WalRecovery};
