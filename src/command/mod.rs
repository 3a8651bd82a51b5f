//! Command Module
//!
//! Name → handler dispatch over the in-memory store.
//!
//! ## Commands
//! - `PING [message]`
//! - `SET key value`
//! - `GET key`
//! - `HSET key field value [field value ...]`
//! - `HGET key field`
//! - `HGETALL key`
//!
//! Names match case-insensitively. Arity is checked before anything is
//! touched. Only `SET` and `HSET` are classified as mutating, and only those
//! are written to the append-only log.

mod types;
mod parse;
mod dispatcher;

pub use types::{Arity, CommandType};
pub use parse::{Command, Request, RequestError};
pub use dispatcher::{CommandExecutor, Dispatcher};
