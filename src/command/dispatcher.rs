//! Command dispatcher
//!
//! Runs validated commands against the [`Store`] and builds the replies.

use std::sync::Arc;

use bytes::Bytes;

use crate::protocol::Value;
use crate::store::Store;
use super::{Command, CommandType};

/// Anything that can answer `execute(name, args)`
pub trait CommandExecutor {
    /// Run one command and return its reply
    ///
    /// Never fails: bad arity or arguments come back as an `Error` value and
    /// an unknown command name comes back as an empty simple string.
    fn execute(&self, name: &[u8], args: &[Value]) -> Value;
}

/// Executes commands directly against a store, without logging
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Reply for a command name that is not in the registry
    pub fn unknown_command_reply() -> Value {
        Value::simple("")
    }

    /// Run an already validated command
    pub fn apply(&self, command: Command) -> Value {
        match command {
            Command::Ping { message: None } => Value::simple("PONG"),
            Command::Ping {
                message: Some(message),
            } => echo(message),
            Command::Set { key, value } => {
                self.store.set_string(key, value);
                Value::ok()
            }
            Command::Get { key } => self.store.get_string(&key).into(),
            Command::HSet { key, pairs } => {
                self.store.hash_set(key, pairs);
                Value::ok()
            }
            Command::HGet { key, field } => self.store.hash_get(&key, &field).into(),
            Command::HGetAll { key } => {
                let pairs = self.store.hash_get_all(&key).unwrap_or_default();
                let mut items = Vec::with_capacity(pairs.len() * 2);
                for (field, value) in pairs {
                    items.push(Value::BulkString(field));
                    items.push(Value::BulkString(value));
                }
                Value::Array(items)
            }
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl CommandExecutor for Dispatcher {
    fn execute(&self, name: &[u8], args: &[Value]) -> Value {
        let Some(kind) = CommandType::from_name(name) else {
            tracing::debug!("Unknown command: {}", String::from_utf8_lossy(name));
            return Self::unknown_command_reply();
        };
        match Command::parse(kind, args) {
            Ok(command) => self.apply(command),
            Err(reply) => reply,
        }
    }
}

/// `PING message` answers with the message as a simple string when it can
/// be carried by one, otherwise as a bulk string
fn echo(message: Bytes) -> Value {
    match std::str::from_utf8(&message) {
        Ok(text) if !text.contains(|c| c == '\r' || c == '\n') => Value::simple(text),
        _ => Value::BulkString(message),
    }
}
