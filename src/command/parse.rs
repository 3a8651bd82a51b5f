//! Request parsing
//!
//! Turns a decoded wire value into a command name plus arguments, and a
//! name plus arguments into a validated [`Command`].

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::Value;
use super::CommandType;

/// Why a decoded value is not a usable request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("expected array, got {0}")]
    NotArray(&'static str),

    #[error("empty command array")]
    Empty,

    #[error("command name must be a string, got {0}")]
    BadName(&'static str),
}

impl RequestError {
    /// Error reply sent back to the client
    pub fn to_reply(&self) -> Value {
        Value::error(format!("ERR invalid request: {}", self))
    }
}

/// A request split into its command name and raw arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub name: Bytes,
    pub args: Vec<Value>,

    /// The name as it arrived (bulk or simple string)
    name_value: Value,
}

impl Request {
    /// Build a request whose name is a bulk string
    pub fn new(name: Bytes, args: Vec<Value>) -> Self {
        let name_value = Value::BulkString(name.clone());
        Self {
            name,
            args,
            name_value,
        }
    }

    /// Split an array value into name and arguments
    pub fn from_value(mut value: Value) -> Result<Self, RequestError> {
        let mut items = match &mut value {
            Value::Array(items) => std::mem::take(items).into_iter(),
            other => return Err(RequestError::NotArray(other.kind_name())),
        };
        let Some(name_value) = items.next() else {
            return Err(RequestError::Empty);
        };
        let name = match &name_value {
            Value::BulkString(name) => name.clone(),
            Value::SimpleString(name) => Bytes::copy_from_slice(name.as_bytes()),
            other => return Err(RequestError::BadName(other.kind_name())),
        };
        Ok(Self {
            name,
            args: items.collect(),
            name_value,
        })
    }

    /// Rebuild the wire value, as written to the log
    ///
    /// Every element keeps the type it arrived with, so the encoding matches
    /// the request as received.
    pub fn to_value(&self) -> Value {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(self.name_value.clone());
        items.extend(self.args.iter().cloned());
        Value::Array(items)
    }
}

/// A validated command, ready to run against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Health check, optionally echoing a message
    Ping { message: Option<Bytes> },

    /// Set a string key
    Set { key: Bytes, value: Bytes },

    /// Get a string key
    Get { key: Bytes },

    /// Set one or more hash fields
    HSet { key: Bytes, pairs: Vec<(Bytes, Bytes)> },

    /// Get one hash field
    HGet { key: Bytes, field: Bytes },

    /// Get every field of a hash
    HGetAll { key: Bytes },
}

impl Command {
    /// Validate arity and argument shapes for `kind`
    ///
    /// On failure returns the error reply to send; nothing has been touched.
    pub fn parse(kind: CommandType, args: &[Value]) -> Result<Self, Value> {
        if !kind.arity().accepts(args.len()) {
            return Err(kind.arity_error());
        }
        let args = args
            .iter()
            .map(argument_bytes)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| kind.argument_error())?;
        let mut args = args.into_iter();

        let command = match kind {
            CommandType::Ping => Command::Ping {
                message: args.next(),
            },
            CommandType::Set => Command::Set {
                key: take(&mut args),
                value: take(&mut args),
            },
            CommandType::Get => Command::Get {
                key: take(&mut args),
            },
            CommandType::HSet => {
                let key = take(&mut args);
                let mut pairs = Vec::with_capacity(args.len() / 2);
                while let (Some(field), Some(value)) = (args.next(), args.next()) {
                    pairs.push((field, value));
                }
                Command::HSet { key, pairs }
            }
            CommandType::HGet => Command::HGet {
                key: take(&mut args),
                field: take(&mut args),
            },
            CommandType::HGetAll => Command::HGetAll {
                key: take(&mut args),
            },
        };
        Ok(command)
    }

    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Ping { .. } => CommandType::Ping,
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
            Command::HSet { .. } => CommandType::HSet,
            Command::HGet { .. } => CommandType::HGet,
            Command::HGetAll { .. } => CommandType::HGetAll,
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.command_type().is_mutating()
    }
}

// Arity has already been checked, so the argument is always there.
fn take<I: Iterator<Item = Bytes>>(args: &mut I) -> Bytes {
    args.next().unwrap_or_default()
}

/// Bytes of a string-like argument; integers count as their decimal text
fn argument_bytes(value: &Value) -> Option<Bytes> {
    match value {
        Value::BulkString(data) => Some(data.clone()),
        Value::SimpleString(text) => Some(Bytes::copy_from_slice(text.as_bytes())),
        Value::Integer(n) => Some(Bytes::from(n.to_string())),
        Value::Error(_) | Value::Array(_) | Value::Null => None,
    }
}
