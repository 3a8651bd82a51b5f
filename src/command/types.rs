//! Command registry
//!
//! The closed set of supported commands and their argument counts.

use crate::protocol::Value;

/// Supported commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Ping,
    Set,
    Get,
    HSet,
    HGet,
    HGetAll,
}

/// Allowed argument counts (the command name itself excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments
    Exact(usize),

    /// Between `min` and `max` arguments, inclusive
    Range { min: usize, max: usize },

    /// A key followed by one or more field/value pairs
    KeyAndPairs,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range { min, max } => (min..=max).contains(&count),
            Arity::KeyAndPairs => count >= 3 && count % 2 == 1,
        }
    }
}

impl CommandType {
    /// Every supported command, in registry order
    pub const ALL: [CommandType; 6] = [
        CommandType::Ping,
        CommandType::Set,
        CommandType::Get,
        CommandType::HSet,
        CommandType::HGet,
        CommandType::HGetAll,
    ];

    /// Case-insensitive lookup by name
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().as_bytes().eq_ignore_ascii_case(name))
    }

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Ping => "PING",
            CommandType::Set => "SET",
            CommandType::Get => "GET",
            CommandType::HSet => "HSET",
            CommandType::HGet => "HGET",
            CommandType::HGetAll => "HGETALL",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            CommandType::Ping => Arity::Range { min: 0, max: 1 },
            CommandType::Set => Arity::Exact(2),
            CommandType::Get => Arity::Exact(1),
            CommandType::HSet => Arity::KeyAndPairs,
            CommandType::HGet => Arity::Exact(2),
            CommandType::HGetAll => Arity::Exact(1),
        }
    }

    /// Whether the command changes the store and must be logged
    pub fn is_mutating(self) -> bool {
        matches!(self, CommandType::Set | CommandType::HSet)
    }

    /// Reply for a wrong argument count
    pub fn arity_error(self) -> Value {
        Value::error(format!(
            "ERR wrong number of arguments for '{}' command",
            self.name()
        ))
    }

    /// Reply for an argument that is not string-like
    pub fn argument_error(self) -> Value {
        Value::error(format!(
            "ERR invalid argument type for '{}' command",
            self.name()
        ))
    }
}
