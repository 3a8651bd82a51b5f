//! Wire value definitions
//!
//! Everything the protocol can carry, requests and replies alike.

use bytes::Bytes;

/// A single wire value
///
/// Absent bulk strings and absent arrays both decode to [`Value::Null`], and
/// `Null` always encodes as the null bulk string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `+OK\r\n`
    SimpleString(String),

    /// `-ERR message\r\n`
    Error(String),

    /// `:42\r\n`
    Integer(i64),

    /// `$5\r\nhello\r\n`, binary safe
    BulkString(Bytes),

    /// `*2\r\n...`
    Array(Vec<Value>),

    /// `$-1\r\n` (also produced by `*-1\r\n`)
    Null,
}

impl Value {
    /// Create a simple string reply
    ///
    /// `text` must not contain `\n`; simple strings are line framed.
    pub fn simple(text: impl Into<String>) -> Self {
        Value::SimpleString(text.into())
    }

    /// Create an error reply
    ///
    /// `message` must not contain `\n`.
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    /// Create a bulk string by copying the given bytes
    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        Value::BulkString(Bytes::copy_from_slice(data.as_ref()))
    }

    /// Build a request array of bulk strings, e.g. `["SET", "a", "1"]`
    pub fn request<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Value::Array(parts.into_iter().map(Value::bulk).collect())
    }

    /// The `+OK` reply
    pub fn ok() -> Self {
        Value::simple("OK")
    }

    /// Bytes of a string-like value (bulk or simple)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::BulkString(data) => Some(data),
            Value::SimpleString(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Short name of the variant, for log and error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::SimpleString(_) => "simple string",
            Value::Error(_) => "error",
            Value::Integer(_) => "integer",
            Value::BulkString(_) => "bulk string",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        // Flatten nested arrays so that tearing down a deep value does not
        // recurse once per level.
        let Value::Array(items) = self else {
            return;
        };
        if !items.iter().any(|item| matches!(item, Value::Array(_))) {
            return;
        }
        let mut pending = std::mem::take(items);
        while let Some(mut item) = pending.pop() {
            if let Value::Array(inner) = &mut item {
                pending.append(inner);
            }
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::bulk(text)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::BulkString(data)
    }
}

impl From<Option<Bytes>> for Value {
    fn from(data: Option<Bytes>) -> Self {
        data.map_or(Value::Null, Value::BulkString)
    }
}
