//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol. The same functions
//! read network input and the append-only log.
//!
//! ## Wire Format
//!
//! ```text
//! +OK\r\n                      simple string
//! -ERR message\r\n             error
//! :1000\r\n                    integer
//! $5\r\nhello\r\n              bulk string   ($-1\r\n = null)
//! *2\r\n$3\r\nGET\r\n$1\r\na\r\n   array     (*-1\r\n = null)
//! ```
//!
//! Bulk strings are length prefixed, so their payload may contain any bytes,
//! CRLF included.

use std::io::{BufRead, Cursor, ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};
use super::Value;

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Type marker bytes
pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

/// Canonical wire form of [`Value::Null`]
pub const NULL_BULK: &[u8] = b"$-1\r\n";

// Upper bound on speculative allocation for declared array counts
const MAX_PREALLOC_ITEMS: usize = 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to bytes
pub fn encode_value(value: &Value) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(value, &mut buf);
    buf.freeze()
}

/// Append the encoding of `value` to `buf`
///
/// Nested arrays are walked with an explicit stack, so depth is bounded by
/// memory rather than by the thread's stack.
pub fn encode_into(value: &Value, buf: &mut BytesMut) {
    let mut pending = vec![std::slice::from_ref(value).iter()];
    while let Some(items) = pending.last_mut() {
        let Some(value) = items.next() else {
            pending.pop();
            continue;
        };
        match value {
            Value::SimpleString(text) => put_text_line(buf, SIMPLE_STRING, text),
            Value::Error(message) => put_text_line(buf, ERROR, message),
            Value::Integer(n) => put_line(buf, INTEGER, n.to_string().as_bytes()),
            Value::BulkString(data) => {
                put_line(buf, BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            Value::Array(items) => {
                put_line(buf, ARRAY, items.len().to_string().as_bytes());
                pending.push(items.iter());
            }
            Value::Null => buf.put_slice(NULL_BULK),
        }
    }
}

fn put_text_line(buf: &mut BytesMut, marker: u8, text: &str) {
    debug_assert!(
        !text.contains('\n'),
        "line-framed value contains a newline: {:?}",
        text
    );
    put_line(buf, marker, text.as_bytes());
}

fn put_line(buf: &mut BytesMut, marker: u8, body: &[u8]) {
    buf.reserve(body.len() + 3);
    buf.put_u8(marker);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

// =============================================================================
// Decoding
// =============================================================================

/// Read exactly one value from a buffered stream
///
/// Blocks until a complete value is available. Returns
/// [`KvError::EndOfStream`] if the stream ends before the first byte of the
/// value and [`KvError::Truncated`] if it ends part way through.
///
/// Arrays are assembled on an explicit stack of open frames, so nesting
/// depth does not grow the call stack.
pub fn read_value<R: BufRead>(reader: &mut R) -> Result<Value> {
    let mut marker = read_marker(reader)?.ok_or(KvError::EndOfStream)?;
    // (items still expected, items read so far) per open array
    let mut open: Vec<(usize, Vec<Value>)> = Vec::new();

    'values: loop {
        let mut value = match read_item(reader, marker)? {
            Item::Complete(value) => value,
            Item::ArrayHeader(0) => Value::Array(Vec::new()),
            Item::ArrayHeader(count) => {
                open.push((count, Vec::with_capacity(count.min(MAX_PREALLOC_ITEMS))));
                marker = read_nested_marker(reader)?;
                continue;
            }
        };

        // Hand the finished value to its parent, closing every array it
        // completes on the way up.
        while let Some((remaining, mut items)) = open.pop() {
            items.push(value);
            if remaining > 1 {
                open.push((remaining - 1, items));
                marker = read_nested_marker(reader)?;
                continue 'values;
            }
            value = Value::Array(items);
        }
        return Ok(value);
    }
}

/// Decode one value from the front of `bytes`
///
/// Returns the value and the number of bytes consumed.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize)> {
    let mut cursor = Cursor::new(bytes);
    let value = read_value(&mut cursor)?;
    Ok((value, cursor.position() as usize))
}

/// One step of decoding: a finished scalar or the start of an array
enum Item {
    Complete(Value),
    ArrayHeader(usize),
}

fn read_item<R: BufRead>(reader: &mut R, marker: u8) -> Result<Item> {
    let value = match marker {
        SIMPLE_STRING => Value::SimpleString(read_text_line(reader)?),
        ERROR => Value::Error(read_text_line(reader)?),
        INTEGER => Value::Integer(read_integer(reader)?),
        BULK_STRING => read_bulk(reader)?,
        ARRAY => return read_array_header(reader),
        other => {
            return Err(KvError::Protocol(format!(
                "invalid type marker: 0x{:02x} ({:?})",
                other, other as char
            )))
        }
    };
    Ok(Item::Complete(value))
}

/// Marker of a value inside an array: running out of input here is always a
/// truncation
fn read_nested_marker<R: BufRead>(reader: &mut R) -> Result<u8> {
    read_marker(reader)?.ok_or(KvError::Truncated)
}

fn read_bulk<R: BufRead>(reader: &mut R) -> Result<Value> {
    let len = read_integer(reader)?;
    if len == -1 {
        return Ok(Value::Null);
    }
    let len = usize::try_from(len)
        .map_err(|_| KvError::Protocol(format!("invalid bulk string length: {}", len)))?;

    // Payload plus trailing CRLF; grow as bytes arrive instead of trusting the
    // declared length up front.
    let expected = len + CRLF.len();
    let mut payload = Vec::new();
    (&mut *reader).take(expected as u64).read_to_end(&mut payload)?;
    if payload.len() < expected {
        return Err(KvError::Truncated);
    }
    if &payload[len..] != CRLF {
        return Err(KvError::Protocol(
            "bulk string payload not terminated by CRLF".to_string(),
        ));
    }
    payload.truncate(len);
    Ok(Value::BulkString(Bytes::from(payload)))
}

fn read_array_header<R: BufRead>(reader: &mut R) -> Result<Item> {
    let count = read_integer(reader)?;
    if count == -1 {
        return Ok(Item::Complete(Value::Null));
    }
    let count = usize::try_from(count)
        .map_err(|_| KvError::Protocol(format!("invalid array length: {}", count)))?;
    Ok(Item::ArrayHeader(count))
}

fn read_integer<R: BufRead>(reader: &mut R) -> Result<i64> {
    let line = read_line(reader)?;
    std::str::from_utf8(&line)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| {
            KvError::Protocol(format!(
                "invalid integer: {:?}",
                String::from_utf8_lossy(&line)
            ))
        })
}

fn read_text_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let line = read_line(reader)?;
    String::from_utf8(line).map_err(|e| KvError::Protocol(format!("invalid UTF-8 in line: {}", e)))
}

/// Read a CRLF-terminated line, returning it without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.last() != Some(&b'\n') {
        return Err(KvError::Truncated);
    }
    if !line.ends_with(CRLF) {
        return Err(KvError::Protocol("line not terminated by CRLF".to_string()));
    }
    line.truncate(line.len() - CRLF.len());
    Ok(line)
}

/// Consume the type marker, or `None` on a clean end of stream
fn read_marker<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok([]) => return Ok(None),
            Ok(buf) => {
                let marker = buf[0];
                reader.consume(1);
                return Ok(Some(marker));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a value to a stream and flush it
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    let bytes = encode_value(value);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
