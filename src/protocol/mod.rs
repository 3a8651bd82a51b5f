//! Protocol Module
//!
//! Defines the wire protocol for client-server communication and the on-disk
//! log record format (they are the same thing).
//!
//! ## Type Markers
//! - `+` simple string
//! - `-` error
//! - `:` integer
//! - `$` bulk string (length prefixed, `-1` = null)
//! - `*` array (element count, `-1` = null)
//!
//! Every line ends with CRLF. A request is an array whose first element is the
//! command name.

mod value;
mod codec;

pub use value::Value;
pub use codec::{
    decode_value, encode_into, encode_value, read_value, write_value, CRLF, NULL_BULK,
};
