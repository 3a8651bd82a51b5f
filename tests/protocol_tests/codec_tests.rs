//! Codec Tests
//!
//! Tests for value encoding/decoding.

use std::io::Cursor;
use std::thread;

use bytes::Bytes;
use respkv::protocol::{decode_value, encode_value, read_value, write_value, Value};
use respkv::KvError;

// =============================================================================
// Helper Functions
// =============================================================================

fn decode(bytes: &[u8]) -> Value {
    let (value, consumed) = decode_value(bytes).unwrap();
    assert_eq!(consumed, bytes.len(), "decoder left bytes behind");
    value
}

fn decode_err(bytes: &[u8]) -> KvError {
    decode_value(bytes).unwrap_err()
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_simple_string() {
    assert_eq!(&encode_value(&Value::simple("OK"))[..], b"+OK\r\n");
}

#[test]
fn test_encode_error() {
    assert_eq!(
        &encode_value(&Value::error("ERR boom"))[..],
        b"-ERR boom\r\n"
    );
}

#[test]
fn test_encode_integer() {
    assert_eq!(&encode_value(&Value::Integer(1000))[..], b":1000\r\n");
    assert_eq!(&encode_value(&Value::Integer(-42))[..], b":-42\r\n");
}

#[test]
fn test_encode_bulk_string() {
    assert_eq!(&encode_value(&Value::bulk("hello"))[..], b"$5\r\nhello\r\n");
    assert_eq!(&encode_value(&Value::bulk(""))[..], b"$0\r\n\r\n");
}

#[test]
fn test_encode_array() {
    let value = Value::request(["GET", "a"]);
    assert_eq!(&encode_value(&value)[..], b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n");
    assert_eq!(&encode_value(&Value::Array(vec![]))[..], b"*0\r\n");
}

#[test]
fn test_encode_null_is_null_bulk_string() {
    assert_eq!(&encode_value(&Value::Null)[..], b"$-1\r\n");
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_each_variant() {
    assert_eq!(decode(b"+PONG\r\n"), Value::simple("PONG"));
    assert_eq!(decode(b"-ERR x\r\n"), Value::error("ERR x"));
    assert_eq!(decode(b":-7\r\n"), Value::Integer(-7));
    assert_eq!(decode(b"$3\r\nabc\r\n"), Value::bulk("abc"));
    assert_eq!(
        decode(b"*2\r\n:1\r\n+x\r\n"),
        Value::Array(vec![Value::Integer(1), Value::simple("x")])
    );
}

#[test]
fn test_decode_null_bulk_and_null_array() {
    assert_eq!(decode(b"$-1\r\n"), Value::Null);
    assert_eq!(decode(b"*-1\r\n"), Value::Null);
}

#[test]
fn test_null_array_reencodes_as_null_bulk() {
    let value = decode(b"*-1\r\n");
    assert_eq!(&encode_value(&value)[..], b"$-1\r\n");
}

#[test]
fn test_decode_empty_array_is_present() {
    assert_eq!(decode(b"*0\r\n"), Value::Array(vec![]));
}

#[test]
fn test_bulk_string_may_contain_crlf() {
    let value = decode(b"$8\r\nab\r\ncd\r\n\r\n");
    assert_eq!(value, Value::BulkString(Bytes::from_static(b"ab\r\ncd\r\n")));
}

#[test]
fn test_bulk_string_binary_data() {
    let payload: Vec<u8> = (0..=255).collect();
    let encoded = encode_value(&Value::bulk(&payload));
    assert_eq!(decode(&encoded), Value::bulk(&payload));
}

#[test]
fn test_nested_arrays() {
    let value = Value::Array(vec![
        Value::Array(vec![Value::bulk("a"), Value::Null]),
        Value::Integer(3),
        Value::Array(vec![]),
    ]);
    assert_eq!(decode(&encode_value(&value)), value);
}

#[test]
fn test_deeply_nested_array_on_small_stack() {
    const DEPTH: usize = 200_000;

    let handle = thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut input = b"*1\r\n".repeat(DEPTH);
            input.extend_from_slice(b":1\r\n");

            let (value, consumed) = decode_value(&input).unwrap();
            assert_eq!(consumed, input.len());

            let mut depth = 0;
            let mut current = &value;
            while let Value::Array(items) = current {
                assert_eq!(items.len(), 1);
                current = &items[0];
                depth += 1;
            }
            assert_eq!(depth, DEPTH);
            assert_eq!(current, &Value::Integer(1));

            assert!(encode_value(&value) == input);
        })
        .unwrap();

    handle.join().unwrap();
}

#[test]
fn test_deeply_nested_array_truncated() {
    let input = b"*1\r\n".repeat(50_000);
    assert!(matches!(decode_err(&input), KvError::Truncated));
}

#[test]
fn test_decode_consumes_exactly_one_value() {
    let (value, consumed) = decode_value(b"+OK\r\n:1\r\n").unwrap();
    assert_eq!(value, Value::simple("OK"));
    assert_eq!(consumed, 5);
}

#[test]
fn test_read_value_sequential_from_stream() {
    let mut cursor = Cursor::new(b"+a\r\n$1\r\nb\r\n:3\r\n".to_vec());
    assert_eq!(read_value(&mut cursor).unwrap(), Value::simple("a"));
    assert_eq!(read_value(&mut cursor).unwrap(), Value::bulk("b"));
    assert_eq!(read_value(&mut cursor).unwrap(), Value::Integer(3));
    assert!(matches!(read_value(&mut cursor), Err(KvError::EndOfStream)));
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_representative_values() {
    let values = vec![
        Value::simple(""),
        Value::simple("hello world"),
        Value::error("ERR wrong number of arguments for 'SET' command"),
        Value::Integer(0),
        Value::Integer(i64::MAX),
        Value::Integer(i64::MIN),
        Value::bulk(""),
        Value::bulk("line\r\nbreak"),
        Value::Null,
        Value::Array(vec![]),
        Value::request(["HSET", "h", "f1", "v1", "f2", "v2"]),
    ];
    for value in values {
        assert_eq!(decode(&encode_value(&value)), value, "round trip of {:?}", value);
    }
}

#[test]
fn test_write_value_then_read_value() {
    let mut buffer = Vec::new();
    write_value(&mut buffer, &Value::request(["SET", "k", "v"])).unwrap();
    write_value(&mut buffer, &Value::Null).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_value(&mut cursor).unwrap(), Value::request(["SET", "k", "v"]));
    assert_eq!(read_value(&mut cursor).unwrap(), Value::Null);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_unknown_type_marker() {
    match decode_err(b"?what\r\n") {
        KvError::Protocol(msg) => assert!(msg.contains("0x3f"), "message: {}", msg),
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_invalid_integer() {
    assert!(matches!(decode_err(b":12a\r\n"), KvError::Protocol(_)));
    assert!(matches!(decode_err(b"$x\r\nabc\r\n"), KvError::Protocol(_)));
    assert!(matches!(decode_err(b"*\r\n"), KvError::Protocol(_)));
}

#[test]
fn test_negative_lengths_below_null() {
    assert!(matches!(decode_err(b"$-2\r\n"), KvError::Protocol(_)));
    assert!(matches!(decode_err(b"*-5\r\n"), KvError::Protocol(_)));
}

#[test]
fn test_bulk_payload_missing_crlf() {
    assert!(matches!(decode_err(b"$3\r\nabcde"), KvError::Protocol(_)));
}

#[test]
fn test_line_without_carriage_return() {
    assert!(matches!(decode_err(b"+OK\n"), KvError::Protocol(_)));
}

#[test]
fn test_empty_input_is_end_of_stream() {
    assert!(matches!(decode_err(b""), KvError::EndOfStream));
}

#[test]
fn test_truncated_inputs() {
    let cases: [&[u8]; 6] = [
        b"+OK",
        b"+OK\r",
        b"$5\r\nhel",
        b"$5\r\nhello",
        b"*2\r\n$1\r\na\r\n",
        b"*3\r\n",
    ];
    for case in cases {
        let err = decode_err(case);
        assert!(
            matches!(err, KvError::Truncated),
            "{:?} gave {:?}",
            String::from_utf8_lossy(case),
            err
        );
        assert!(err.is_end_of_stream());
    }
}

#[test]
fn test_truncated_distinct_from_malformed() {
    let truncated = decode_err(b"$5\r\nhe");
    let malformed = decode_err(b"!5\r\nhello\r\n");
    assert!(truncated.is_end_of_stream());
    assert!(!malformed.is_end_of_stream());
}
