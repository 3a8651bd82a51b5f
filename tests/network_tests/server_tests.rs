//! Server Tests
//!
//! These tests verify:
//! - Commands over real TCP connections
//! - Pipelined requests are answered in order
//! - Malformed frames close the connection without a reply
//! - Shutdown and restart

use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use respkv::config::{Config, WalSyncStrategy};
use respkv::engine::Engine;
use respkv::network::{Client, Server, ShutdownHandle};
use respkv::protocol::{encode_value, read_value};
use respkv::Value;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct RunningServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: JoinHandle<()>,
    engine: Arc<Engine>,
}

impl RunningServer {
    fn stop(self) -> Arc<Engine> {
        self.shutdown.shutdown();
        self.thread.join().unwrap();
        self.engine
    }
}

fn start_server(aof_path: &Path) -> RunningServer {
    let config = Config::builder()
        .aof_path(aof_path)
        .sync_strategy(WalSyncStrategy::EveryWrite)
        .listen_addr("127.0.0.1:0")
        .build();
    let engine = Arc::new(Engine::open(config.clone()).unwrap());
    let server = Server::bind(&config, Arc::clone(&engine)).unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let thread = thread::spawn(move || {
        server.run().unwrap();
    });

    RunningServer {
        addr,
        shutdown,
        thread,
        engine,
    }
}

fn connect_raw(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_ping_over_tcp() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut client = Client::connect(server.addr).unwrap();
    assert_eq!(client.ping().unwrap(), Value::simple("PONG"));
    assert_eq!(
        client.request(["PING", "hello"]).unwrap(),
        Value::simple("hello")
    );

    server.stop();
}

#[test]
fn test_string_commands_over_tcp() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut client = Client::connect(server.addr).unwrap();
    assert_eq!(client.set("a", "1").unwrap(), Value::ok());
    assert_eq!(client.get("a").unwrap(), Value::bulk("1"));
    assert_eq!(client.get("missing").unwrap(), Value::Null);

    server.stop();
}

#[test]
fn test_hash_commands_over_tcp() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut client = Client::connect(server.addr).unwrap();
    assert_eq!(
        client.hset("h", &[("f1", "v1"), ("f2", "v2")]).unwrap(),
        Value::ok()
    );
    assert_eq!(client.hget("h", "f2").unwrap(), Value::bulk("v2"));
    assert_eq!(client.hget("h", "nope").unwrap(), Value::Null);

    let reply = client.hgetall("h").unwrap();
    let Value::Array(items) = &reply else {
        panic!("Expected array reply");
    };
    let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = items
        .chunks(2)
        .map(|pair| {
            (
                pair[0].as_bytes().unwrap().to_vec(),
                pair[1].as_bytes().unwrap().to_vec(),
            )
        })
        .collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            (b"f1".to_vec(), b"v1".to_vec()),
            (b"f2".to_vec(), b"v2".to_vec()),
        ]
    );

    server.stop();
}

#[test]
fn test_error_replies_keep_connection_open() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut client = Client::connect(server.addr).unwrap();
    assert_eq!(
        client.request(["HSET", "h", "f1"]).unwrap(),
        Value::error("ERR wrong number of arguments for 'HSET' command")
    );
    assert_eq!(client.request(["NOPE"]).unwrap(), Value::simple(""));
    assert!(client.send(&Value::Integer(3)).unwrap().is_error());
    assert_eq!(client.ping().unwrap(), Value::simple("PONG"));

    server.stop();
}

#[test]
fn test_clients_see_each_others_writes() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut writer = Client::connect(server.addr).unwrap();
    let mut reader = Client::connect(server.addr).unwrap();
    writer.set("shared", "value").unwrap();
    assert_eq!(reader.get("shared").unwrap(), Value::bulk("value"));

    server.stop();
}

#[test]
fn test_many_concurrent_clients() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));
    let addr = server.addr;

    let handles: Vec<_> = (0..8)
        .map(|t| {
            thread::spawn(move || {
                let mut client = Client::connect(addr).unwrap();
                for i in 0..25 {
                    let key = format!("c{}-{}", t, i);
                    assert_eq!(client.set(&key, &key).unwrap(), Value::ok());
                    assert_eq!(client.get(&key).unwrap(), Value::bulk(&key));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let engine = server.stop();
    assert_eq!(engine.store().string_len(), 200);
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_pipelined_requests_answered_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut stream = connect_raw(server.addr);
    let mut batch = Vec::new();
    batch.extend_from_slice(&encode_value(&Value::request(["SET", "a", "1"])));
    batch.extend_from_slice(&encode_value(&Value::request(["GET", "a"])));
    batch.extend_from_slice(&encode_value(&Value::request(["PING"])));
    stream.write_all(&batch).unwrap();

    let mut reader = BufReader::new(stream.try_clone().unwrap());
    assert_eq!(read_value(&mut reader).unwrap(), Value::ok());
    assert_eq!(read_value(&mut reader).unwrap(), Value::bulk("1"));
    assert_eq!(read_value(&mut reader).unwrap(), Value::simple("PONG"));

    server.stop();
}

#[test]
fn test_request_split_across_writes() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut stream = connect_raw(server.addr);
    let frame = encode_value(&Value::request(["SET", "split", "yes"]));
    let (head, tail) = frame.split_at(7);
    stream.write_all(head).unwrap();
    stream.flush().unwrap();
    thread::sleep(Duration::from_millis(20));
    stream.write_all(tail).unwrap();

    let mut reader = BufReader::new(stream.try_clone().unwrap());
    assert_eq!(read_value(&mut reader).unwrap(), Value::ok());

    let engine = server.stop();
    assert_eq!(engine.store().get_string(b"split").as_deref(), Some(&b"yes"[..]));
}

#[test]
fn test_exact_reply_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut stream = connect_raw(server.addr);
    stream.write_all(b"*1\r\n$4\r\nPING\r\n").unwrap();
    let mut reply = [0u8; 7];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"+PONG\r\n");

    stream.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nz\r\n").unwrap();
    let mut reply = [0u8; 5];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"$-1\r\n");

    server.stop();
}

#[test]
fn test_malformed_frame_closes_connection_without_reply() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut stream = connect_raw(server.addr);
    stream.write_all(b"?bogus\r\n").unwrap();

    let mut received = Vec::new();
    match stream.read_to_end(&mut received) {
        Ok(_) => assert!(received.is_empty()),
        Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
    }

    // The server keeps accepting other clients
    let mut client = Client::connect(server.addr).unwrap();
    assert_eq!(client.ping().unwrap(), Value::simple("PONG"));

    server.stop();
}

#[test]
fn test_deeply_nested_request_gets_error_reply() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let mut stream = connect_raw(server.addr);
    let mut frame = b"*1\r\n".repeat(200_000);
    frame.extend_from_slice(b"$4\r\nPING\r\n");
    stream.write_all(&frame).unwrap();

    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let reply = read_value(&mut reader).unwrap();
    match &reply {
        Value::Error(message) => assert!(message.starts_with("ERR invalid request")),
        other => panic!("Expected error reply, got {:?}", other),
    }

    // Same connection still served
    stream.write_all(&encode_value(&Value::request(["PING"]))).unwrap();
    assert_eq!(read_value(&mut reader).unwrap(), Value::simple("PONG"));

    server.stop();
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_shutdown_stops_accept_loop() {
    let temp_dir = TempDir::new().unwrap();
    let server = start_server(&temp_dir.path().join("database.aof"));

    let handle = server.shutdown.clone();
    handle.shutdown();
    // A second call is a no-op
    handle.shutdown();

    server.thread.join().unwrap();
}

#[test]
fn test_data_survives_server_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("database.aof");

    let server = start_server(&path);
    let mut client = Client::connect(server.addr).unwrap();
    client.set("x", "9").unwrap();
    client.hset("h", &[("f", "v")]).unwrap();
    drop(client);
    let engine = server.stop();
    engine.close().unwrap();
    drop(engine);

    let server = start_server(&path);
    let mut client = Client::connect(server.addr).unwrap();
    assert_eq!(client.get("x").unwrap(), Value::bulk("9"));
    assert_eq!(client.hget("h", "f").unwrap(), Value::bulk("v"));

    server.stop();
}
