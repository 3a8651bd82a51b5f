//! Blocking client
//!
//! Sends request arrays and reads one reply per request. Used by the CLI and
//! the integration tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::{read_value, write_value, Value};

pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send an arbitrary value and wait for the reply
    pub fn send(&mut self, value: &Value) -> Result<Value> {
        write_value(&mut self.writer, value)?;
        read_value(&mut self.reader)
    }

    /// Send a command given as its parts, e.g. `["SET", "a", "1"]`
    pub fn request<I, T>(&mut self, parts: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.send(&Value::request(parts))
    }

    pub fn ping(&mut self) -> Result<Value> {
        self.request(["PING"])
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<Value> {
        self.request(["SET", key, value])
    }

    pub fn get(&mut self, key: &str) -> Result<Value> {
        self.request(["GET", key])
    }

    /// `HSET key field value [field value ...]`
    pub fn hset(&mut self, key: &str, pairs: &[(&str, &str)]) -> Result<Value> {
        let mut parts = vec!["HSET", key];
        for &(field, value) in pairs {
            parts.push(field);
            parts.push(value);
        }
        self.request(parts)
    }

    pub fn hget(&mut self, key: &str, field: &str) -> Result<Value> {
        self.request(["HGET", key, field])
    }

    pub fn hgetall(&mut self, key: &str) -> Result<Value> {
        self.request(["HGETALL", key])
    }
}
