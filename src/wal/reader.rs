//! Log Reader
//!
//! Reads records back from a log file, tracking the byte offset of the end of
//! the last complete record.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::protocol::{read_value, Value};

/// Reads records sequentially from a log
pub struct WalReader<R> {
    inner: Counting<BufReader<R>>,

    /// Offset just past the last complete record
    position: u64,

    /// Set once the iterator has yielded an error
    done: bool,
}

impl WalReader<File> {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> WalReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            inner: Counting {
                inner: BufReader::new(source),
                consumed: 0,
            },
            position: 0,
            done: false,
        }
    }

    /// Read the next record, `None` at a clean end of file
    pub fn next_record(&mut self) -> Result<Option<Value>> {
        match read_value(&mut self.inner) {
            Ok(value) => {
                self.position = self.inner.consumed;
                Ok(Some(value))
            }
            Err(KvError::EndOfStream) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Offset just past the last complete record
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes consumed from the source so far, including a partial record
    pub fn consumed(&self) -> u64 {
        self.inner.consumed
    }
}

impl<R: Read> Iterator for WalReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// BufRead adapter that counts consumed bytes
struct Counting<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> Read for Counting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Counting<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.consumed += amt as u64;
    }
}
