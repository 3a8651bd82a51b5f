//! Background flusher
//!
//! Periodically flushes and fsyncs the log. Stopped deterministically when the
//! log is closed or dropped.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use super::writer::LogFile;

pub(crate) struct Flusher {
    /// Dropping this wakes the thread and ends its loop
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    pub(crate) fn spawn(file: Arc<Mutex<LogFile>>, period: Duration) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("respkv-log-flusher".to_string())
            .spawn(move || {
                let ticker = channel::tick(period);
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => file.lock().background_sync(),
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                tracing::trace!("Log flusher stopped");
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to exit
    pub(crate) fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Log flusher thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
