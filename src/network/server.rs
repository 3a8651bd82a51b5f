//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvError, Result};
use super::Connection;

/// TCP server for RespKV
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    engine: Arc<Engine>,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl Server {
    /// Bind the listener at `config.listen_addr`
    pub fn bind(config: &Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Config(format!("cannot listen on {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            engine,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Accept connections until shut down (blocking)
    ///
    /// Each accepted connection runs on its own thread until the peer closes
    /// or sends a malformed frame. Connections still open at shutdown are left
    /// to finish on their own.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let engine = Arc::clone(&self.engine);
            let spawned = thread::Builder::new()
                .name("respkv-conn".to_string())
                .spawn(move || serve(stream, engine));
            if let Err(e) = spawned {
                tracing::error!("Failed to spawn connection thread: {}", e);
            }
        }

        tracing::info!("Server on {} stopped accepting", self.local_addr);
        Ok(())
    }
}

impl ShutdownHandle {
    /// Stop the accept loop
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wake the blocking accept so it sees the flag.
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            tracing::debug!("Shutdown wake-up connect failed: {}", e);
        }
    }
}

fn serve(stream: TcpStream, engine: Arc<Engine>) {
    let mut connection = match Connection::new(stream, engine) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };
    if let Err(e) = connection.handle() {
        tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
    }
}

/// Wildcard listeners are woken through loopback
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
