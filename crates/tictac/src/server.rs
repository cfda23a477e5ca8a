//! `TictacServer` builder and accept loop.
//!
//! This is the entry point for running a tictac server. It ties together
//! all the layers: transport → protocol → session → registry/games.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tictac_transport::{Connection, TcpTransport, Transport};

use crate::TictacError;
use crate::handler::handle_connection;
use crate::registry::Registry;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Server settings.
///
/// Everything has a sensible default; override fields through
/// [`TictacServerBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `"0.0.0.0:4000"`.
    pub bind_addr: String,

    /// Longest single wait for a new connection before the accept loop
    /// re-checks the shutdown flag. Default: 3 seconds.
    pub accept_poll_interval: Duration,

    /// How long a new connection has to send CONNECT. `None` waits
    /// forever. Default: 5 seconds.
    pub handshake_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            accept_poll_interval: Duration::from_secs(3),
            handshake_timeout: Some(Duration::from_secs(5)),
        }
    }
}

// ---------------------------------------------------------------------------
// ShutdownHandle
// ---------------------------------------------------------------------------

/// Stops a running server's accept loop.
///
/// Cloneable and usable from any task. Stopping is cooperative: the
/// loop notices within one `accept_poll_interval`. Connections that are
/// already open keep running until their peers leave.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    stopped: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a tictac server.
///
/// # Example
///
/// ```rust,ignore
/// let server = TictacServer::builder()
///     .bind("0.0.0.0:4000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct TictacServerBuilder {
    config: ServerConfig,
}

impl TictacServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn accept_poll_interval(mut self, interval: Duration) -> Self {
        self.config.accept_poll_interval = interval;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a TCP listener and returns a server ready to [`run`](TictacServer::run).
    pub async fn build(self) -> Result<TictacServer, TictacError> {
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;
        Ok(TictacServer {
            transport,
            registry: Arc::new(Registry::new()),
            config: self.config,
            shutdown: ShutdownHandle::default(),
        })
    }
}

impl Default for TictacServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A tictac server bound to a TCP listener.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TictacServer {
    transport: TcpTransport,
    registry: Arc<Registry>,
    config: ServerConfig,
    shutdown: ShutdownHandle,
}

impl TictacServer {
    /// Creates a new builder.
    pub fn builder() -> TictacServerBuilder {
        TictacServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TictacError> {
        Ok(self.transport.local_addr()?)
    }

    /// The shared registry. Mostly useful for tests and diagnostics.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// A handle that stops [`run`](Self::run) from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs the accept loop until [`ShutdownHandle::stop`] is called.
    ///
    /// Each accepted connection gets its own handler task. A failed
    /// accept is logged and the loop continues.
    pub async fn run(mut self) -> Result<(), TictacError> {
        tracing::info!(addr = %self.config.bind_addr, "tictac server running");

        while !self.shutdown.is_stopped() {
            let accepted =
                match tokio::time::timeout(self.config.accept_poll_interval, self.transport.accept())
                    .await
                {
                    Ok(accepted) => accepted,
                    Err(_) => continue,
                };

            match accepted {
                Ok(conn) => {
                    let registry = Arc::clone(&self.registry);
                    let handshake_timeout = self.config.handshake_timeout;
                    let conn_id = conn.id();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, registry, handshake_timeout).await {
                            tracing::debug!(%conn_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }

        tracing::info!("tictac server stopped");
        Ok(())
    }
}
