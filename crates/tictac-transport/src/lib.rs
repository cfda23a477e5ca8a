//! Transport abstraction layer for tictac.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! an ordered, reliable byte stream. The server only ever sees these
//! traits; [`TcpTransport`] / [`TcpConnection`] are the implementation
//! used in production and in tests.
//!
//! A connection is split into an independent read half and write half
//! right after accept: one task owns the reader, another owns the writer,
//! and neither has to lock the other out.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique number for a connection, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Hands out the next id. Ids start at 1 and are never reused.
    pub fn allocate() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener the server accepts players from.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next connected peer.
    ///
    /// Callers that need to stop cooperatively wrap this in a timeout;
    /// dropping the future does not lose a connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address this transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A single accepted (or dialed) connection.
pub trait Connection: Send + 'static {
    /// Read half, handed to the connection's reader task.
    type Reader: AsyncRead + Send + Unpin + 'static;
    /// Write half, handed to the connection's writer task.
    type Writer: AsyncWrite + Send + Unpin + 'static;

    fn id(&self) -> ConnectionId;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;

    /// Splits the connection into owned halves.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}
