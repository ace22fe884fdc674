//! TCP transport for the dwauth auth server.
//!
//! [`TcpTransport`] owns the listening socket. Every accepted
//! [`TcpConnection`] is configured for low latency and can be split into a
//! [`ConnectionReader`] and a [`ConnectionWriter`] so reads and writes run
//! on separate tasks. Each half owns its side of the socket; dropping both
//! closes it.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{ConnectionReader, ConnectionWriter, READ_CHUNK, TcpConnection, TcpTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
