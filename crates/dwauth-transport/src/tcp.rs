//! Plain TCP listener and split connection halves.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::{ConnectionId, TransportError};

/// Bytes requested from the socket per read.
pub const READ_CHUNK: usize = 4096;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Listens for incoming client connections.
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds the listener. A failure here is fatal to the caller.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::AcceptFailed)
    }

    /// Waits for and accepts the next connection.
    ///
    /// The socket gets `TCP_NODELAY`; failing to set it is logged and the
    /// connection is kept.
    pub async fn accept(&self) -> Result<TcpConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(%id, %peer, error = %e, "could not disable send coalescing");
        }
        tracing::debug!(%id, %peer, "accepted TCP connection");

        Ok(TcpConnection { id, peer, stream })
    }
}

/// One accepted connection, before it is split.
#[derive(Debug)]
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
}

impl TcpConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Splits into independently owned read and write halves.
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        let (read, write) = self.stream.into_split();
        (
            ConnectionReader {
                id: self.id,
                half: read,
                buf: vec![0; READ_CHUNK],
            },
            ConnectionWriter {
                id: self.id,
                half: write,
            },
        )
    }
}

/// Read half of a connection.
#[derive(Debug)]
pub struct ConnectionReader {
    id: ConnectionId,
    half: OwnedReadHalf,
    buf: Vec<u8>,
}

impl ConnectionReader {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Receives the next chunk of bytes.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    pub async fn recv(&mut self) -> Result<Option<&[u8]>, TransportError> {
        let n = self
            .half
            .read(&mut self.buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buf[..n]))
    }
}

/// Write half of a connection.
#[derive(Debug)]
pub struct ConnectionWriter {
    id: ConnectionId,
    half: OwnedWriteHalf,
}

impl ConnectionWriter {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Writes all of `data` to the socket.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.half
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Shuts down the write direction, flushing anything pending.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.half
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }
}
