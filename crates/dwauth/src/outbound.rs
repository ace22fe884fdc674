//! The send side of a connection, shareable across tasks.

use std::net::SocketAddr;

use bytes::Bytes;
use dwauth_protocol::{Frame, ProtocolError};
use dwauth_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What the writer task puts on the wire.
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(Frame),
    /// Pre-encoded plaintext frame bytes. Encrypted before sending.
    Raw(Bytes),
}

/// Cheap, cloneable handle for sending to one connection and closing it.
///
/// Sends never fail loudly: once the connection is closed they log a
/// warning and return `false`.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    tx: mpsc::Sender<Outbound>,
    close: CancellationToken,
}

impl ConnectionHandle {
    pub(crate) fn new(
        id: ConnectionId,
        peer: SocketAddr,
        tx: mpsc::Sender<Outbound>,
        close: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer,
            tx,
            close,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// `true` once the connection has started closing.
    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled() || self.tx.is_closed()
    }

    /// Queues a frame for encryption and sending.
    ///
    /// Returns `false` if the connection is already closed.
    pub async fn send(&self, frame: Frame) -> bool {
        let opcode = frame.opcode();
        if !self.enqueue(Outbound::Frame(frame)).await {
            tracing::warn!(conn_id = %self.id, opcode, "send on closed connection dropped");
            return false;
        }
        true
    }

    /// Queues already-encoded plaintext frame bytes.
    ///
    /// Empty input is rejected. A closed connection drops the bytes with a
    /// warning and returns `Ok(false)`.
    pub async fn send_raw(&self, bytes: Bytes) -> Result<bool, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        let len = bytes.len();
        if !self.enqueue(Outbound::Raw(bytes)).await {
            tracing::warn!(conn_id = %self.id, len, "raw send on closed connection dropped");
            return Ok(false);
        }
        Ok(true)
    }

    /// Starts closing the connection. Idempotent.
    ///
    /// Frames already queued are still written before the socket closes.
    pub fn close(&self) {
        self.close.cancel();
    }

    async fn enqueue(&self, item: Outbound) -> bool {
        if self.close.is_cancelled() {
            return false;
        }
        self.tx.send(item).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = ConnectionHandle::new(
            ConnectionId::new(1),
            "127.0.0.1:1".parse().unwrap(),
            tx,
            CancellationToken::new(),
        );
        (handle, rx)
    }

    #[tokio::test]
    async fn test_send_queues_frame() {
        let (h, mut rx) = handle(4);
        assert!(h.send(Frame::new(7, vec![1])).await);
        match rx.recv().await {
            Some(Outbound::Frame(f)) => assert_eq!(f.opcode(), 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_after_close_is_noop() {
        let (h, mut rx) = handle(4);
        h.close();
        h.close();
        assert!(h.is_closed());
        assert!(!h.send(Frame::new(7, vec![])).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_after_writer_gone_is_noop() {
        let (h, rx) = handle(4);
        drop(rx);
        assert!(!h.send(Frame::new(1, vec![])).await);
        assert!(h.is_closed());
    }

    #[tokio::test]
    async fn test_send_raw_rejects_empty() {
        let (h, _rx) = handle(4);
        assert!(matches!(
            h.send_raw(Bytes::new()).await,
            Err(ProtocolError::EmptyPayload)
        ));
        assert!(h.send_raw(Bytes::from_static(&[4, 0, 1, 0])).await.unwrap());
    }
}
