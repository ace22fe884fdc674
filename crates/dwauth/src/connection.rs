//! Per-connection tasks: read, dispatch, write.
//!
//! Each accepted connection runs as three tasks joined by two queues:
//!
//! ```text
//! socket ─► reader ─► [inbound] ─► dispatch ─► [outbound] ─► writer ─► socket
//!           (codec)                (handlers,               (cipher)
//!                                   owns Session)
//! ```
//!
//! Two tokens drive teardown. Server shutdown only stops the reader, so
//! handlers already queued still run and their replies still go out. The
//! per-connection `close` token stops the writer and refuses new sends; it
//! is cancelled once dispatch has drained, by a handle's `close`, or by the
//! writer on a send error. Nobody touches the socket directly. Each half is
//! dropped exactly once, when its task ends, and the registry entry is
//! removed exactly once on the way out.

use std::sync::Arc;

use bytes::BytesMut;
use dwauth_protocol::messages::Greeting;
use dwauth_protocol::{Encode, Frame, FrameCodec, FrameEncoder, ProtocolError};
use dwauth_session::{AccountDirectory, Session};
use dwauth_transport::{ConnectionId, ConnectionReader, ConnectionWriter, TcpConnection};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{Context, dispatch};
use crate::outbound::Outbound;
use crate::server::Shared;
use crate::ConnectionHandle;

/// Frames reassembled but not yet dispatched.
const INBOUND_QUEUE: usize = 64;

/// Drop guard that removes the connection from the registry if the task
/// ends without reaching its normal close path (abort, panic).
///
/// `Drop` is synchronous, so the async lock is taken on a spawned task.
struct RegistryGuard<D: AccountDirectory> {
    id: ConnectionId,
    shared: Arc<Shared<D>>,
    armed: bool,
}

impl<D: AccountDirectory> RegistryGuard<D> {
    /// Removes the entry now and disarms the guard.
    async fn release(mut self) {
        self.armed = false;
        self.shared.registry.lock().await.remove(self.id);
    }
}

impl<D: AccountDirectory> Drop for RegistryGuard<D> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let id = self.id;
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let removed = shared.registry.lock().await.remove(id).is_some();
            if removed {
                tracing::debug!(conn_id = %id, "removed from registry");
            }
        });
    }
}

/// Runs one connection from accept to close.
pub(crate) async fn run_connection<D: AccountDirectory>(conn: TcpConnection, shared: Arc<Shared<D>>) {
    let id = conn.id();
    let peer = conn.peer_addr();
    let close = CancellationToken::new();
    let stop_reading = shared.shutdown.child_token();
    let force = shared.force.child_token();

    let (out_tx, out_rx) = mpsc::channel(shared.config.outbound_queue);
    let handle = ConnectionHandle::new(id, peer, out_tx, close.clone());
    shared.registry.lock().await.insert(handle.clone());
    let guard = RegistryGuard {
        id,
        shared: Arc::clone(&shared),
        armed: true,
    };
    tracing::info!(conn_id = %id, %peer, "connection accepted");

    let session = Session::new(peer, (shared.tokens)());
    handle
        .send(Greeting::for_token(session.handshake_token).to_frame())
        .await;

    let (reader, writer) = conn.into_split();
    let encoder = FrameEncoder::new(shared.cipher.clone(), shared.config.max_frame_size);
    let writer_task = tokio::spawn(write_loop(writer, out_rx, encoder, close.clone(), force.clone()));

    let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE);
    let dispatch_task = tokio::spawn(dispatch_loop(
        session,
        in_rx,
        handle.clone(),
        Arc::clone(&shared),
        force,
    ));

    let codec = FrameCodec::new(shared.cipher.clone(), shared.config.codec_limits());
    read_loop(reader, codec, in_tx, &stop_reading, &close).await;

    // Inbound is closed now; dispatch drains what was queued, then the
    // writer flushes the replies.
    if let Err(e) = dispatch_task.await {
        tracing::error!(conn_id = %id, error = %e, "dispatch task failed");
    }
    close.cancel();
    if let Err(e) = writer_task.await {
        tracing::error!(conn_id = %id, error = %e, "writer task failed");
    }
    guard.release().await;
    tracing::info!(conn_id = %id, %peer, "connection closed");
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

async fn read_loop(
    mut reader: ConnectionReader,
    mut codec: FrameCodec,
    inbound: mpsc::Sender<Frame>,
    stop: &CancellationToken,
    close: &CancellationToken,
) {
    let id = reader.id();
    loop {
        let received = tokio::select! {
            _ = stop.cancelled() => {
                tracing::debug!(conn_id = %id, "read loop stopped by shutdown");
                return;
            }
            _ = close.cancelled() => {
                tracing::debug!(conn_id = %id, "read loop cancelled");
                return;
            }
            r = reader.recv() => r,
        };
        let bytes = match received {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(conn_id = %id, "peer closed connection");
                return;
            }
            Err(e) => {
                tracing::debug!(conn_id = %id, error = %e, "read failed");
                return;
            }
        };
        tracing::trace!(conn_id = %id, len = bytes.len(), "received bytes");

        for frame in codec.feed(bytes) {
            if inbound.send(frame).await.is_err() {
                return;
            }
        }
        if let Err(e) = codec.check_violations() {
            tracing::warn!(
                conn_id = %id,
                error = %e,
                last = ?codec.last_violation(),
                "closing abusive connection"
            );
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

async fn dispatch_loop<D: AccountDirectory>(
    mut session: Session,
    mut inbound: mpsc::Receiver<Frame>,
    conn: ConnectionHandle,
    shared: Arc<Shared<D>>,
    force: CancellationToken,
) {
    while let Some(frame) = inbound.recv().await {
        let mut ctx = Context {
            session: &mut session,
            conn: &conn,
            directory: shared.directory.as_ref(),
            config: &shared.config,
        };
        tokio::select! {
            _ = force.cancelled() => {
                tracing::warn!(
                    conn_id = %conn.id(),
                    opcode = frame.opcode(),
                    "abandoning in-flight handler"
                );
                return;
            }
            () = dispatch(&mut ctx, &frame) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

async fn write_loop(
    mut writer: ConnectionWriter,
    mut outbound: mpsc::Receiver<Outbound>,
    encoder: FrameEncoder,
    close: CancellationToken,
    force: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            biased;
            item = outbound.recv() => match item {
                Some(item) => item,
                None => break,
            },
            _ = close.cancelled() => break,
            _ = force.cancelled() => return,
        };
        if !write_one(&mut writer, &encoder, item, &force).await {
            close.cancel();
            return;
        }
    }

    // Flush what was queued before the close.
    let id = writer.id();
    while let Ok(item) = outbound.try_recv() {
        if !write_one(&mut writer, &encoder, item, &force).await {
            return;
        }
    }
    tokio::select! {
        _ = force.cancelled() => {}
        r = writer.shutdown() => {
            if let Err(e) = r {
                tracing::debug!(conn_id = %id, error = %e, "shutdown failed");
            }
        }
    }
}

/// Encrypts and writes one item. Returns `false` if the socket is unusable.
async fn write_one(
    writer: &mut ConnectionWriter,
    encoder: &FrameEncoder,
    item: Outbound,
    force: &CancellationToken,
) -> bool {
    let id = writer.id();
    let wire = match encode(encoder, item) {
        Ok(wire) => wire,
        Err(e) => {
            // Bad frame from a handler; the connection itself is fine.
            tracing::warn!(conn_id = %id, error = %e, "dropping unencodable frame");
            return true;
        }
    };
    let result = tokio::select! {
        _ = force.cancelled() => return false,
        r = writer.send(&wire) => r,
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(conn_id = %id, error = %e, "write failed");
            false
        }
    }
}

fn encode(encoder: &FrameEncoder, item: Outbound) -> Result<bytes::Bytes, ProtocolError> {
    match item {
        Outbound::Frame(frame) => {
            tracing::debug!(opcode = frame.opcode(), len = frame.wire_len(), "sending frame");
            encoder.encode(&frame)
        }
        Outbound::Raw(raw) => {
            let mut buf = BytesMut::from(&raw[..]);
            encoder.cipher().encrypt(&mut buf);
            Ok(buf.freeze())
        }
    }
}
