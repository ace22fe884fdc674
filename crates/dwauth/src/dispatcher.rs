//! Opcode routing.

use dwauth_protocol::{Frame, hex_dump, opcode};
use dwauth_session::{AccountDirectory, Session};

use crate::handlers;
use crate::{ConnectionHandle, DwauthError, ServerConfig};

/// What a handler gets to work with.
pub(crate) struct Context<'a, D: AccountDirectory> {
    pub(crate) session: &'a mut Session,
    pub(crate) conn: &'a ConnectionHandle,
    pub(crate) directory: &'a D,
    pub(crate) config: &'a ServerConfig,
}

/// Runs the handler for one frame.
///
/// Never fails and never closes the connection: handler errors and unknown
/// opcodes are logged with a dump of the frame.
pub(crate) async fn dispatch<D: AccountDirectory>(ctx: &mut Context<'_, D>, frame: &Frame) {
    let op = frame.opcode();
    tracing::debug!(
        conn_id = %ctx.conn.id(),
        opcode = op,
        name = opcode::name(op),
        len = frame.wire_len(),
        "dispatching frame"
    );

    let result = match op {
        opcode::HANDSHAKE => handlers::handshake::handle(ctx, frame).await,
        opcode::LOGIN => handlers::login::handle(ctx, frame).await,
        opcode::SERVER_LIST => handlers::server_list::handle(ctx, frame).await,
        opcode::SERVER_IP => handlers::server_ip::handle(ctx, frame).await,
        opcode::KEEP_ALIVE => Ok(()),
        _ => {
            tracing::warn!(
                conn_id = %ctx.conn.id(),
                opcode = op,
                hex = %format!("{:#06x}", op as u16),
                transport = opcode::is_transport(op),
                len = frame.wire_len(),
                "unknown opcode\n{}",
                dump(frame)
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        match e {
            DwauthError::Protocol(_) => tracing::warn!(
                conn_id = %ctx.conn.id(),
                opcode = op,
                error = %e,
                "malformed payload\n{}",
                dump(frame)
            ),
            _ => tracing::warn!(conn_id = %ctx.conn.id(), opcode = op, error = %e, "handler failed"),
        }
    }
}

/// Hex dump of the whole frame as it arrived, after decryption.
fn dump(frame: &Frame) -> String {
    match frame.encode() {
        Ok(raw) => hex_dump(&raw),
        Err(_) => hex_dump(frame.payload()),
    }
}
