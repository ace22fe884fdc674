//! Handshake: echo the masked token back.
//!
//! The token is a liveness probe only. Nothing the client sends is checked
//! against it and no later opcode depends on it.

use dwauth_protocol::messages::{HandshakeAck, HandshakeRequest};
use dwauth_protocol::{Decode, Encode, Frame};
use dwauth_session::AccountDirectory;

use crate::DwauthError;
use crate::dispatcher::Context;

pub(crate) async fn handle<D: AccountDirectory>(ctx: &mut Context<'_, D>, frame: &Frame) -> Result<(), DwauthError> {
    let req = HandshakeRequest::from_frame(frame)?;
    tracing::debug!(
        conn_id = %ctx.conn.id(),
        first = req.first,
        second = req.second,
        "handshake"
    );
    ctx.conn
        .send(HandshakeAck::for_token(ctx.session.handshake_token).to_frame())
        .await;
    Ok(())
}
