//! Server selection: hand out the game server address and a fresh
//! session id.

use dwauth_protocol::messages::{ServerIp, ServerIpRequest};
use dwauth_protocol::{Decode, Encode, Frame};
use dwauth_session::{AccountDirectory, mint_unique_id};

use crate::DwauthError;
use crate::dispatcher::Context;

pub(crate) async fn handle<D: AccountDirectory>(ctx: &mut Context<'_, D>, frame: &Frame) -> Result<(), DwauthError> {
    let req = ServerIpRequest::from_frame(frame)?;
    let (_, username) = ctx.session.require_login()?;
    let username = username.to_string();
    let conn_id = ctx.conn.id();

    let Some(server) = ctx.directory.server_by_id(req.server_id).await? else {
        tracing::warn!(%conn_id, server_id = req.server_id, "unknown server requested");
        return Ok(());
    };

    // Refresh the binding; the account may have changed since login.
    if let Some(account) = ctx.directory.find_account(&username).await? {
        ctx.session.rebind(account);
    }
    let (account_id, _) = ctx.session.require_login()?;
    let unique_id = mint_unique_id();
    ctx.directory.bind_unique_id(account_id, unique_id).await?;
    ctx.session.unique_id = Some(unique_id);

    tracing::info!(
        %conn_id,
        %username,
        server = %server.name,
        ip = %server.ip,
        port = server.port,
        "server selected"
    );
    let reply = ServerIp {
        ip: server.ip,
        port: u32::from(server.port),
        account_id,
        unique_id,
    };
    ctx.conn.send(reply.to_frame()).await;
    Ok(())
}
