//! Server list: the game servers plus this account's character count.

use dwauth_protocol::messages::{ServerList, ServerListEntry};
use dwauth_protocol::{Encode, Frame};
use dwauth_session::AccountDirectory;

use crate::DwauthError;
use crate::dispatcher::Context;

pub(crate) async fn handle<D: AccountDirectory>(ctx: &mut Context<'_, D>, _frame: &Frame) -> Result<(), DwauthError> {
    let (_, username) = ctx.session.require_login()?;
    let username = username.to_string();
    let characters = u8::try_from(ctx.session.character_count).unwrap_or(u8::MAX);

    let servers = ctx.directory.list_servers().await?;
    let list = ServerList {
        entries: servers
            .into_iter()
            .map(|s| ServerListEntry::open(s.id, s.name, characters))
            .collect(),
        username,
    };
    tracing::debug!(conn_id = %ctx.conn.id(), servers = list.entries.len(), "sending server list");
    ctx.conn.send(list.to_frame()).await;
    Ok(())
}
