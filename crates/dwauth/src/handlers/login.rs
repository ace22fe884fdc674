//! Login: check credentials and report the outcome.

use dwauth_protocol::messages::{LoginBanned, LoginRequest, LoginResult};
use dwauth_protocol::{Decode, Encode, Frame};
use dwauth_session::{AccountDirectory, AuthOutcome};

use crate::DwauthError;
use crate::dispatcher::Context;

pub(crate) async fn handle<D: AccountDirectory>(ctx: &mut Context<'_, D>, frame: &Frame) -> Result<(), DwauthError> {
    let req = LoginRequest::from_frame(frame)?;
    let conn_id = ctx.conn.id();
    tracing::info!(
        %conn_id,
        username = %req.username,
        net_version = req.net_version,
        os = %req.os,
        memory_kib = req.physical_memory / 1024,
        "login request"
    );

    if ctx.config.auto_create_accounts {
        if let Err(e) = ctx.directory.ensure_account(&req.username, &req.password).await {
            tracing::warn!(%conn_id, username = %req.username, error = %e, "auto-provisioning failed");
        }
    }

    let outcome = match ctx.directory.authenticate(&req.username, &req.password).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // A directory that cannot answer locks the client out like a ban.
            tracing::error!(%conn_id, username = %req.username, error = %e, "credential check failed");
            AuthOutcome::Banned
        }
    };

    let reply = match outcome {
        AuthOutcome::Granted(account) => {
            let characters = ctx.directory.count_characters(account.account_id).await?;
            ctx.session.authenticate(&req.username, account, characters);
            tracing::info!(
                %conn_id,
                username = %req.username,
                account_id = account.account_id,
                access_level = account.access_level,
                characters,
                "login succeeded"
            );
            LoginResult::success().to_frame()
        }
        AuthOutcome::WrongPassword => {
            tracing::info!(%conn_id, username = %req.username, "login rejected: wrong password");
            LoginResult::wrong_password().to_frame()
        }
        AuthOutcome::NotFound => {
            tracing::info!(%conn_id, username = %req.username, "login rejected: unknown user");
            LoginResult::unknown_user().to_frame()
        }
        AuthOutcome::Banned => {
            tracing::info!(%conn_id, username = %req.username, "login rejected: banned");
            LoginBanned::permanent().to_frame()
        }
    };
    ctx.conn.send(reply).await;
    Ok(())
}
