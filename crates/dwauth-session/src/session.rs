//! The per-connection session record.

use std::net::SocketAddr;

use rand::Rng;

use crate::{AccountInfo, SessionError};

/// Everything the server knows about one connection.
///
/// Created at accept and owned by that connection's dispatch task; nothing
/// else mutates it. Account fields stay empty until login succeeds.
#[derive(Debug, Clone)]
pub struct Session {
    /// Remote address of the client.
    pub peer: SocketAddr,

    /// Liveness token sent, masked, in the greeting.
    pub handshake_token: u16,

    pub username: Option<String>,
    pub account_id: Option<u32>,
    pub access_level: i32,

    /// Session id handed to the game server, minted on server selection.
    pub unique_id: Option<u32>,

    pub character_count: u32,
}

impl Session {
    /// A fresh session with the given handshake token.
    pub fn new(peer: SocketAddr, handshake_token: u16) -> Self {
        Self {
            peer,
            handshake_token,
            username: None,
            account_id: None,
            access_level: 0,
            unique_id: None,
            character_count: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    /// Records a successful login.
    pub fn authenticate(&mut self, username: impl Into<String>, account: AccountInfo, characters: u32) {
        self.username = Some(username.into());
        self.account_id = Some(account.account_id);
        self.access_level = account.access_level;
        self.character_count = characters;
    }

    /// Refreshes the account binding from a fresh directory lookup.
    pub fn rebind(&mut self, account: AccountInfo) {
        self.account_id = Some(account.account_id);
        self.access_level = account.access_level;
    }

    /// The logged-in account id and username.
    pub fn require_login(&self) -> Result<(u32, &str), SessionError> {
        match (self.account_id, self.username.as_deref()) {
            (Some(id), Some(name)) => Ok((id, name)),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}

/// Mints a handshake token. Not a secret; any value works.
pub fn mint_handshake_token() -> u16 {
    rand::rng().random()
}

/// Mints a game-server session id in `1..=i32::MAX`.
pub fn mint_unique_id() -> u32 {
    rand::rng().random_range(1..=i32::MAX as u32)
}
