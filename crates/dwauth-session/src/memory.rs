//! In-memory account directory.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{AccountDirectory, AccountInfo, AuthOutcome, ServerRecord, SessionError};

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub account_id: u32,
    pub username: String,
    pub password: String,
    pub access_level: i32,
    pub banned: bool,
    pub characters: u32,
    pub unique_id: Option<u32>,
}

impl AccountRecord {
    pub fn new(account_id: u32, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_id,
            username: username.into(),
            password: password.into(),
            access_level: 0,
            banned: false,
            characters: 0,
            unique_id: None,
        }
    }

    fn info(&self) -> AccountInfo {
        AccountInfo {
            account_id: self.account_id,
            access_level: self.access_level,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by username.
    accounts: HashMap<String, AccountRecord>,
    servers: Vec<ServerRecord>,
}

impl Inner {
    fn next_account_id(&self) -> u32 {
        self.accounts
            .values()
            .map(|a| a.account_id)
            .max()
            .unwrap_or(0)
            + 1
    }

    fn by_id_mut(&mut self, account_id: u32) -> Option<&mut AccountRecord> {
        self.accounts
            .values_mut()
            .find(|a| a.account_id == account_id)
    }
}

/// [`AccountDirectory`] backed by a map behind a mutex.
///
/// Seed it with the builder methods, then share it with the server.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a game server to the list.
    pub fn with_server(mut self, server: ServerRecord) -> Self {
        self.inner.get_mut().servers.push(server);
        self
    }

    /// Adds or replaces an account.
    pub fn with_account(mut self, account: AccountRecord) -> Self {
        self.inner
            .get_mut()
            .accounts
            .insert(account.username.clone(), account);
        self
    }

    /// A copy of a stored account.
    pub async fn account(&self, username: &str) -> Option<AccountRecord> {
        self.inner.lock().await.accounts.get(username).cloned()
    }

    pub async fn set_banned(&self, username: &str, banned: bool) -> bool {
        match self.inner.lock().await.accounts.get_mut(username) {
            Some(account) => {
                account.banned = banned;
                true
            }
            None => false,
        }
    }

    pub async fn account_count(&self) -> usize {
        self.inner.lock().await.accounts.len()
    }
}

impl AccountDirectory for MemoryDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthOutcome, SessionError> {
        let inner = self.inner.lock().await;
        let Some(account) = inner.accounts.get(username) else {
            return Ok(AuthOutcome::NotFound);
        };
        if account.banned {
            return Ok(AuthOutcome::Banned);
        }
        if account.password != password {
            return Ok(AuthOutcome::WrongPassword);
        }
        Ok(AuthOutcome::Granted(account.info()))
    }

    async fn list_servers(&self) -> Result<Vec<ServerRecord>, SessionError> {
        Ok(self.inner.lock().await.servers.clone())
    }

    async fn count_characters(&self, account_id: u32) -> Result<u32, SessionError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.account_id == account_id)
            .map_or(0, |a| a.characters))
    }

    async fn server_by_id(&self, id: i32) -> Result<Option<ServerRecord>, SessionError> {
        let inner = self.inner.lock().await;
        Ok(inner.servers.iter().find(|s| s.id == id).cloned())
    }

    async fn ensure_account(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.accounts.contains_key(username) {
            return Ok(());
        }
        let account_id = inner.next_account_id();
        inner.accounts.insert(
            username.to_string(),
            AccountRecord::new(account_id, username, password),
        );
        tracing::info!(username, account_id, "account created");
        Ok(())
    }

    async fn find_account(&self, username: &str) -> Result<Option<AccountInfo>, SessionError> {
        Ok(self
            .inner
            .lock()
            .await
            .accounts
            .get(username)
            .map(AccountRecord::info))
    }

    async fn bind_unique_id(&self, account_id: u32, unique_id: u32) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        match inner.by_id_mut(account_id) {
            Some(account) => {
                account.unique_id = Some(unique_id);
                Ok(())
            }
            None => Err(SessionError::Directory(format!(
                "no account with id {account_id}"
            ))),
        }
    }
}
