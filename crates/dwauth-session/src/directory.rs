//! The account directory collaborator.
//!
//! The auth core never talks to a database itself. Everything it needs to
//! know about accounts and game servers goes through [`AccountDirectory`],
//! so storage can be a SQL database in production and a
//! [`MemoryDirectory`](crate::MemoryDirectory) in tests.

use std::future::Future;

use crate::SessionError;

/// Identity returned for a known account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: u32,
    pub access_level: i32,
}

/// Result of a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted(AccountInfo),
    WrongPassword,
    NotFound,
    Banned,
}

/// One game server in the list shown after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub id: i32,
    pub name: String,
    pub ip: String,
    pub port: u16,
}

/// Account and server-list storage consumed by the handlers.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one directory is shared by every
/// connection task for the lifetime of the server.
pub trait AccountDirectory: Send + Sync + 'static {
    /// Checks a username/password pair.
    fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthOutcome, SessionError>> + Send;

    /// The game servers, in display order.
    fn list_servers(&self) -> impl Future<Output = Result<Vec<ServerRecord>, SessionError>> + Send;

    /// Number of characters owned by an account.
    fn count_characters(
        &self,
        account_id: u32,
    ) -> impl Future<Output = Result<u32, SessionError>> + Send;

    /// Looks up one game server.
    fn server_by_id(
        &self,
        id: i32,
    ) -> impl Future<Output = Result<Option<ServerRecord>, SessionError>> + Send;

    /// Creates the account if it does not exist. Idempotent.
    fn ensure_account(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Current identity for a username, without a password check.
    fn find_account(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<AccountInfo>, SessionError>> + Send;

    /// Stores the session id handed to the game server for an account.
    fn bind_unique_id(
        &self,
        account_id: u32,
        unique_id: u32,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}
