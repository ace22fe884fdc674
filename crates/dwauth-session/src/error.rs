//! Error types for the session layer.

/// Errors raised by session bookkeeping or the account directory.
///
/// Credential outcomes (wrong password, banned) are not errors; they are
/// [`AuthOutcome`](crate::AuthOutcome) values.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The account directory could not answer.
    #[error("account directory failure: {0}")]
    Directory(String),

    /// An operation needs a logged-in session and this one is not.
    #[error("session is not authenticated")]
    NotAuthenticated,
}
