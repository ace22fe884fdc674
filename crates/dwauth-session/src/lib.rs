//! Session state and account lookups for the dwauth auth server.
//!
//! This crate holds the two things handlers work with:
//!
//! 1. **Session**: what the server knows about one connection. The
//!    handshake token is minted at accept, login fills in the account
//!    fields, and everything is dropped when the connection closes.
//! 2. **Account directory**: the [`AccountDirectory`] trait, the
//!    persistence collaborator that checks credentials and knows the game
//!    server list. [`MemoryDirectory`] implements it in memory.
//!
//! ```text
//! Connection layer (above)  ← owns one Session per connection
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Account storage (external) ← reached through AccountDirectory
//! ```

mod directory;
mod error;
mod memory;
mod session;

pub use directory::{AccountDirectory, AccountInfo, AuthOutcome, ServerRecord};
pub use error::SessionError;
pub use memory::{AccountRecord, MemoryDirectory};
pub use session::{Session, mint_handshake_token, mint_unique_id};
