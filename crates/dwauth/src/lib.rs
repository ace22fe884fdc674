//! # dwauth
//!
//! Connection handling and packet dispatch for a game authentication server.
//!
//! [`AuthServer`] binds a TCP listener and gives every accepted client three
//! tasks: a reader that reassembles and decrypts frames, a dispatcher that
//! runs the opcode handlers in arrival order, and a writer that encrypts and
//! sends replies. Account data comes from an [`AccountDirectory`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dwauth::prelude::*;
//!
//! # async fn run() -> Result<(), DwauthError> {
//! let directory = Arc::new(MemoryDirectory::new());
//! let server = AuthServer::start(ServerConfig::default(), directory).await?;
//! tracing::info!(addr = %server.local_addr(), "up");
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod dispatcher;
mod error;
mod handlers;
mod outbound;
mod registry;
mod server;

pub use config::ServerConfig;
pub use error::DwauthError;
pub use outbound::ConnectionHandle;
pub use registry::ConnectionRegistry;
pub use server::{AuthServer, AuthServerBuilder, TokenSource};

/// Convenience re-exports for embedding the server.
pub mod prelude {
    pub use crate::{AuthServer, AuthServerBuilder, ConnectionHandle, DwauthError, ServerConfig};
    pub use dwauth_cipher::{Cipher, CipherStatus, CipherSwitch};
    pub use dwauth_protocol::{Decode, Encode, Frame, opcode};
    pub use dwauth_session::{
        AccountDirectory, AccountInfo, AccountRecord, AuthOutcome, MemoryDirectory, ServerRecord,
        SessionError,
    };
    pub use dwauth_transport::ConnectionId;
}

pub use dwauth_session::AccountDirectory;
