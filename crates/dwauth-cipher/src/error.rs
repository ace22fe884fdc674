//! Error types for the cipher layer.

use std::path::PathBuf;

/// Errors that can occur while loading or persisting the cipher switch.
///
/// The transform itself never fails: malformed frames pass through and are
/// caught downstream by the frame codec.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The flag file exists but could not be read.
    #[error("failed to read cipher flag from {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The flag file could not be written. The in-memory flag has
    /// already changed when this is returned.
    #[error("failed to persist cipher flag to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
