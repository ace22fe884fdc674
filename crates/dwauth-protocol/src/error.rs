//! Error types for the protocol layer.

/// Errors that can occur while framing, parsing or building messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A payload ended before a field could be read.
    #[error("buffer underflow: needed {needed} bytes, had {available}")]
    BufferUnderflow { needed: usize, available: usize },

    /// A frame header declared a length of zero or above the frame limit.
    #[error("invalid frame length {0}")]
    InvalidLength(u16),

    /// A frame's declared length disagrees with the bytes it came with.
    #[error("frame declares {declared} bytes but has {actual}")]
    LengthMismatch { declared: u16, actual: usize },

    /// An outbound frame does not fit the configured frame limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// A message was decoded from a frame carrying a different opcode.
    #[error("expected opcode {expected}, got {actual}")]
    UnexpectedOpcode { expected: i16, actual: i16 },

    /// Raw bytes handed to the send path were empty.
    #[error("refusing to send an empty payload")]
    EmptyPayload,

    /// The connection hit its protocol violation limit.
    #[error("too many protocol violations ({0})")]
    TooManyViolations(u32),
}
