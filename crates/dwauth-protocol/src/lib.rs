//! Wire protocol for dwauth.
//!
//! This crate defines what travels on the socket:
//!
//! - **Frames** ([`Frame`]): `u16 length | i16 opcode | payload`, all
//!   little-endian, the length counting the whole frame.
//! - **Opcodes** ([`opcode`]): the signed tags identifying each message.
//!   Negative values are reserved for transport-level messages.
//! - **Payload codecs** ([`PacketReader`], [`PacketWriter`]): typed field
//!   access inside a payload, including the `u8 size | bytes | NUL` string
//!   encoding.
//! - **Messages** ([`messages`]): typed requests and replies with their
//!   exact field layouts.
//! - **Reassembly** ([`FrameCodec`]): turns an unbounded byte stream into
//!   discrete frames, surviving partial reads and garbage lengths.
//!
//! ```text
//! socket bytes → FrameCodec (split + decrypt) → Frame → messages::*
//! messages::* → Frame → FrameEncoder (encode + encrypt) → socket bytes
//! ```

mod codec;
mod dump;
mod error;
mod frame;
pub mod messages;
pub mod opcode;
mod packet;

pub use codec::{CodecLimits, FrameCodec, FrameEncoder};
pub use dump::hex_dump;
pub use error::ProtocolError;
pub use frame::Frame;
pub use messages::{Decode, Encode};
pub use packet::{PacketReader, PacketWriter};
