//! Packet cipher for the dwauth wire protocol.
//!
//! Every frame that crosses the socket is run through a position- and
//! chain-dependent XOR transform:
//!
//! ```text
//! offset 0..2   length header   never transformed
//! offset 2..    opcode+payload  out[i] = in[i] ^ key[(i-2) % 256] ^ out[i-1]
//! ```
//!
//! The key table is derived deterministically, so independently started
//! peers agree on it without any exchange. It is obfuscation, not
//! cryptography.
//!
//! The cipher can be switched on and off at runtime through a
//! [`CipherSwitch`]. The switch is shared by every connection and persisted
//! to a small flag file so the choice survives restarts.

mod cipher;
mod error;
mod switch;

pub use cipher::{Cipher, KEY_TABLE_LEN, KeyTable, MIN_CIPHER_LEN};
pub use error::CipherError;
pub use switch::{CipherStatus, CipherSwitch};
