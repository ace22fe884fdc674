//! One module per inbound opcode.

pub(crate) mod handshake;
pub(crate) mod login;
pub(crate) mod server_ip;
pub(crate) mod server_list;
