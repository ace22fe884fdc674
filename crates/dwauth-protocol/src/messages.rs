//! Typed requests and replies.
//!
//! Inbound messages implement [`Decode`], outbound ones [`Encode`]. Each
//! carries its opcode as an associated constant so a frame can only be
//! decoded as the message it actually is.

use std::fmt;

use crate::{Frame, PacketReader, PacketWriter, ProtocolError, opcode};

/// Mask applied to the per-session handshake token in the greeting and
/// handshake reply.
pub const HANDSHAKE_MASK: u16 = 0x7E41;

/// The masked form of a handshake token.
pub fn mask_token(token: u16) -> u16 {
    token ^ HANDSHAKE_MASK
}

/// A message that can be read from an inbound frame.
pub trait Decode: Sized {
    /// The opcode this message travels under.
    const OPCODE: i16;

    /// Reads the message fields from a payload.
    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError>;

    /// Decodes from a whole frame, checking the opcode first.
    fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        if frame.opcode() != Self::OPCODE {
            return Err(ProtocolError::UnexpectedOpcode {
                expected: Self::OPCODE,
                actual: frame.opcode(),
            });
        }
        Self::decode(&mut frame.reader())
    }
}

/// A message that can be written as an outbound frame.
pub trait Encode {
    /// The opcode this message travels under.
    const OPCODE: i16;

    /// Writes the message fields into a payload.
    fn write_payload(&self, writer: &mut PacketWriter);

    /// Builds the complete frame.
    fn to_frame(&self) -> Frame {
        let mut writer = PacketWriter::new();
        self.write_payload(&mut writer);
        writer.into_frame(Self::OPCODE)
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Sent by the server as soon as a connection is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
    pub masked_token: u16,
}

impl Greeting {
    pub fn for_token(token: u16) -> Self {
        Self {
            masked_token: mask_token(token),
        }
    }
}

impl Encode for Greeting {
    const OPCODE: i16 = opcode::GREETING;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer.write_u16(self.masked_token);
    }
}

/// The client's reachability confirmation.
///
/// The first 8 payload bytes carry nothing the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub first: u16,
    pub second: u16,
}

impl Decode for HandshakeRequest {
    const OPCODE: i16 = opcode::HANDSHAKE;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        reader.skip(8)?;
        Ok(Self {
            first: reader.read_u16()?,
            second: reader.read_u16()?,
        })
    }
}

/// Server reply to a [`HandshakeRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeAck {
    pub masked_token: u16,
}

impl HandshakeAck {
    pub fn for_token(token: u16) -> Self {
        Self {
            masked_token: mask_token(token),
        }
    }
}

impl Encode for HandshakeAck {
    const OPCODE: i16 = opcode::HANDSHAKE_ACK;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer.write_u16(self.masked_token);
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Credentials plus the client's machine description.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub net_version: u32,
    pub user_type: String,
    pub username: String,
    pub password: String,
    pub cpu_name: String,
    pub gpu_name: String,
    /// Physical memory as reported by the client, in bytes.
    pub physical_memory: i32,
    pub os: String,
    pub dx_version: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("net_version", &self.net_version)
            .field("user_type", &self.user_type)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cpu_name", &self.cpu_name)
            .field("gpu_name", &self.gpu_name)
            .field("physical_memory", &self.physical_memory)
            .field("os", &self.os)
            .field("dx_version", &self.dx_version)
            .finish()
    }
}

impl Decode for LoginRequest {
    const OPCODE: i16 = opcode::LOGIN;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            net_version: reader.read_u32()?,
            user_type: reader.read_string()?,
            username: reader.read_string()?,
            password: reader.read_string()?,
            cpu_name: reader.read_string()?,
            gpu_name: reader.read_string()?,
            physical_memory: reader.read_i32()?,
            os: reader.read_string()?,
            dx_version: reader.read_string()?,
        })
    }
}

impl Encode for LoginRequest {
    const OPCODE: i16 = opcode::LOGIN;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer
            .write_u32(self.net_version)
            .write_string(&self.user_type)
            .write_string(&self.username)
            .write_string(&self.password)
            .write_string(&self.cpu_name)
            .write_string(&self.gpu_name)
            .write_i32(self.physical_memory)
            .write_string(&self.os)
            .write_string(&self.dx_version);
    }
}

/// Login result reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginResult {
    pub result: i32,
    pub subtype: u8,
}

impl LoginResult {
    pub const SUCCESS: i32 = 0;
    pub const UNKNOWN_USER: i32 = 10035;
    pub const WRONG_PASSWORD: i32 = 10057;

    pub fn success() -> Self {
        Self {
            result: Self::SUCCESS,
            subtype: 3,
        }
    }

    pub fn wrong_password() -> Self {
        Self {
            result: Self::WRONG_PASSWORD,
            subtype: 0,
        }
    }

    pub fn unknown_user() -> Self {
        Self {
            result: Self::UNKNOWN_USER,
            subtype: 0,
        }
    }
}

impl Encode for LoginResult {
    const OPCODE: i16 = opcode::LOGIN;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer.write_i32(self.result).write_u8(self.subtype);
    }
}

impl Decode for LoginResult {
    const OPCODE: i16 = opcode::LOGIN;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            result: reader.read_i32()?,
            subtype: reader.read_u8()?,
        })
    }
}

/// Reply for a banned account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginBanned {
    pub remaining_secs: u32,
    pub reason: String,
}

impl LoginBanned {
    /// A permanent ban with the stock message.
    pub fn permanent() -> Self {
        Self {
            remaining_secs: u32::MAX,
            reason: "This username has been banned.".to_string(),
        }
    }
}

impl Encode for LoginBanned {
    const OPCODE: i16 = opcode::LOGIN_BANNED;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer
            .write_u32(self.remaining_secs)
            .write_string(&self.reason);
    }
}

impl Decode for LoginBanned {
    const OPCODE: i16 = opcode::LOGIN_BANNED;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            remaining_secs: reader.read_u32()?,
            reason: reader.read_string()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Server list
// ---------------------------------------------------------------------------

/// One game server as shown in the client's server picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerListEntry {
    pub id: i32,
    pub name: String,
    pub maintenance: bool,
    pub overloaded: bool,
    /// Characters the requesting account has on this server.
    pub characters: u8,
    pub is_new: bool,
    pub slots_available: u8,
    pub slots_open: u8,
}

impl ServerListEntry {
    /// An entry with the stock flags: open, not overloaded, five slots.
    pub fn open(id: i32, name: impl Into<String>, characters: u8) -> Self {
        Self {
            id,
            name: name.into(),
            maintenance: false,
            overloaded: false,
            characters,
            is_new: false,
            slots_available: 5,
            slots_open: 5,
        }
    }
}

/// Server-list reply. The `u8` count means at most 255 entries are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerList {
    pub entries: Vec<ServerListEntry>,
    pub username: String,
}

impl ServerList {
    const MAX_ENTRIES: usize = u8::MAX as usize;
}

impl Encode for ServerList {
    const OPCODE: i16 = opcode::SERVER_LIST;

    fn write_payload(&self, writer: &mut PacketWriter) {
        let count = self.entries.len().min(Self::MAX_ENTRIES);
        writer.write_u8(count as u8);
        for entry in &self.entries[..count] {
            writer
                .write_i32(entry.id)
                .write_string(&entry.name)
                .write_u8(entry.maintenance as u8)
                .write_u8(entry.overloaded as u8)
                .write_u8(entry.characters)
                .write_u8(entry.is_new as u8)
                .write_u8(entry.slots_available)
                .write_u8(entry.slots_open);
        }
        writer.write_string(&self.username);
    }
}

impl Decode for ServerList {
    const OPCODE: i16 = opcode::SERVER_LIST;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        let count = reader.read_u8()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(ServerListEntry {
                id: reader.read_i32()?,
                name: reader.read_string()?,
                maintenance: reader.read_u8()? != 0,
                overloaded: reader.read_u8()? != 0,
                characters: reader.read_u8()?,
                is_new: reader.read_u8()? != 0,
                slots_available: reader.read_u8()?,
                slots_open: reader.read_u8()?,
            });
        }
        Ok(Self {
            entries,
            username: reader.read_string()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Server IP
// ---------------------------------------------------------------------------

/// The client picked a server and wants its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerIpRequest {
    pub server_id: i32,
}

impl Decode for ServerIpRequest {
    const OPCODE: i16 = opcode::SERVER_IP;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            server_id: reader.read_i32()?,
        })
    }
}

impl Encode for ServerIpRequest {
    const OPCODE: i16 = opcode::SERVER_IP;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer.write_i32(self.server_id);
    }
}

/// Address of the selected game server plus the session binding the
/// client presents there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIp {
    pub ip: String,
    pub port: u32,
    pub account_id: u32,
    pub unique_id: u32,
}

impl Encode for ServerIp {
    const OPCODE: i16 = opcode::SERVER_IP;

    fn write_payload(&self, writer: &mut PacketWriter) {
        writer
            .write_string(&self.ip)
            .write_u32(self.port)
            .write_u32(self.account_id)
            .write_u32(self.unique_id);
    }
}

impl Decode for ServerIp {
    const OPCODE: i16 = opcode::SERVER_IP;

    fn decode(reader: &mut PacketReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            ip: reader.read_string()?,
            port: reader.read_u32()?,
            account_id: reader.read_u32()?,
            unique_id: reader.read_u32()?,
        })
    }
}
