//! Opcode constants.
//!
//! Requests and replies sometimes share a value (login, server list,
//! server IP); the direction tells them apart.

/// Client confirms reachability after the greeting.
pub const HANDSHAKE: i16 = -1;

/// Server greeting sent right after accept.
pub const GREETING: i16 = -2;

/// Client keep-alive. Accepted and ignored.
pub const KEEP_ALIVE: i16 = -3;

/// Server reply to [`HANDSHAKE`] (0xFFEF on the wire).
pub const HANDSHAKE_ACK: i16 = -17;

/// Login request, and the login result reply.
pub const LOGIN: i16 = 3301;

/// Reply for banned accounts.
pub const LOGIN_BANNED: i16 = 3308;

/// Server-list request and reply. Older clients spell it 0x6A5, which is
/// the same value.
pub const SERVER_LIST: i16 = 1701;

/// Server-IP request and reply.
pub const SERVER_IP: i16 = 1702;

/// Returns `true` for transport-reserved opcodes.
pub fn is_transport(opcode: i16) -> bool {
    opcode < 0
}

/// A short human-readable name for logging.
pub fn name(opcode: i16) -> &'static str {
    match opcode {
        HANDSHAKE => "handshake",
        GREETING => "greeting",
        KEEP_ALIVE => "keep-alive",
        HANDSHAKE_ACK => "handshake-ack",
        LOGIN => "login",
        LOGIN_BANNED => "login-banned",
        SERVER_LIST => "server-list",
        SERVER_IP => "server-ip",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_list_legacy_value_is_same_constant() {
        assert_eq!(SERVER_LIST, 0x6A5);
    }

    #[test]
    fn test_handshake_ack_wire_value() {
        assert_eq!(HANDSHAKE_ACK as u16, 0xFFEF);
    }

    #[test]
    fn test_is_transport_negative_only() {
        assert!(is_transport(HANDSHAKE));
        assert!(is_transport(KEEP_ALIVE));
        assert!(!is_transport(LOGIN));
    }

    #[test]
    fn test_name_unknown_opcode() {
        assert_eq!(name(4242), "unknown");
        assert_eq!(name(SERVER_IP), "server-ip");
    }
}
