//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use dwauth_protocol::{CodecLimits, Frame};
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Everything the server needs before it starts.
///
/// Deserializable from a `[server]` TOML table; every field has a default,
/// so an empty table is a valid config. `shutdown_grace` is given in
/// seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// Port to bind. 0 picks a free port.
    pub port: u16,

    /// Largest frame accepted from or sent to a client, header included.
    pub max_frame_size: usize,

    /// Largest per-connection accumulation buffer.
    pub max_buffer_size: usize,

    /// Cipher state used when no flag file exists yet.
    pub cipher_enabled: bool,

    /// Where the cipher on/off flag is persisted. `None` keeps it in memory.
    pub cipher_flag_path: Option<PathBuf>,

    /// Protocol violations tolerated per connection. `None` = unlimited.
    pub max_violations: Option<u32>,

    /// How long `stop` waits for in-flight handlers before abandoning them.
    #[serde(deserialize_with = "duration_secs")]
    pub shutdown_grace: Duration,

    /// Create unknown accounts on their first login.
    pub auto_create_accounts: bool,

    /// Outbound frames queued per connection before senders wait.
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7029,
            max_frame_size: 8 * 1024,
            max_buffer_size: 128 * 1024,
            cipher_enabled: true,
            cipher_flag_path: Some(PathBuf::from("encryption.config")),
            max_violations: Some(8),
            shutdown_grace: Duration::from_secs(3),
            auto_create_accounts: true,
            outbound_queue: 256,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Limits handed to each connection's frame codec.
    pub fn codec_limits(&self) -> CodecLimits {
        CodecLimits {
            max_frame_size: self.max_frame_size,
            max_buffer_size: self.max_buffer_size,
            max_violations: self.max_violations,
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called by [`AuthServer::start`](crate::AuthServer::start). Rules:
    /// - `max_frame_size` is at least one header and at most what the `u16`
    ///   length field can express.
    /// - `max_buffer_size` holds at least one full frame.
    /// - `max_violations` and `outbound_queue` are at least 1.
    pub fn validated(mut self) -> Self {
        if self.max_frame_size < Frame::HEADER_LEN {
            warn!(
                size = self.max_frame_size,
                min = Frame::HEADER_LEN,
                "max_frame_size below header size, raising"
            );
            self.max_frame_size = Frame::HEADER_LEN;
        }
        if self.max_frame_size > Frame::MAX_WIRE_LEN {
            warn!(
                size = self.max_frame_size,
                max = Frame::MAX_WIRE_LEN,
                "max_frame_size exceeds length field, clamping"
            );
            self.max_frame_size = Frame::MAX_WIRE_LEN;
        }
        if self.max_buffer_size < self.max_frame_size {
            warn!(
                size = self.max_buffer_size,
                frame = self.max_frame_size,
                "max_buffer_size cannot hold one frame, raising"
            );
            self.max_buffer_size = self.max_frame_size;
        }
        if self.max_violations == Some(0) {
            warn!("max_violations of 0 would close every connection, using 1");
            self.max_violations = Some(1);
        }
        if self.outbound_queue == 0 {
            warn!("outbound_queue of 0, using 1");
            self.outbound_queue = 1;
        }
        self
    }
}

fn duration_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:7029");
        assert_eq!(cfg.max_frame_size, 8192);
        assert_eq!(cfg.max_buffer_size, 131072);
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(3));
        assert_eq!(cfg.clone().validated(), cfg);
    }

    #[test]
    fn test_deserialize_partial_table_keeps_defaults() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            port = 9000
            shutdown_grace = 0.5
            cipher_flag_path = "state/crypto.flag"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.shutdown_grace, Duration::from_millis(500));
        assert_eq!(cfg.cipher_flag_path, Some(PathBuf::from("state/crypto.flag")));
        assert_eq!(cfg.host, "0.0.0.0");
        assert!(cfg.auto_create_accounts);
    }

    #[test]
    fn test_deserialize_negative_grace_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str("shutdown_grace = -1.0");
        assert!(result.is_err());
    }

    #[test]
    fn test_validated_raises_tiny_frame_size() {
        let cfg = ServerConfig {
            max_frame_size: 2,
            max_buffer_size: 1,
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(cfg.max_frame_size, 4);
        assert_eq!(cfg.max_buffer_size, 4);
    }

    #[test]
    fn test_validated_clamps_frame_size_to_length_field() {
        let cfg = ServerConfig {
            max_frame_size: 1 << 20,
            max_buffer_size: 1 << 21,
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(cfg.max_frame_size, 65535);
        assert_eq!(cfg.max_buffer_size, 1 << 21);
    }

    #[test]
    fn test_validated_fixes_zero_limits() {
        let cfg = ServerConfig {
            max_violations: Some(0),
            outbound_queue: 0,
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(cfg.max_violations, Some(1));
        assert_eq!(cfg.outbound_queue, 1);
    }

    #[test]
    fn test_codec_limits_mirror_config() {
        let cfg = ServerConfig {
            max_violations: None,
            ..ServerConfig::default()
        };
        let limits = cfg.codec_limits();
        assert_eq!(limits.max_frame_size, 8192);
        assert_eq!(limits.max_buffer_size, 131072);
        assert_eq!(limits.max_violations, None);
    }
}
