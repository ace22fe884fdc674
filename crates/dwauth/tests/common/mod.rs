//! Test client and server helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dwauth::prelude::*;
use dwauth_protocol::messages::{LoginRequest, ServerIpRequest};
use dwauth_protocol::{CodecLimits, FrameCodec, FrameEncoder, PacketWriter};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Config for tests: loopback, random port, nothing persisted.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cipher_flag_path: None,
        auto_create_accounts: false,
        shutdown_grace: Duration::from_millis(500),
        ..ServerConfig::default()
    }
}

/// alice/secret is account 42 with access level 1 and two characters.
pub fn seeded_directory() -> MemoryDirectory {
    let mut alice = AccountRecord::new(42, "alice", "secret");
    alice.access_level = 1;
    alice.characters = 2;
    MemoryDirectory::new()
        .with_account(alice)
        .with_server(ServerRecord {
            id: 1,
            name: "Lucemon".into(),
            ip: "10.0.0.1".into(),
            port: 7000,
        })
        .with_server(ServerRecord {
            id: 2,
            name: "Omnimon".into(),
            ip: "10.0.0.2".into(),
            port: 7001,
        })
}

pub async fn start(
    config: ServerConfig,
    directory: MemoryDirectory,
    switch: CipherSwitch,
) -> (AuthServer<MemoryDirectory>, Arc<MemoryDirectory>) {
    let directory = Arc::new(directory);
    let server = AuthServerBuilder::new()
        .config(config)
        .cipher_switch(switch)
        .start(Arc::clone(&directory))
        .await
        .expect("server should start");
    (server, directory)
}

/// A protocol-speaking client over a plain socket.
pub struct TestClient {
    stream: TcpStream,
    codec: FrameCodec,
    encoder: FrameEncoder,
    pending: VecDeque<Frame>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr, switch: &CipherSwitch) -> Self {
        let stream = TcpStream::connect(addr).await.expect("client should connect");
        let cipher = Cipher::new(switch.clone());
        Self {
            stream,
            codec: FrameCodec::new(
                cipher.clone(),
                CodecLimits {
                    max_violations: None,
                    ..CodecLimits::default()
                },
            ),
            encoder: FrameEncoder::new(cipher, 8192),
            pending: VecDeque::new(),
        }
    }

    /// Connects and consumes the greeting, returning its masked token.
    pub async fn connect_greeted(addr: SocketAddr, switch: &CipherSwitch) -> (Self, u16) {
        let mut client = Self::connect(addr, switch).await;
        let greeting = client.recv().await;
        assert_eq!(greeting.opcode(), opcode::GREETING);
        let masked = greeting.reader().read_u16().unwrap();
        (client, masked)
    }

    pub fn wire(&self, frame: &Frame) -> Vec<u8> {
        self.encoder.encode(frame).expect("frame fits").to_vec()
    }

    pub async fn send(&mut self, frame: &Frame) {
        let bytes = self.wire(frame);
        self.send_bytes(&bytes).await;
    }

    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write should succeed");
    }

    /// Next frame from the server, failing the test after [`TIMEOUT`].
    pub async fn recv(&mut self) -> Frame {
        tokio::time::timeout(TIMEOUT, self.next_frame())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed while waiting for a frame")
    }

    /// `true` if the server closes the connection within [`TIMEOUT`].
    pub async fn closed_by_server(&mut self) -> bool {
        matches!(
            tokio::time::timeout(TIMEOUT, self.next_frame()).await,
            Ok(None)
        )
    }

    async fn next_frame(&mut self) -> Option<Frame> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(frame);
            }
            let n = match self.stream.read(&mut buf).await {
                Ok(0) | Err(_) => return None,
                Ok(n) => n,
            };
            self.pending.extend(self.codec.feed(&buf[..n]));
        }
    }
}

pub fn handshake_frame(first: u16, second: u16) -> Frame {
    let mut w = PacketWriter::new();
    w.write_bytes(&[0; 8]).write_u16(first).write_u16(second);
    w.into_frame(opcode::HANDSHAKE)
}

pub fn login_frame(username: &str, password: &str) -> Frame {
    LoginRequest {
        net_version: 100,
        user_type: "GSP".into(),
        username: username.into(),
        password: password.into(),
        cpu_name: "Test CPU".into(),
        gpu_name: "Test GPU".into(),
        physical_memory: 8 * 1024 * 1024,
        os: "Linux".into(),
        dx_version: "9.0c".into(),
    }
    .to_frame()
}

pub fn server_list_frame() -> Frame {
    Frame::new(opcode::SERVER_LIST, Vec::new())
}

pub fn server_ip_frame(server_id: i32) -> Frame {
    ServerIpRequest { server_id }.to_frame()
}
