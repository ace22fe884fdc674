//! `AuthServer` builder, accept loop and lifecycle.
//!
//! This ties the layers together: transport → protocol → session →
//! handlers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dwauth_cipher::{Cipher, CipherSwitch};
use dwauth_protocol::Frame;
use dwauth_session::{AccountDirectory, mint_handshake_token};
use dwauth_transport::{ConnectionId, TcpTransport};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::connection::run_connection;
use crate::{ConnectionHandle, ConnectionRegistry, DwauthError, ServerConfig};

/// Produces the handshake token for each new connection.
pub type TokenSource = Arc<dyn Fn() -> u16 + Send + Sync>;

/// Shared server state passed to each connection task.
pub(crate) struct Shared<D: AccountDirectory> {
    pub(crate) config: ServerConfig,
    pub(crate) directory: Arc<D>,
    pub(crate) cipher: Cipher,
    pub(crate) registry: Mutex<ConnectionRegistry>,
    pub(crate) tokens: TokenSource,
    /// Stop accepting, stop reading, let in-flight work finish.
    pub(crate) shutdown: CancellationToken,
    /// Abandon whatever is still running after the grace period.
    pub(crate) force: CancellationToken,
}

/// Builder for configuring and starting an [`AuthServer`].
///
/// # Example
///
/// ```rust,ignore
/// let server = AuthServerBuilder::new()
///     .config(config)
///     .cipher_switch(CipherSwitch::in_memory(false))
///     .start(directory)
///     .await?;
/// ```
pub struct AuthServerBuilder {
    config: ServerConfig,
    switch: Option<CipherSwitch>,
    tokens: TokenSource,
}

impl AuthServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            switch: None,
            tokens: Arc::new(mint_handshake_token),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the host and port to bind.
    pub fn bind(mut self, host: &str, port: u16) -> Self {
        self.config.host = host.to_string();
        self.config.port = port;
        self
    }

    /// Uses an existing cipher switch instead of loading one from
    /// `cipher_flag_path`.
    pub fn cipher_switch(mut self, switch: CipherSwitch) -> Self {
        self.switch = Some(switch);
        self
    }

    /// Replaces the random handshake token source.
    pub fn handshake_tokens(mut self, tokens: TokenSource) -> Self {
        self.tokens = tokens;
        self
    }

    /// Binds the listener and starts accepting.
    ///
    /// A bind failure is returned as is; there is no retry.
    pub async fn start<D: AccountDirectory>(self, directory: Arc<D>) -> Result<AuthServer<D>, DwauthError> {
        let config = self.config.validated();
        let switch = match (self.switch, &config.cipher_flag_path) {
            (Some(switch), _) => switch,
            (None, Some(path)) => CipherSwitch::load(path.clone(), config.cipher_enabled),
            (None, None) => CipherSwitch::in_memory(config.cipher_enabled),
        };

        let transport = TcpTransport::bind(&config.bind_addr()).await?;
        let local_addr = transport.local_addr()?;

        let shared = Arc::new(Shared {
            config,
            directory,
            cipher: Cipher::new(switch),
            registry: Mutex::new(ConnectionRegistry::new()),
            tokens: self.tokens,
            shutdown: CancellationToken::new(),
            force: CancellationToken::new(),
        });
        let tracker = TaskTracker::new();
        let accept_task = tokio::spawn(accept_loop(transport, Arc::clone(&shared), tracker.clone()));

        tracing::info!(
            %local_addr,
            cipher = shared.cipher.is_enabled(),
            "auth server started"
        );
        Ok(AuthServer {
            shared,
            local_addr,
            tracker,
            accept_task: Mutex::new(Some(accept_task)),
            running: AtomicBool::new(true),
        })
    }
}

impl Default for AuthServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running auth server.
///
/// Dropping it without calling [`stop`](Self::stop) still closes the
/// listener and every connection, just without waiting for them.
pub struct AuthServer<D: AccountDirectory> {
    shared: Arc<Shared<D>>,
    local_addr: SocketAddr,
    tracker: TaskTracker,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl<D: AccountDirectory> AuthServer<D> {
    /// Starts a server with the given config and directory.
    pub async fn start(config: ServerConfig, directory: Arc<D>) -> Result<Self, DwauthError> {
        AuthServerBuilder::new().config(config).start(directory).await
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The configuration in effect, after validation.
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// The shared cipher switch, for runtime toggling.
    pub fn cipher(&self) -> &CipherSwitch {
        self.shared.cipher.switch()
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.shared.directory
    }

    pub async fn connection_count(&self) -> usize {
        self.shared.registry.lock().await.len()
    }

    /// Handles for every live connection, ordered by id.
    pub async fn connections(&self) -> Vec<ConnectionHandle> {
        self.shared.registry.lock().await.handles()
    }

    /// Sends a frame to one connection. Returns `false` if it is gone.
    pub async fn send_to(&self, id: ConnectionId, frame: Frame) -> bool {
        let handle = self.shared.registry.lock().await.get(id).cloned();
        match handle {
            Some(handle) => handle.send(frame).await,
            None => {
                tracing::warn!(conn_id = %id, "send to unknown connection");
                false
            }
        }
    }

    /// Sends a frame to every live connection. Returns how many took it.
    pub async fn broadcast(&self, frame: Frame) -> usize {
        // Snapshot first so a slow client never holds the registry lock.
        let handles = self.shared.registry.lock().await.handles();
        let mut delivered = 0;
        for handle in handles {
            if handle.send(frame.clone()).await {
                delivered += 1;
            }
        }
        tracing::debug!(opcode = frame.opcode(), delivered, "broadcast");
        delivered
    }

    /// Stops the server. Idempotent; later calls return immediately.
    ///
    /// The listener closes and every read loop unblocks at once. Handlers
    /// already running get `shutdown_grace` to finish and flush their
    /// replies before they are abandoned.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        tracing::info!("stopping auth server");
        self.shared.shutdown.cancel();

        if let Some(task) = self.accept_task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "accept loop ended abnormally");
            }
        }

        self.tracker.close();
        let grace = self.shared.config.shutdown_grace;
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            let remaining = self.shared.registry.lock().await.len();
            tracing::warn!(
                remaining,
                grace_ms = grace.as_millis() as u64,
                "grace period elapsed, abandoning in-flight work"
            );
            self.shared.force.cancel();
            self.tracker.wait().await;
        }
        tracing::info!("auth server stopped");
    }
}

impl<D: AccountDirectory> Drop for AuthServer<D> {
    fn drop(&mut self) {
        if self.running.load(Ordering::Acquire) {
            self.shared.shutdown.cancel();
            self.shared.force.cancel();
        }
    }
}

/// First pause after a failed accept.
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);

/// Longest pause between accept retries.
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Accepts until shutdown. Accept errors are logged and retried after a
/// pause that doubles while they persist (fd exhaustion, for one).
async fn accept_loop<D: AccountDirectory>(
    transport: TcpTransport,
    shared: Arc<Shared<D>>,
    tracker: TaskTracker,
) {
    let mut backoff = None;
    loop {
        let accepted = tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            r = transport.accept() => r,
        };
        match accepted {
            Ok(conn) => {
                backoff = None;
                tracker.spawn(run_connection(conn, Arc::clone(&shared)));
            }
            Err(e) => {
                let pause = next_backoff(backoff);
                backoff = Some(pause);
                tracing::error!(error = %e, retry_ms = pause.as_millis() as u64, "accept failed");
                tokio::select! {
                    _ = shared.shutdown.cancelled() => break,
                    () = tokio::time::sleep(pause) => {}
                }
            }
        }
    }
    drop(transport);
    tracing::info!("listener closed");
}

fn next_backoff(previous: Option<Duration>) -> Duration {
    match previous {
        None => ACCEPT_BACKOFF_MIN,
        Some(prev) => (prev * 2).min(ACCEPT_BACKOFF_MAX),
    }
}
