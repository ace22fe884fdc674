//! Config file loading.
//!
//! ```toml
//! [server]
//! port = 7029
//! shutdown_grace = 3
//!
//! [[servers]]
//! id = 1
//! name = "Lucemon"
//! ip = "127.0.0.1"
//! port = 7000
//!
//! [[accounts]]
//! username = "admin"
//! password = "admin"
//! access_level = 100
//! ```

use std::path::{Path, PathBuf};

use dwauth::prelude::*;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A game server list entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub id: i32,
    pub name: String,
    pub ip: String,
    pub port: u16,
}

/// A seed account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    /// Assigned in file order when omitted.
    pub id: Option<u32>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub access_level: i32,
    #[serde(default)]
    pub characters: u32,
    #[serde(default)]
    pub banned: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub servers: Vec<ServerEntry>,
    pub accounts: Vec<AccountEntry>,
}

impl FileConfig {
    /// Reads `path`, or returns defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            servers = config.servers.len(),
            accounts = config.accounts.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Builds the in-memory directory seeded from the file.
    pub fn directory(&self) -> MemoryDirectory {
        let mut next_id = self.accounts.iter().filter_map(|a| a.id).max().unwrap_or(0) + 1;
        let mut directory = MemoryDirectory::new();
        for entry in &self.servers {
            directory = directory.with_server(ServerRecord {
                id: entry.id,
                name: entry.name.clone(),
                ip: entry.ip.clone(),
                port: entry.port,
            });
        }
        for entry in &self.accounts {
            let id = entry.id.unwrap_or_else(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            let mut account = AccountRecord::new(id, &entry.username, &entry.password);
            account.access_level = entry.access_level;
            account.characters = entry.characters;
            account.banned = entry.banned;
            directory = directory.with_account(account);
        }
        directory
    }
}
