//! The process-wide cipher on/off switch and its flag file.
//!
//! The flag is a single word on disk, `enabled` or `disabled`. It is read
//! once at startup and rewritten on every change. Persistence problems are
//! logged and reported but never stop the switch from flipping: the
//! operator asked for a change and every connection should see it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::CipherError;

const ENABLED: &str = "enabled";
const DISABLED: &str = "disabled";

/// Snapshot of the switch, for the operator console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherStatus {
    pub enabled: bool,
    pub flag_path: Option<PathBuf>,
}

/// Shared on/off switch for the frame cipher.
///
/// Cheap to clone; all clones share one flag.
#[derive(Debug, Clone)]
pub struct CipherSwitch {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    enabled: AtomicBool,
    flag_path: Option<PathBuf>,
    /// Serializes flag-file writes so the file always ends up matching the
    /// last flip.
    write_lock: Mutex<()>,
}

impl CipherSwitch {
    /// A switch that is never persisted.
    pub fn in_memory(enabled: bool) -> Self {
        Self::from_parts(enabled, None)
    }

    /// Loads the switch from `path`, falling back to `default`.
    ///
    /// A missing file is created with the default value. An unreadable file
    /// is logged and the default is used.
    pub fn load(path: impl Into<PathBuf>, default: bool) -> Self {
        let path = path.into();
        match read_flag(&path) {
            Ok(Some(enabled)) => {
                tracing::info!(path = %path.display(), enabled, "cipher flag loaded");
                Self::from_parts(enabled, Some(path))
            }
            Ok(None) => {
                let switch = Self::from_parts(default, Some(path));
                match switch.persist(default) {
                    Ok(()) => tracing::info!(enabled = default, "cipher flag created"),
                    Err(e) => tracing::warn!(error = %e, "cipher flag not created"),
                }
                switch
            }
            Err(e) => {
                tracing::warn!(error = %e, enabled = default, "using default cipher flag");
                Self::from_parts(default, Some(path))
            }
        }
    }

    fn from_parts(enabled: bool, flag_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(enabled),
                flag_path,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Returns the current flag.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Turns the cipher on and persists the flag.
    pub fn enable(&self) -> Result<(), CipherError> {
        self.set_enabled(true)
    }

    /// Turns the cipher off and persists the flag.
    pub fn disable(&self) -> Result<(), CipherError> {
        self.set_enabled(false)
    }

    /// Sets the flag and persists it.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), CipherError> {
        self.inner.enabled.store(enabled, Ordering::Release);
        tracing::info!(enabled, "cipher switched");
        self.persist(enabled)
    }

    /// Flips the flag atomically and persists it. Returns the new value.
    pub fn toggle(&self) -> Result<bool, CipherError> {
        let enabled = !self.inner.enabled.fetch_xor(true, Ordering::AcqRel);
        tracing::info!(enabled, "cipher toggled");
        self.persist(enabled)?;
        Ok(enabled)
    }

    /// Returns a snapshot of the switch.
    pub fn status(&self) -> CipherStatus {
        CipherStatus {
            enabled: self.is_enabled(),
            flag_path: self.inner.flag_path.clone(),
        }
    }

    fn persist(&self, enabled: bool) -> Result<(), CipherError> {
        let Some(path) = &self.inner.flag_path else {
            return Ok(());
        };
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Re-read under the lock: a racing flip may have landed after ours.
        let current = self.inner.enabled.load(Ordering::Acquire);
        if current != enabled {
            tracing::debug!(enabled, current, "cipher flag changed again before write");
        }
        let word = if current { ENABLED } else { DISABLED };
        std::fs::write(path, word).map_err(|source| CipherError::Persist {
            path: path.clone(),
            source,
        })
    }
}

/// Reads the flag file. `Ok(None)` means the file does not exist.
fn read_flag(path: &Path) -> Result<Option<bool>, CipherError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim().eq_ignore_ascii_case(ENABLED))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CipherError::Load {
            path: path.to_path_buf(),
            source,
        }),
    }
}
