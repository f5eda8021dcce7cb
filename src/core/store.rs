//! Persistence collaborator for the ledger
//!
//! A store holds one opaque string blob. The ledger owns the format; stores
//! only move bytes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::LedgerError;

/// Durable key-value slot for the ledger aggregate
pub trait LedgerStore: Send + Sync {
    /// Stored blob, or `None` if nothing was saved yet
    fn load(&self) -> Result<Option<String>, LedgerError>;

    /// Replace the stored blob
    fn save(&self, blob: &str) -> Result<(), LedgerError>;
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.sweetspot/ledger.json`, or `./ledger.json` without a home directory
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".sweetspot").join("ledger.json"))
            .unwrap_or_else(|| PathBuf::from("ledger.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for FileStore {
    fn load(&self) -> Result<Option<String>, LedgerError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LedgerError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, blob: &str) -> Result<(), LedgerError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| LedgerError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        // Readers see either the old blob or the new one
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, blob).map_err(|source| LedgerError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| LedgerError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-process store for tests and ephemeral servers
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a blob
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// Copy of the current blob
    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|guard| guard.clone())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, LedgerError> {
        self.blob
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| LedgerError::Unavailable("memory store poisoned".to_string()))
    }

    fn save(&self, blob: &str) -> Result<(), LedgerError> {
        let mut guard = self
            .blob
            .lock()
            .map_err(|_| LedgerError::Unavailable("memory store poisoned".to_string()))?;
        *guard = Some(blob.to_string());
        Ok(())
    }
}
