//! Persistence for the identity session between runs.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity client keeps its current session here: in memory for tests
//! and short-lived embedding, or in a JSON file so a CLI login survives
//! across invocations.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::types::Session;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session file io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait SessionStorage: Send + Sync {
    /// Load the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be read.
    fn load(&self) -> Result<Option<Session>, StorageError>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn save(&self, session: &Session) -> Result<(), StorageError>;

    /// Forget the stored session. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be removed.
    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: Mutex<Option<Session>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self { session: Mutex::new(Some(session)) }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.slot().clone())
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot() = None;
        Ok(())
    }
}

/// Owner read/write only.
#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

/// Session stored as pretty JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(session)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(SESSION_FILE_MODE);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies when the file is created.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(SESSION_FILE_MODE))?;
        }
        file.write_all(raw.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
