//! Active-account session and its on-disk persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use justart_types::Address;

use crate::Error;

/// The account marketplace operations act for. Passed explicitly to every
/// mutating call; nothing here is process-global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: String,
    #[serde(default)]
    pub name: String,
}

impl Session {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Parsed sender address. An empty session cannot transact.
    pub fn sender(&self) -> Result<Address, Error> {
        if self.address.is_empty() {
            return Err(Error::InvalidState("no active account".into()));
        }
        Ok(self.address.parse()?)
    }
}

/// JSON file holding at most one [`Session`].
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn save(&self, session: &Session) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| Error::Config(format!("Failed to serialize session: {e}")))?;

        // Atomic write: tmp + rename
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = tmp.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Failed to create session directory: {e}"))
                })?;
            }
        }
        std::fs::write(&tmp, json.as_bytes())
            .map_err(|e| Error::Config(format!("Failed to write session: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Config(format!("Failed to rename session file: {e}")))?;

        info!(path = %self.path.display(), address = %session.address, "Session saved");
        Ok(())
    }

    /// `None` when no session has been saved.
    pub fn load(&self) -> Result<Option<Session>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&self.path)
            .map_err(|e| Error::Config(format!("Failed to read session: {e}")))?;
        let session: Session = serde_json::from_slice(&data)
            .map_err(|e| Error::Config(format!("Failed to parse session: {e}")))?;
        Ok(Some(session))
    }

    pub fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Config(format!("Failed to remove session: {e}"))),
        }
    }
}
