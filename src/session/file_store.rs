//! File-backed token storage.
//!
//! Keeps the token as a single JSON file so it survives restarts of a
//! desktop or kiosk client.

use std::path::{Path, PathBuf};

use super::token::{StoredToken, TokenStore};
use crate::AuthError;

/// Stores the token as JSON at a fixed path.
///
/// ```rust,ignore
/// use coopguard::session::FileTokenStore;
///
/// let store = FileTokenStore::new("/var/lib/coop-portal/auth_tokens.json")?;
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::StoreError(format!("Failed to create token directory: {e}"))
            })?;
        }
        Ok(Self { path })
    }

    /// Location of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredToken>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AuthError::StoreError(format!("Failed to read token file: {e}")))?;

        let token = serde_json::from_str(&content)
            .map_err(|e| AuthError::StoreError(format!("Failed to parse token file: {e}")))?;

        Ok(Some(token))
    }

    fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        let content = serde_json::to_string_pretty(token)
            .map_err(|e| AuthError::StoreError(format!("Failed to serialize token: {e}")))?;

        std::fs::write(&self.path, content)
            .map_err(|e| AuthError::StoreError(format!("Failed to write token file: {e}")))
    }

    fn clear(&self) -> Result<(), AuthError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| AuthError::StoreError(format!("Failed to delete token file: {e}")))?;
        }
        Ok(())
    }
}
