//! Storage for the externally issued access token.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuthError, SecretString};

/// Kind of token held in a [`TokenStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// A token as persisted by a [`TokenStore`]. Plain JSON, camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<SecretString>,
    pub token_type: TokenType,
}

impl StoredToken {
    /// Returns true once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Holds at most one token for the current user.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredToken>, AuthError>;

    fn save(&self, token: &StoredToken) -> Result<(), AuthError>;

    fn clear(&self) -> Result<(), AuthError>;
}

/// Token slot that lives as long as the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenStore {
    slot: Arc<RwLock<Option<StoredToken>>>,
}

impl InMemoryTokenStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<Option<StoredToken>, AuthError> {
        self.slot
            .read()
            .map(|slot| slot.clone())
            .map_err(|_| AuthError::StoreError("Lock poisoned".to_owned()))
    }

    fn save(&self, token: &StoredToken) -> Result<(), AuthError> {
        *self
            .slot
            .write()
            .map_err(|_| AuthError::StoreError("Lock poisoned".to_owned()))? = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self
            .slot
            .write()
            .map_err(|_| AuthError::StoreError("Lock poisoned".to_owned()))? = None;
        Ok(())
    }
}
