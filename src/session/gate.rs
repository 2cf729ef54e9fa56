use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::token::{StoredToken, TokenStore, TokenType};
use crate::clock::Clock;
use crate::{AuthError, SecretString};

/// Reads the access token issued by the backend and answers expiry
/// questions for the session clock.
///
/// Store faults on read are logged and treated as "no token": the session
/// ends rather than staying open on a token nobody can read.
#[derive(Clone)]
pub struct TokenExpiryGate {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl TokenExpiryGate {
    /// Gate over `store`, judging expiry by `clock`.
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Saves a token that expires `expires_in` from now.
    pub fn store_token(
        &self,
        token: impl Into<SecretString>,
        expires_in: Duration,
        token_type: TokenType,
        refresh_token: Option<SecretString>,
    ) -> Result<StoredToken, AuthError> {
        let token = token.into();
        if token.is_empty() {
            return Err(AuthError::TokenInvalid);
        }

        let stored = StoredToken {
            token,
            expires_at: self
                .clock
                .now()
                .checked_add_signed(expires_in)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            refresh_token,
            token_type,
        };
        self.store.save(&stored)?;
        Ok(stored)
    }

    /// The token, if present and unexpired. An expired token is cleared.
    pub fn token(&self) -> Option<SecretString> {
        let stored = self.load()?;
        if stored.is_expired_at(self.clock.now()) {
            self.clear();
            return None;
        }
        Some(stored.token)
    }

    /// The refresh token stored with the access token, expired or not.
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.load().and_then(|stored| stored.refresh_token)
    }

    /// Expiry of the stored token, expired or not.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.load().map(|stored| stored.expires_at)
    }

    /// A missing token counts as expired.
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }

    /// True when the token is missing or expires within `buffer`.
    pub fn expires_within(&self, buffer: Duration) -> bool {
        self.expires_at().map_or(true, |expires_at| {
            let deadline = expires_at
                .checked_sub_signed(buffer)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            self.clock.now() >= deadline
        })
    }

    /// Returns true if an unexpired token is stored.
    pub fn has_live_token(&self) -> bool {
        self.token().is_some()
    }

    /// Removes the token. Store faults are logged.
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            log::warn!(target: "coopguard", "msg=\"failed to clear token\" error=\"{e}\"");
        }
    }

    fn load(&self) -> Option<StoredToken> {
        match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!(target: "coopguard", "msg=\"unreadable token, clearing\" error=\"{e}\"");
                self.clear();
                None
            }
        }
    }
}

impl std::fmt::Debug for TokenExpiryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExpiryGate")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
