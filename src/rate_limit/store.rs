use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Attempts recorded for one identifier inside the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub count: u32,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// Opens a new window with a single attempt.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            first_attempt: at,
            last_attempt: at,
            blocked_until: None,
        }
    }

    /// The block end, if a block is in force at `now`.
    pub fn active_block(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.blocked_until.filter(|until| *until > now)
    }

    /// A block was imposed and has run out, with no attempt recorded since.
    pub fn block_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until <= now)
    }

    /// The window has run out and nothing is blocking; the record is history.
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.active_block(now).is_none() && now - self.first_attempt > window
    }

    /// When the window opened by `first_attempt` closes. Saturates at the
    /// latest representable instant.
    pub fn window_end(&self, window: Duration) -> DateTime<Utc> {
        self.first_attempt
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Backing map for a single rate limiter.
///
/// Implementations own their data exclusively; a store is never shared
/// between limiters of different scenarios.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<AttemptRecord>, AuthError>;

    async fn put(&self, identifier: &str, record: AttemptRecord) -> Result<(), AuthError>;

    async fn remove(&self, identifier: &str) -> Result<(), AuthError>;

    /// Drops every stale record. Returns how many were removed.
    async fn prune(&self, now: DateTime<Utc>, window: Duration) -> Result<u64, AuthError>;
}

/// Process-local attempt map.
///
/// Two processes (or browser tabs, or replicas) each see their own map, so
/// limits are per process and advisory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAttemptStore {
    entries: Arc<RwLock<HashMap<String, AttemptRecord>>>,
}

impl InMemoryAttemptStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dumps the map as plain JSON, keyed by identifier.
    pub fn export_json(&self) -> Result<String, AuthError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuthError::StoreError("Failed to acquire lock".to_owned()))?;

        serde_json::to_string(&*entries)
            .map_err(|e| AuthError::StoreError(format!("Failed to serialize attempts: {e}")))
    }

    /// Replaces the map with a previous [`export_json`](Self::export_json) dump.
    pub fn import_json(&self, json: &str) -> Result<(), AuthError> {
        let imported: HashMap<String, AttemptRecord> = serde_json::from_str(json)
            .map_err(|e| AuthError::StoreError(format!("Failed to parse attempts: {e}")))?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StoreError("Failed to acquire lock".to_owned()))?;
        *entries = imported;
        Ok(())
    }
}

#[async_trait]
#[allow(clippy::significant_drop_tightening)]
impl AttemptStore for InMemoryAttemptStore {
    async fn get(&self, identifier: &str) -> Result<Option<AttemptRecord>, AuthError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuthError::StoreError("Failed to acquire lock".to_owned()))?;

        Ok(entries.get(identifier).cloned())
    }

    async fn put(&self, identifier: &str, record: AttemptRecord) -> Result<(), AuthError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StoreError("Failed to acquire lock".to_owned()))?;

        entries.insert(identifier.to_owned(), record);
        Ok(())
    }

    async fn remove(&self, identifier: &str) -> Result<(), AuthError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StoreError("Failed to acquire lock".to_owned()))?;

        entries.remove(identifier);
        Ok(())
    }

    async fn prune(&self, now: DateTime<Utc>, window: Duration) -> Result<u64, AuthError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StoreError("Failed to acquire lock".to_owned()))?;

        let before = entries.len();
        entries.retain(|_, record| !record.is_stale(now, window));
        let pruned = before.saturating_sub(entries.len());

        Ok(u64::try_from(pruned).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_block_states() {
        let now = Utc::now();
        let mut record = AttemptRecord::new(now);
        assert!(record.active_block(now).is_none());
        assert!(!record.block_lapsed(now));

        record.blocked_until = Some(now + Duration::minutes(1));
        assert_eq!(record.active_block(now), Some(now + Duration::minutes(1)));
        assert!(!record.block_lapsed(now));

        let later = now + Duration::minutes(2);
        assert!(record.active_block(later).is_none());
        assert!(record.block_lapsed(later));
    }

    #[test]
    fn test_record_stale_only_without_active_block() {
        let start = Utc::now();
        let window = Duration::minutes(15);
        let mut record = AttemptRecord::new(start);

        assert!(!record.is_stale(start + Duration::minutes(15), window));
        assert!(record.is_stale(start + Duration::minutes(16), window));

        record.blocked_until = Some(start + Duration::minutes(30));
        assert!(!record.is_stale(start + Duration::minutes(16), window));
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = InMemoryAttemptStore::new();
        let record = AttemptRecord::new(Utc::now());

        assert!(store.get("student:1").await.unwrap().is_none());

        store.put("student:1", record.clone()).await.unwrap();
        assert_eq!(store.get("student:1").await.unwrap(), Some(record));
        assert_eq!(store.len(), 1);

        store.remove("student:1").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_prune_drops_stale_records() {
        let store = InMemoryAttemptStore::new();
        let now = Utc::now();
        let window = Duration::minutes(15);

        store
            .put("old", AttemptRecord::new(now - Duration::minutes(20)))
            .await
            .unwrap();
        store.put("fresh", AttemptRecord::new(now)).await.unwrap();

        let mut blocked = AttemptRecord::new(now - Duration::minutes(20));
        blocked.blocked_until = Some(now + Duration::minutes(5));
        store.put("blocked", blocked).await.unwrap();

        let pruned = store.prune(now, window).await.unwrap();
        assert_eq!(pruned, 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("blocked").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_export_import_json() {
        let store = InMemoryAttemptStore::new();
        store
            .put("student:1", AttemptRecord::new(Utc::now()))
            .await
            .unwrap();

        let json = store.export_json().unwrap();
        assert!(json.contains("firstAttempt"));

        let restored = InMemoryAttemptStore::new();
        restored.import_json(&json).unwrap();
        assert_eq!(
            restored.get("student:1").await.unwrap(),
            store.get("student:1").await.unwrap()
        );
    }

    #[test]
    fn test_import_rejects_garbage() {
        let store = InMemoryAttemptStore::new();
        assert!(matches!(
            store.import_json("{not json"),
            Err(AuthError::StoreError(_))
        ));
    }
}
