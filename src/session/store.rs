//! Session store contract
//!
//! A store maps identity -> [`SessionRecord`] with expiry-aware reads. Stores
//! absorb their own faults: callers only ever see `None` or `false`.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::record::SessionRecord;

/// Keyed storage of one session per identity
///
/// Every operation runs under a single exclusive scope, so no reader can see
/// two records for one identity or a half-applied replace.
pub trait SessionStore: Send + Sync {
    /// Return the live record for `identity`
    ///
    /// An expired record is deleted as a side effect and `None` is returned.
    fn get(&self, identity: &str) -> Option<SessionRecord>;

    /// Replace any record for `identity` with a new one (last write wins)
    fn save(&self, identity: &str, token: &str, expires_at: i64) -> bool;

    /// Delete the record for `identity`; removing an unknown identity succeeds
    fn remove(&self, identity: &str) -> bool;
}

/// In-memory session store
///
/// Same contract as the file store, without persistence. Useful for tests and
/// ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        // A panic while holding the lock cannot leave a half-written map entry
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, identity: &str) -> Option<SessionRecord> {
        if identity.is_empty() {
            return None;
        }

        let mut records = self.lock();
        let now = Utc::now().timestamp();

        match records.get(identity) {
            Some(record) if record.is_valid_at(now) => Some(record.clone()),
            Some(_) => {
                tracing::debug!("Session for {} expired, removing", identity);
                records.remove(identity);
                None
            }
            None => None,
        }
    }

    fn save(&self, identity: &str, token: &str, expires_at: i64) -> bool {
        if identity.is_empty() {
            tracing::warn!("Refusing to save a session with an empty identity");
            return false;
        }

        self.lock().insert(
            identity.to_string(),
            SessionRecord::new(identity, token, expires_at),
        );
        true
    }

    fn remove(&self, identity: &str) -> bool {
        self.lock().remove(identity);
        true
    }
}
