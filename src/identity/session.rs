use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::AppResult;

/// One logged-in device/client instance. Keyed by `(user_id, session_id)`;
/// a user may hold any number of concurrent sessions. Expiry is enforced by
/// the store, not carried on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: String,
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// The five-operation contract over the ephemeral session store.
///
/// The store is externally owned (a remote keyed store in deployment); every
/// operation is awaited before an allow/deny decision is made. All
/// operations fail with [`crate::error::AppError::Persistence`] when the
/// store is unreachable.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session row, overwriting any row under the same
    /// `(user_id, session_id)` key. The write re-stamps both lifetimes.
    async fn create_session(&self, record: SessionRecord) -> AppResult<()>;

    /// True iff a live row exists for the pair and its *access* slot equals
    /// the presented token. A stale or rotated-out token is `false`, never
    /// an error.
    async fn session_exists(
        &self,
        user_id: &str,
        session_id: &str,
        access_token: &str,
    ) -> AppResult<bool>;

    /// The analogous check against the *refresh* slot. Access-token expiry
    /// does not matter here; only the row's own lifetime does.
    async fn refresh_token_exists(
        &self,
        user_id: &str,
        session_id: &str,
        refresh_token: &str,
    ) -> AppResult<bool>;

    /// Remove one session row. Idempotent.
    async fn delete_session(&self, user_id: &str, session_id: &str) -> AppResult<()>;

    /// Remove every session row for the user. Idempotent. A session created
    /// concurrently after this call begins may survive; callers accept that
    /// weak-consistency tradeoff.
    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AppResult<()>;
}

#[derive(Debug)]
struct SessionEntry {
    record: SessionRecord,
    access_expires: Instant,
    refresh_expires: Instant,
}

/// In-memory [`SessionStore`] with store-enforced TTLs, used for development
/// and tests. Expired rows are dropped lazily on read and by [`sweep`].
///
/// [`sweep`]: MemorySessionStore::sweep
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<(String, String), SessionEntry>>,
    user_index: RwLock<HashMap<String, HashSet<String>>>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_index: RwLock::new(HashMap::new()),
            access_ttl,
            refresh_ttl,
        }
    }

    fn remove_entry(&self, user_id: &str, session_id: &str) {
        let key = (user_id.to_string(), session_id.to_string());
        if self.sessions.write().remove(&key).is_some() {
            let mut idx = self.user_index.write();
            if let Some(set) = idx.get_mut(user_id) {
                set.remove(session_id);
                if set.is_empty() {
                    idx.remove(user_id);
                }
            }
        }
    }

    /// Check one slot of the keyed row. `use_refresh_slot` selects which
    /// token field is compared; the two checks never collapse into one.
    fn slot_matches(
        &self,
        user_id: &str,
        session_id: &str,
        presented: &str,
        use_refresh_slot: bool,
    ) -> bool {
        let now = Instant::now();
        let key = (user_id.to_string(), session_id.to_string());
        let mut drop_row = false;
        let out = {
            let map = self.sessions.read();
            match map.get(&key) {
                Some(ent) if ent.refresh_expires <= now => {
                    // refresh window gone: the row no longer exists as far
                    // as callers are concerned
                    drop_row = true;
                    false
                }
                Some(ent) if use_refresh_slot => ent.record.refresh_token == presented,
                Some(ent) => ent.access_expires > now && ent.record.access_token == presented,
                None => false,
            }
        };
        if drop_row {
            self.remove_entry(user_id, session_id);
        }
        out
    }

    /// Drop every row whose refresh window has elapsed; returns the count.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, String)> = {
            let map = self.sessions.read();
            map.iter()
                .filter(|(_, ent)| ent.refresh_expires <= now)
                .map(|(k, _)| k.clone())
                .collect()
        };
        for (uid, sid) in &expired {
            self.remove_entry(uid, sid);
        }
        expired.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, record: SessionRecord) -> AppResult<()> {
        let now = Instant::now();
        let key = (record.user_id.clone(), record.session_id.clone());
        let entry = SessionEntry {
            access_expires: now + self.access_ttl,
            refresh_expires: now + self.refresh_ttl,
            record,
        };
        {
            let mut idx = self.user_index.write();
            idx.entry(key.0.clone()).or_default().insert(key.1.clone());
        }
        self.sessions.write().insert(key, entry);
        Ok(())
    }

    async fn session_exists(
        &self,
        user_id: &str,
        session_id: &str,
        access_token: &str,
    ) -> AppResult<bool> {
        Ok(self.slot_matches(user_id, session_id, access_token, false))
    }

    async fn refresh_token_exists(
        &self,
        user_id: &str,
        session_id: &str,
        refresh_token: &str,
    ) -> AppResult<bool> {
        Ok(self.slot_matches(user_id, session_id, refresh_token, true))
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> AppResult<()> {
        self.remove_entry(user_id, session_id);
        Ok(())
    }

    async fn delete_sessions_by_user_id(&self, user_id: &str) -> AppResult<()> {
        let sids: Vec<String> = self
            .user_index
            .read()
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for sid in &sids {
            self.remove_entry(user_id, sid);
        }
        Ok(())
    }
}
