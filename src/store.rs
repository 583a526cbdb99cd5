use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use log::{debug, info};
use uuid::Uuid;

use crate::chart::Selection;
use crate::decoder::DecodeError;
use crate::table::Table;

/// Opaque identifier of one browser session
pub type SessionId = String;

/// Default session lifetime: 24 hours
pub const SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything the dashboard remembers for one session
#[derive(Clone, Debug)]
pub struct SessionSlot {
    /// The current table; at most one per session
    pub table: Option<Arc<Table>>,
    pub selection: Selection,
    /// Last navigated path
    pub path: String,
    /// Why the last upload failed, if it did
    pub last_error: Option<DecodeError>,
    pub expires_at: SystemTime,
}

impl SessionSlot {
    fn new(ttl: Duration) -> Self {
        SessionSlot {
            table: None,
            selection: Selection::Default,
            path: "/".to_string(),
            last_error: None,
            expires_at: SystemTime::now() + ttl,
        }
    }

    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}

/// Session-scoped table cache
///
/// Each session owns an independent slot holding zero or one table.
/// Replacing a table swaps the whole `Arc`, so readers always observe
/// either the old table or the new one.
#[derive(Debug)]
pub struct TableStore {
    sessions: RwLock<HashMap<SessionId, SessionSlot>>,
    ttl: Duration,
}

impl Default for TableStore {
    fn default() -> Self {
        TableStore::new(SESSION_DURATION)
    }
}

impl TableStore {
    pub fn new(ttl: Duration) -> Self {
        TableStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SessionSlot>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionSlot>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new empty session and return its id
    pub fn open_session(&self) -> SessionId {
        let session_id = Uuid::new_v4().to_string();
        self.write()
            .insert(session_id.clone(), SessionSlot::new(self.ttl));
        info!("Opened session {}", session_id);
        session_id
    }

    /// Whether the session exists and has not expired
    pub fn is_live(&self, session: &str) -> bool {
        self.read()
            .get(session)
            .is_some_and(|slot| slot.is_live(SystemTime::now()))
    }

    /// Extend a live session's expiry; returns false for unknown or expired sessions
    pub fn touch(&self, session: &str) -> bool {
        let now = SystemTime::now();
        match self.write().get_mut(session) {
            Some(slot) if slot.is_live(now) => {
                slot.expires_at = now + self.ttl;
                true
            }
            _ => false,
        }
    }

    /// Drop a session and its table
    pub fn end_session(&self, session: &str) {
        if self.write().remove(session).is_some() {
            info!("Ended session {}", session);
        }
    }

    /// Remove every expired session, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, slot| slot.is_live(now));
        let purged = before - sessions.len();
        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        purged
    }

    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    /// Overwrite the session's table
    pub fn replace(&self, session: &str, table: Table) {
        self.update(session, |slot| {
            slot.table = Some(Arc::new(table));
            slot.last_error = None;
        });
    }

    /// Empty the session's table slot
    pub fn clear(&self, session: &str) {
        self.update(session, |slot| slot.table = None);
    }

    /// Snapshot of the session's current table
    pub fn current(&self, session: &str) -> Option<Arc<Table>> {
        self.read().get(session).and_then(|slot| slot.table.clone())
    }

    /// Snapshot of the whole session slot
    pub fn slot(&self, session: &str) -> Option<SessionSlot> {
        self.read().get(session).cloned()
    }

    pub fn set_selection(&self, session: &str, selection: Selection) {
        self.update(session, |slot| slot.selection = selection);
    }

    pub fn set_path(&self, session: &str, path: &str) {
        self.update(session, |slot| slot.path = path.to_string());
    }

    pub fn set_last_error(&self, session: &str, error: Option<DecodeError>) {
        self.update(session, |slot| slot.last_error = error);
    }

    fn update(&self, session: &str, apply: impl FnOnce(&mut SessionSlot)) {
        match self.write().get_mut(session) {
            Some(slot) => apply(slot),
            None => debug!("Ignoring update for unknown session {}", session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    fn table(csv: &[u8]) -> Table {
        decode("t.csv", csv).unwrap()
    }

    #[test]
    fn new_session_is_empty() {
        let store = TableStore::default();
        let session = store.open_session();
        assert!(store.is_live(&session));
        assert!(store.current(&session).is_none());
        assert_eq!(store.slot(&session).unwrap().path, "/");
    }

    #[test]
    fn replace_then_clear() {
        let store = TableStore::default();
        let session = store.open_session();
        store.replace(&session, table(b"a\n1\n"));
        assert_eq!(store.current(&session).unwrap().row_count(), 1);

        store.replace(&session, table(b"a\n1\n2\n"));
        assert_eq!(store.current(&session).unwrap().row_count(), 2);

        store.clear(&session);
        assert!(store.current(&session).is_none());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = TableStore::default();
        let first = store.open_session();
        let second = store.open_session();
        assert_ne!(first, second);

        store.replace(&first, table(b"a\n1\n"));
        assert!(store.current(&first).is_some());
        assert!(store.current(&second).is_none());

        store.end_session(&first);
        assert!(store.current(&first).is_none());
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn snapshots_survive_replacement() {
        let store = TableStore::default();
        let session = store.open_session();
        store.replace(&session, table(b"a\n1\n"));
        let snapshot = store.current(&session).unwrap();
        store.replace(&session, table(b"b\n1\n2\n"));
        assert_eq!(snapshot.column_names(), vec!["a"]);
    }

    #[test]
    fn unknown_session_is_a_no_op() {
        let store = TableStore::default();
        store.replace("nope", table(b"a\n1\n"));
        assert!(store.current("nope").is_none());
        assert!(!store.touch("nope"));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn expired_sessions_are_purged() {
        let store = TableStore::new(Duration::ZERO);
        let session = store.open_session();
        assert!(!store.is_live(&session));
        assert!(!store.touch(&session));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.session_count(), 0);
    }
}
