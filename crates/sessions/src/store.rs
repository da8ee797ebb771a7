use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, gauge, labels, sessions as session_metrics};

use crate::message::{Role, Turn};

/// In-memory session storage keyed by conversation key.
///
/// Sessions are created lazily, only grow by appending, and are emptied (not
/// removed) by [`clear`](Self::clear) / [`clear_all`](Self::clear_all). They
/// never expire on their own.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written turn list
    // behind (every mutation is a single push/clear), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Turn>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the session for `key`, registering an empty one if absent.
    pub fn get_or_create(&self, key: &str) -> Vec<Turn> {
        let mut sessions = self.lock();
        let created = !sessions.contains_key(key);
        let turns = sessions.entry(key.to_string()).or_default().clone();
        if created {
            debug!(session_key = key, "created session");
            #[cfg(feature = "metrics")]
            gauge!(session_metrics::ACTIVE).set(sessions.len() as f64);
        }
        turns
    }

    pub fn append_user(&self, key: &str, text: impl Into<String>) {
        self.append(key, Turn::user(text));
    }

    pub fn append_assistant(&self, key: &str, text: impl Into<String>) {
        self.append(key, Turn::assistant(text));
    }

    fn append(&self, key: &str, turn: Turn) {
        #[cfg(feature = "metrics")]
        counter!(
            session_metrics::TURNS_APPENDED_TOTAL,
            labels::ROLE => turn.role.as_str()
        )
        .increment(1);

        let mut sessions = self.lock();
        let turns = sessions.entry(key.to_string()).or_default();
        debug!(
            session_key = key,
            role = %turn.role,
            index = turns.len(),
            "appending turn"
        );
        turns.push(turn);

        #[cfg(feature = "metrics")]
        gauge!(session_metrics::ACTIVE).set(sessions.len() as f64);
    }

    /// Drop every turn of `key`. The session itself stays registered.
    pub fn clear(&self, key: &str) {
        let mut sessions = self.lock();
        if let Some(turns) = sessions.get_mut(key) {
            debug!(session_key = key, turns = turns.len(), "clearing session");
            turns.clear();
        }
    }

    /// Drop every turn of every session.
    pub fn clear_all(&self) {
        let mut sessions = self.lock();
        debug!(sessions = sessions.len(), "clearing all sessions");
        for turns in sessions.values_mut() {
            turns.clear();
        }
    }

    /// Point-in-time copy of the turns for `key`. Unknown keys export empty.
    pub fn export(&self, key: &str) -> Vec<Turn> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    /// Number of turns currently held for `key`.
    pub fn len(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, Vec::len)
    }

    /// True when no session holds any turn.
    pub fn is_empty(&self) -> bool {
        self.lock().values().all(Vec::is_empty)
    }

    /// All registered conversation keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Role of the most recent turn for `key`, if any.
    pub fn last_role(&self, key: &str) -> Option<Role> {
        self.lock().get(key).and_then(|t| t.last()).map(|t| t.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_registers_empty_session() {
        let store = SessionStore::new();
        assert!(store.get_or_create("u1").is_empty());
        assert_eq!(store.keys(), vec!["u1"]);
    }

    #[test]
    fn append_creates_session_lazily() {
        let store = SessionStore::new();
        store.append_user("u1", "hello");
        store.append_assistant("u1", "hi there");

        assert_eq!(store.export("u1"), vec![
            Turn::user("hello"),
            Turn::assistant("hi there")
        ]);
        assert_eq!(store.last_role("u1"), Some(Role::Assistant));
    }

    #[test]
    fn export_is_a_snapshot() {
        let store = SessionStore::new();
        store.append_user("u1", "one");
        let snapshot = store.export("u1");
        store.append_assistant("u1", "two");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len("u1"), 2);
    }

    #[test]
    fn clear_only_touches_one_key() {
        let store = SessionStore::new();
        store.append_user("u1", "a");
        store.append_user("u2", "b");

        store.clear("u1");

        assert!(store.export("u1").is_empty());
        assert_eq!(store.export("u2"), vec![Turn::user("b")]);
        // Cleared sessions stay registered.
        assert_eq!(store.keys(), vec!["u1", "u2"]);
    }

    #[test]
    fn clear_all_empties_every_session() {
        let store = SessionStore::new();
        store.append_user("u1", "a");
        store.append_user("u2", "b");
        store.append_assistant("u2", "c");

        store.clear_all();

        assert!(store.is_empty());
        assert!(store.export("u1").is_empty());
        assert!(store.export("u2").is_empty());
        assert!(store.get_or_create("u2").is_empty());
    }

    #[test]
    fn unknown_key_exports_empty_without_registering() {
        let store = SessionStore::new();
        assert!(store.export("ghost").is_empty());
        assert!(store.keys().is_empty());
        store.clear("ghost");
        assert!(store.keys().is_empty());
    }
}
