//! HTTP sessions
//!
//! A session is looked up (or created) lazily through
//! [`crate::servlet::HttpRequest::get_session`] and handed back to its
//! context's [`SessionStorage`] when the request finishes.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::io;

/// Cookie carrying the session id
pub const SESSION_COOKIE_NAME: &str = "JSESSIONID";

/// Server-side session state
#[derive(Debug, Clone)]
pub struct HttpSession {
    id: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    max_inactive_interval_secs: i64,
    attributes: HashMap<String, Value>,
    is_new: bool,
    invalidated: bool,
}

impl HttpSession {
    /// Fresh session with a random id
    pub fn new(max_inactive_interval_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            created_at: now,
            last_accessed_at: now,
            max_inactive_interval_secs,
            attributes: HashMap::new(),
            is_new: true,
            invalidated: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub const fn max_inactive_interval_secs(&self) -> i64 {
        self.max_inactive_interval_secs
    }

    pub fn set_max_inactive_interval_secs(&mut self, secs: i64) {
        self.max_inactive_interval_secs = secs;
    }

    /// True until the session has been sent to the client once
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Mark for removal; storage drops it when the request finishes
    pub fn invalidate(&mut self) {
        self.invalidated = true;
        self.attributes.clear();
    }

    pub const fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Idle longer than the max inactive interval; non-positive intervals never expire
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.max_inactive_interval_secs > 0
            && now - self.last_accessed_at > Duration::seconds(self.max_inactive_interval_secs)
    }

    /// Record an access by a request that found this session in storage
    pub(crate) fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
        self.is_new = false;
    }

    #[cfg(test)]
    pub(crate) fn set_last_accessed_at(&mut self, at: DateTime<Utc>) {
        self.last_accessed_at = at;
    }
}

/// Persistence collaborator owned by a servlet context
///
/// Implementations decide the storage format.
pub trait SessionStorage: Send + Sync {
    fn load(&self, id: &str) -> io::Result<Option<HttpSession>>;

    fn persist(&self, session: &HttpSession) -> io::Result<()>;

    fn remove(&self, id: &str) -> io::Result<()>;

    /// Drop sessions idle past their interval, returns how many went away
    ///
    /// Called periodically by the server. Stores that expire entries on
    /// their own keep the default.
    fn purge_expired(&self) -> io::Result<usize> {
        Ok(0)
    }
}

/// Process-local storage
///
/// Idle sessions are dropped on lookup and by [`SessionStorage::purge_expired`].
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: DashMap<String, HttpSession>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn load(&self, id: &str) -> io::Result<Option<HttpSession>> {
        let now = Utc::now();
        let expired = match self.sessions.get(id) {
            Some(session) if !session.is_expired_at(now) => return Ok(Some(session.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(id);
        }
        Ok(None)
    }

    fn purge_expired(&self) -> io::Result<usize> {
        let now = Utc::now();
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }

    fn persist(&self, session: &HttpSession) -> io::Result<()> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> io::Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = HttpSession::new(1800);
        assert_eq!(session.id().len(), 32);
        assert!(session.is_new());
        assert!(!session.is_invalidated());
        assert_ne!(session.id(), HttpSession::new(1800).id());
    }

    #[test]
    fn test_attributes_and_invalidate() {
        let mut session = HttpSession::new(1800);
        session.set_attribute("user", "alice");
        session.set_attribute("visits", 3);
        assert_eq!(session.attribute("user"), Some(&Value::from("alice")));
        assert_eq!(session.attribute_names().count(), 2);

        session.invalidate();
        assert!(session.is_invalidated());
        assert!(session.attribute("user").is_none());
    }

    #[test]
    fn test_expiry() {
        let session = HttpSession::new(60);
        let now = session.last_accessed_at();
        assert!(!session.is_expired_at(now + Duration::seconds(30)));
        assert!(session.is_expired_at(now + Duration::seconds(61)));

        let forever = HttpSession::new(0);
        assert!(!forever.is_expired_at(now + Duration::days(365)));
    }

    #[test]
    fn test_in_memory_storage_round_trip() {
        let storage = InMemorySessionStorage::new();
        let mut session = HttpSession::new(1800);
        session.set_attribute("k", "v");

        storage.persist(&session).unwrap();
        assert_eq!(storage.len(), 1);

        let loaded = storage.load(session.id()).unwrap().unwrap();
        assert_eq!(loaded.attribute("k"), Some(&Value::from("v")));

        storage.remove(session.id()).unwrap();
        assert!(storage.load(session.id()).unwrap().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_in_memory_storage_drops_expired() {
        let storage = InMemorySessionStorage::new();
        let mut session = HttpSession::new(1);
        session.last_accessed_at = Utc::now() - Duration::seconds(10);
        storage.persist(&session).unwrap();

        assert!(storage.load(session.id()).unwrap().is_none());
        assert!(storage.is_empty());

        storage.persist(&session).unwrap();
        assert_eq!(storage.purge_expired().unwrap(), 1);
    }

    #[test]
    fn test_purge_drops_unvisited_expired_sessions() {
        let storage = InMemorySessionStorage::new();
        for _ in 0..3 {
            let mut idle = HttpSession::new(1);
            idle.last_accessed_at = Utc::now() - Duration::seconds(10);
            storage.persist(&idle).unwrap();
        }
        let live = HttpSession::new(1800);
        storage.persist(&live).unwrap();
        let mut immortal = HttpSession::new(0);
        immortal.last_accessed_at = Utc::now() - Duration::days(30);
        storage.persist(&immortal).unwrap();

        // Nobody ever loads the idle ids again
        assert_eq!(storage.purge_expired().unwrap(), 3);
        assert_eq!(storage.len(), 2);
        assert!(storage.load(live.id()).unwrap().is_some());
        assert!(storage.load(immortal.id()).unwrap().is_some());
        assert_eq!(storage.purge_expired().unwrap(), 0);
    }
}
