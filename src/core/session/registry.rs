use crate::core::session::{
    session::{Session, SessionId},
    state::CallState,
};
use crate::domain::error::{SipLineError, SipLineResult};
use tracing::debug;

/// Bounded, ordered set of the calls currently tracked.
///
/// Iteration follows insertion order so bulk operations (holding every
/// other call before dialing, for example) visit sessions predictably.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
    max_sessions: usize,
}

impl SessionRegistry {
    /// Create a registry holding at most `max_sessions` calls
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Vec::with_capacity(max_sessions),
            max_sessions,
        }
    }

    /// Insert a session and return the stored copy
    pub fn add(&mut self, session: Session) -> SipLineResult<&Session> {
        if self.is_full() {
            return Err(SipLineError::CapacityExceeded {
                max: self.max_sessions,
            });
        }
        if self.contains(session.id()) {
            return Err(SipLineError::DuplicateSession {
                id: session.id().to_string(),
            });
        }

        debug!("Tracking session '{}' ({})", session.id(), session.state());
        self.sessions.push(session);
        let last = self.sessions.len() - 1;
        Ok(&self.sessions[last])
    }

    /// Remove a session; absent ids are ignored
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.id() == id)?;
        debug!("Released session '{}'", id);
        Some(self.sessions.remove(index))
    }

    pub fn find(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn find_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.find(id).is_some()
    }

    /// Sessions currently in `state`.
    ///
    /// The iterator is lazy and can be cloned to restart it; each call
    /// reads the registry as it is now.
    pub fn filter_by_state(
        &self,
        state: CallState,
    ) -> impl Iterator<Item = &Session> + Clone + '_ {
        self.sessions.iter().filter(move |s| s.state() == state)
    }

    /// Incoming calls waiting to be answered
    pub fn incoming(&self) -> impl Iterator<Item = &Session> + Clone + '_ {
        self.filter_by_state(CallState::Initial)
    }

    /// Calls with media flowing
    pub fn established(&self) -> impl Iterator<Item = &Session> + Clone + '_ {
        self.filter_by_state(CallState::Established)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> + '_ {
        self.sessions.iter()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_sessions
    }

    pub fn capacity(&self) -> usize {
        self.max_sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::session::RemoteIdentity;

    fn incoming(id: &str) -> Session {
        Session::incoming(SessionId::from(id), RemoteIdentity::uri("sip:caller@example.com"))
    }

    #[test]
    fn test_registry_creation() {
        let registry = SessionRegistry::new(3);
        assert_eq!(registry.capacity(), 3);
        assert!(registry.is_empty());
        assert!(!registry.is_full());
    }

    #[test]
    fn test_add_and_find() {
        let mut registry = SessionRegistry::new(2);
        let stored = registry.add(incoming("s1")).unwrap();
        assert_eq!(stored.id().as_str(), "s1");

        assert!(registry.find(&SessionId::from("s1")).is_some());
        assert!(registry.find(&SessionId::from("missing")).is_none());
    }

    #[test]
    fn test_capacity_limit() {
        let mut registry = SessionRegistry::new(2);
        registry.add(incoming("s1")).unwrap();
        registry.add(incoming("s2")).unwrap();

        let result = registry.add(incoming("s3"));
        assert!(matches!(result, Err(SipLineError::CapacityExceeded { max: 2 })));
        assert_eq!(registry.ids(), vec![SessionId::from("s1"), SessionId::from("s2")]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = SessionRegistry::new(5);
        registry.add(incoming("s1")).unwrap();

        let result = registry.add(incoming("s1"));
        assert!(matches!(result, Err(SipLineError::DuplicateSession { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = SessionRegistry::new(2);
        registry.add(incoming("s1")).unwrap();

        assert!(registry.remove(&SessionId::from("s1")).is_some());
        assert!(registry.remove(&SessionId::from("s1")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_filter_by_state_is_fresh_and_restartable() {
        let mut registry = SessionRegistry::new(4);
        registry.add(incoming("s1")).unwrap();
        registry.add(incoming("s2")).unwrap();

        let initial = registry.filter_by_state(CallState::Initial);
        assert_eq!(initial.clone().count(), 2);
        assert_eq!(initial.count(), 2);

        registry
            .find_mut(&SessionId::from("s1"))
            .unwrap()
            .advance(CallState::Established)
            .unwrap();

        assert_eq!(registry.incoming().count(), 1);
        let established: Vec<_> = registry.established().map(|s| s.id().clone()).collect();
        assert_eq!(established, vec![SessionId::from("s1")]);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut registry = SessionRegistry::new(4);
        for id in ["c", "a", "b"] {
            registry.add(incoming(id)).unwrap();
        }
        registry.remove(&SessionId::from("a"));

        let ids: Vec<_> = registry.iter().map(|s| s.id().as_str().to_string()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
