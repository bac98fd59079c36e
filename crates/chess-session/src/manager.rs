//! The session manager: tracks every player's live socket.
//!
//! Reconnection after a disconnect is not a session-layer concern in this
//! design — the room/game layer owns the grace period and rejoin flow
//! (a player who reconnects gets a brand new session here, identified by
//! the same user id). This manager only answers "is this user connected
//! right now, and are they within their message budget".
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT internally synchronized — like the room and
//! game managers above it, it's meant to live behind a single owning task
//! or a `Mutex` held by the coordinator.

use std::collections::HashMap;
use std::time::Instant;

use chess_protocol::UserId;

use crate::{Session, SessionConfig, SessionError};

/// Tracks every currently-connected player.
pub struct SessionManager {
    sessions: HashMap<UserId, Session>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Registers a newly authenticated connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if this user already has a live
    /// socket tracked — the caller should close the new connection rather
    /// than silently replace the old one.
    pub fn create(&mut self, user_id: UserId, provider: String) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&user_id) {
            return Err(SessionError::AlreadyConnected(user_id));
        }
        let session = Session::new(user_id.clone(), provider, &self.config);
        tracing::info!(%user_id, "session created");
        self.sessions.insert(user_id.clone(), session);
        Ok(self.sessions.get(&user_id).expect("just inserted"))
    }

    /// Removes a player's session when their socket closes.
    pub fn remove(&mut self, user_id: &UserId) -> Option<Session> {
        let removed = self.sessions.remove(user_id);
        if removed.is_some() {
            tracing::info!(%user_id, "session removed");
        }
        removed
    }

    /// Records an inbound heartbeat frame, resetting the staleness clock.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session is tracked for this user.
    pub fn record_heartbeat(&mut self, user_id: &UserId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.clone()))?;
        session.last_heartbeat_at = Instant::now();
        Ok(())
    }

    /// Records an inbound non-heartbeat message against the rate limiter.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if no session is tracked for this user.
    /// - [`SessionError::RateLimited`] once the rolling window is exceeded.
    pub fn record_message(&mut self, user_id: &UserId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.clone()))?;
        if session.limiter.record(Instant::now()) {
            Ok(())
        } else {
            Err(SessionError::RateLimited(user_id.clone()))
        }
    }

    /// Returns every session whose heartbeat has gone stale (missed two
    /// consecutive intervals), for the caller to close.
    pub fn stale_sessions(&self) -> Vec<UserId> {
        let now = Instant::now();
        self.sessions
            .values()
            .filter(|s| s.is_heartbeat_stale(self.config.heartbeat_interval, now))
            .map(|s| s.user_id.clone())
            .collect()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Session> {
        self.sessions.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    #[test]
    fn test_create_new_user_returns_session() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let session = mgr.create(uid("u1"), "dev".into()).expect("should succeed");
        assert_eq!(session.user_id, uid("u1"));
    }

    #[test]
    fn test_create_duplicate_user_returns_already_connected() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        mgr.create(uid("u1"), "dev".into()).unwrap();
        let result = mgr.create(uid("u1"), "dev".into());
        assert!(matches!(result, Err(SessionError::AlreadyConnected(u)) if u == uid("u1")));
    }

    #[test]
    fn test_remove_then_create_succeeds_again() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        mgr.create(uid("u1"), "dev".into()).unwrap();
        mgr.remove(&uid("u1"));
        assert!(mgr.create(uid("u1"), "dev".into()).is_ok());
    }

    #[test]
    fn test_record_message_unknown_user_returns_not_found() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let result = mgr.record_message(&uid("ghost"));
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_record_message_exceeding_limit_returns_rate_limited() {
        let mut mgr = SessionManager::new(SessionConfig {
            rate_limit_max_messages: 2,
            ..SessionConfig::default()
        });
        mgr.create(uid("u1"), "dev".into()).unwrap();
        mgr.record_message(&uid("u1")).unwrap();
        mgr.record_message(&uid("u1")).unwrap();
        assert!(matches!(
            mgr.record_message(&uid("u1")),
            Err(SessionError::RateLimited(_))
        ));
    }

    #[test]
    fn test_len_and_is_empty_track_session_count() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        assert!(mgr.is_empty());
        mgr.create(uid("u1"), "dev".into()).unwrap();
        assert_eq!(mgr.len(), 1);
        assert!(!mgr.is_empty());
    }
}
