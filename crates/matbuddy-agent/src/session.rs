// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache of live model conversations, one per chat.
//!
//! A turn takes its chat's session out of the store, uses it, and puts a
//! session back only if the turn succeeded. A session that failed is simply
//! never returned, which is how invalidation happens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use dashmap::DashMap;
use tracing::{debug, info};

use matbuddy_config::model::SessionConfig;
use matbuddy_core::{ChatHandle, Clock};

/// A cached conversation and the model it is bound to.
pub struct Session {
    pub handle: Box<dyn ChatHandle>,
    pub model: String,
    pub last_used: DateTime<Local>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("model", &self.model)
            .field("last_used", &self.last_used)
            .finish_non_exhaustive()
    }
}

/// TTL-bounded session cache keyed by chat id.
pub struct SessionStore {
    sessions: DashMap<i64, Session>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
            timeout: Duration::minutes(config.timeout_minutes as i64),
            max_sessions: config.max_sessions,
        }
    }

    /// Removes and returns the chat's session if it is still fresh.
    /// An expired session is dropped.
    pub fn take(&self, chat_id: i64) -> Option<Session> {
        let (_, session) = self.sessions.remove(&chat_id)?;
        if self.is_stale(&session) {
            debug!(chat_id, model = %session.model, "cached session expired");
            return None;
        }
        Some(session)
    }

    /// Caches `handle` for the chat, replacing whatever was there.
    pub fn put(&self, chat_id: i64, handle: Box<dyn ChatHandle>, model: &str) {
        self.sessions.insert(
            chat_id,
            Session {
                handle,
                model: model.to_string(),
                last_used: self.clock.now(),
            },
        );
        if self.sessions.len() > self.max_sessions {
            self.evict_stale();
        }
    }

    /// Drops the chat's session, if any.
    pub fn invalidate(&self, chat_id: i64) {
        if self.sessions.remove(&chat_id).is_some() {
            debug!(chat_id, "session invalidated");
        }
    }

    /// Removes every session idle past the timeout. Returns how many went.
    pub fn evict_stale(&self) -> usize {
        let before = self.sessions.len();
        let now = self.clock.now();
        self.sessions
            .retain(|_, session| now.signed_duration_since(session.last_used) < self.timeout);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "evicted stale sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_stale(&self, session: &Session) -> bool {
        self.clock.now().signed_duration_since(session.last_used) >= self.timeout
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use matbuddy_core::ManualClock;
    use matbuddy_test_utils::StubChat;

    use super::*;

    fn store(max_sessions: usize) -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
        ));
        let config = SessionConfig {
            timeout_minutes: 30,
            max_sessions,
        };
        (SessionStore::new(&config, clock.clone()), clock)
    }

    #[test]
    fn fresh_session_is_returned_once() {
        let (store, clock) = store(10);
        store.put(1, Box::new(StubChat::new("m")), "gemini-2.5-flash-lite");
        clock.advance(Duration::minutes(29));

        let session = store.take(1).unwrap();
        assert_eq!(session.model, "gemini-2.5-flash-lite");
        assert!(store.take(1).is_none());
    }

    #[test]
    fn expired_session_is_absent() {
        let (store, clock) = store(10);
        store.put(1, Box::new(StubChat::new("m")), "m");
        clock.advance(Duration::minutes(30));
        assert!(store.take(1).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn put_overwrites() {
        let (store, _clock) = store(10);
        store.put(1, Box::new(StubChat::new("m")), "a");
        store.put(1, Box::new(StubChat::new("m")), "b");
        assert_eq!(store.len(), 1);
        assert_eq!(store.take(1).unwrap().model, "b");
    }

    #[test]
    fn exceeding_cap_evicts_only_idle_sessions() {
        let (store, clock) = store(2);
        store.put(1, Box::new(StubChat::new("m")), "m");
        store.put(2, Box::new(StubChat::new("m")), "m");
        clock.advance(Duration::minutes(45));
        store.put(3, Box::new(StubChat::new("m")), "m");

        assert_eq!(store.len(), 1);
        assert!(store.take(3).is_some());
    }

    #[test]
    fn under_cap_keeps_idle_sessions_until_lookup() {
        let (store, clock) = store(5);
        store.put(1, Box::new(StubChat::new("m")), "m");
        clock.advance(Duration::hours(2));
        store.put(2, Box::new(StubChat::new("m")), "m");
        assert_eq!(store.len(), 2);
        assert_eq!(store.evict_stale(), 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let (store, _clock) = store(5);
        store.put(7, Box::new(StubChat::new("m")), "m");
        store.invalidate(7);
        assert!(store.take(7).is_none());
    }
}
