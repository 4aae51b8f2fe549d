//! services/api/src/engine/session.rs
//!
//! The in-memory, per-owner conversation session store.
//!
//! Sessions live in a `DashMap`, whose sharded locking gives `get_or_create`
//! atomic per-key semantics with a lock-free read path. There is no
//! per-owner request serialization beyond that: two concurrent turns for
//! the same owner resolve last-writer-wins on the cached feedback summary,
//! and the TTL sweep may evict a session mid-turn. Both are accepted
//! tradeoffs; an evicted session is simply observed as fresh on the next
//! access, never as an error.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::info;
use tutor_core::domain::ConversationTurn;

/// Mutable per-owner conversation state.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub transcript: Vec<ConversationTurn>,
    pub last_active_at: Instant,
    /// Cached summary of the owner's past feedback, refreshed lazily.
    pub feedback_summary: Option<String>,
    /// Set when new feedback lands, forcing a refresh on the next turn.
    pub feedback_dirty: bool,
}

impl UserSession {
    fn new() -> Self {
        Self {
            transcript: Vec::new(),
            last_active_at: Instant::now(),
            feedback_summary: None,
            feedback_dirty: false,
        }
    }
}

/// Concurrent owner -> session map with TTL-based eviction.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, UserSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Runs `f` against the owner's session, creating it atomically on a
    /// miss and touching `last_active_at` either way. The shard lock is
    /// held for the duration of `f`, so callers keep it synchronous and
    /// short.
    pub fn with_session<R>(&self, owner: &str, f: impl FnOnce(&mut UserSession) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(owner.to_string())
            .or_insert_with(UserSession::new);
        entry.last_active_at = Instant::now();
        f(entry.value_mut())
    }

    /// Creates the owner's session if absent and refreshes its activity
    /// timestamp.
    pub fn touch(&self, owner: &str) {
        self.with_session(owner, |_| {});
    }

    /// Marks the owner's cached feedback summary stale, if a session
    /// exists. Never creates a session: feedback on its own is not
    /// conversational activity.
    pub fn mark_feedback_dirty(&self, owner: &str) {
        if let Some(mut session) = self.sessions.get_mut(owner) {
            session.feedback_dirty = true;
        }
    }

    /// Removes every session inactive for longer than `ttl`. Returns the
    /// number of sessions evicted.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().last_active_at.elapsed() > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        for owner in &expired {
            self.sessions.remove(owner);
            info!("Removed inactive session: {}", owner);
        }
        expired.len()
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.sessions.contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Rewinds a session's activity timestamp, for eviction tests.
    #[cfg(test)]
    pub fn backdate(&self, owner: &str, age: Duration) {
        if let Some(mut session) = self.sessions.get_mut(owner) {
            session.last_active_at = Instant::now().checked_sub(age).expect("clock underflow");
        }
    }
}
