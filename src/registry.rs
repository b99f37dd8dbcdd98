//! Process-wide subscription state.
//!
//! One entry per active subscriber; presence of the entry is the liveness
//! flag the poll loop checks every iteration. All operations take the single
//! registry lock, which is never held across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

/// Channel-specific subscriber identity (Telegram chat id).
pub type SubscriberId = i64;

#[derive(Debug, Default)]
struct SubscriptionState {
    last_seen_issue: Option<String>,
}

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyActive,
}

/// Outcome of an unregistration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    Unregistered,
    NotActive,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<HashMap<SubscriberId, SubscriptionState>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically activate a subscriber. A no-op when already active, which
    /// is what guarantees at most one poll loop per subscriber: the caller
    /// only spawns on `Registered`.
    pub fn register(&self, id: SubscriberId) -> RegisterOutcome {
        let mut map = self.inner.lock().unwrap();
        if map.contains_key(&id) {
            RegisterOutcome::AlreadyActive
        } else {
            map.insert(id, SubscriptionState::default());
            RegisterOutcome::Registered
        }
    }

    /// Atomically deactivate a subscriber, dropping its state. The owning
    /// poll loop observes the removal at its next liveness check and exits.
    pub fn unregister(&self, id: SubscriberId) -> UnregisterOutcome {
        let mut map = self.inner.lock().unwrap();
        if map.remove(&id).is_some() {
            UnregisterOutcome::Unregistered
        } else {
            UnregisterOutcome::NotActive
        }
    }

    pub fn is_active(&self, id: SubscriberId) -> bool {
        self.inner.lock().unwrap().contains_key(&id)
    }

    pub fn last_seen(&self, id: SubscriberId) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|state| state.last_seen_issue.clone())
    }

    /// Record the newest issue seen for a subscriber. The owning poll loop
    /// is responsible for only ever advancing to a strictly newer issue.
    /// A no-op when the subscriber is no longer active.
    pub fn set_last_seen(&self, id: SubscriberId, issue: &str) {
        if let Some(state) = self.inner.lock().unwrap().get_mut(&id) {
            state.last_seen_issue = Some(issue.to_owned());
        }
    }
}
