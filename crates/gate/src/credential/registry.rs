// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide map from refresh-credential fingerprint to [`Session`].
//!
//! Concurrent requests from one browser carry the same refresh cookie and so
//! land on the same session and the same coordinator. Distinct sessions never
//! share state.
//!
//! Only the current refresh credential of a session is a live key. After a
//! rotation the previous key is retired: it still resolves to the session for
//! the rotation grace period, so requests already in flight with the old
//! cookie follow the rotation. Past that, a retired credential resolves to an
//! unregistered session holding only what the caller presented.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::session::Session;
use super::{Credentials, Token};

pub const DEFAULT_ROTATION_GRACE: Duration = Duration::from_secs(10);

struct Retired {
    session: Arc<Session>,
    at: Instant,
}

#[derive(Default)]
struct Keys {
    live: HashMap<String, Arc<Session>>,
    retired: HashMap<String, Retired>,
}

pub struct SessionRegistry {
    keys: RwLock<Keys>,
    rotation_grace: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_rotation_grace(DEFAULT_ROTATION_GRACE)
    }

    pub fn with_rotation_grace(rotation_grace: Duration) -> Self {
        Self { keys: RwLock::new(Keys::default()), rotation_grace }
    }

    /// Find or create the session for the credentials a request presented.
    ///
    /// Without a refresh credential the session is ephemeral. A registered
    /// session that was cleared is replaced by a fresh one seeded from the
    /// presented credentials.
    pub fn resolve(&self, presented: &Credentials) -> Arc<Session> {
        let Some(ref refresh) = presented.refresh else {
            return Arc::new(Session::new(presented.clone()));
        };
        let key = refresh.fingerprint();

        {
            let keys = self.keys.read();
            if let Some(session) = keys.live.get(&key).filter(|s| !s.is_cleared()) {
                session.touch();
                if let Some(ref access) = presented.access {
                    session.adopt_access(access.clone());
                }
                return Arc::clone(session);
            }
            if let Some(retired) = keys.retired.get(&key) {
                if retired.at.elapsed() < self.rotation_grace && !retired.session.is_cleared() {
                    let id = retired.session.id();
                    tracing::debug!(session = %id, "rotated-out refresh credential in grace");
                    return Arc::clone(&retired.session);
                }
                return Arc::new(Session::new(presented.clone()));
            }
        }

        let mut keys = self.keys.write();
        match keys.live.get(&key) {
            Some(session) if !session.is_cleared() => {
                session.touch();
                Arc::clone(session)
            }
            _ => {
                let session = Arc::new(Session::new(presented.clone()));
                keys.live.insert(key, Arc::clone(&session));
                tracing::debug!(session = %session.id(), "session registered");
                session
            }
        }
    }

    /// Make `refresh` the only live key for `session`, retiring the others.
    pub fn rotate(&self, session: &Arc<Session>, refresh: &Token) {
        let key = refresh.fingerprint();
        let now = Instant::now();
        let mut keys = self.keys.write();
        let previous: Vec<String> = keys
            .live
            .iter()
            .filter(|(k, s)| **k != key && Arc::ptr_eq(*s, session))
            .map(|(k, _)| k.clone())
            .collect();
        for k in previous {
            keys.live.remove(&k);
            keys.retired.insert(k, Retired { session: Arc::clone(session), at: now });
        }
        keys.retired.remove(&key);
        keys.live.insert(key, Arc::clone(session));
        tracing::debug!(session = %session.id(), "refresh credential rotated");
    }

    /// Drop every key, live or retired, that points at `session`.
    pub fn forget(&self, session: &Arc<Session>) {
        let mut keys = self.keys.write();
        let before = keys.live.len() + keys.retired.len();
        keys.live.retain(|_, s| !Arc::ptr_eq(&*s, session));
        keys.retired.retain(|_, r| !Arc::ptr_eq(&r.session, session));
        if keys.live.len() + keys.retired.len() < before {
            tracing::debug!(session = %session.id(), "session forgotten");
        }
    }

    /// Number of distinct live sessions.
    pub fn len(&self) -> usize {
        let keys = self.keys.read();
        let mut seen: Vec<*const Session> = keys.live.values().map(Arc::as_ptr).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    pub fn is_empty(&self) -> bool {
        let keys = self.keys.read();
        keys.live.is_empty() && keys.retired.is_empty()
    }

    /// Evict sessions idle longer than `max_idle` or already cleared, and
    /// retired keys past the rotation grace. Returns the live keys evicted.
    pub fn sweep(&self, max_idle: Duration) -> usize {
        let grace = self.rotation_grace;
        let mut keys = self.keys.write();
        let before = keys.live.len();
        keys.live.retain(|_, s| !s.is_cleared() && s.idle_for() < max_idle);
        keys.retired.retain(|_, r| !r.session.is_cleared() && r.at.elapsed() < grace);
        before - keys.live.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
