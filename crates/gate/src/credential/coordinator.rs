// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight credential renewal.
//!
//! Per session the coordinator is either `Idle` or `Refreshing`. The first
//! caller to find it `Idle` flips it to `Refreshing` under the state lock and
//! becomes the leader: it alone calls the authority. Everyone arriving while
//! `Refreshing` is queued FIFO and receives the leader's outcome, success or
//! failure, in enqueue order. Store writes happen under the same lock, so an
//! edge-triggered and an outbound-triggered renewal can never both lead.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::store::CredentialStore;
use super::{RenewedAccess, Token};
use crate::error::AuthError;
use crate::upstream::{with_deadline, TokenAuthority};

type Waiter = oneshot::Sender<Result<Token, AuthError>>;

enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<Waiter> },
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<Result<Token, AuthError>>),
    /// Someone already renewed past the caller's stale credential.
    Settled(Token),
}

/// Per-session refresh state machine.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    episodes: AtomicU64,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self { state: Mutex::new(RefreshState::Idle), episodes: AtomicU64::new(0) }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::Refreshing { .. })
    }

    /// Callers currently queued behind the leader.
    pub fn queued(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Number of renewal episodes led so far, i.e. refresh calls issued.
    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::Relaxed)
    }

    /// Return a fresh access credential, renewing it at most once for all
    /// concurrent callers.
    ///
    /// `stale` is the access credential the caller saw fail (or `None` if it
    /// had none). If the store already holds a different one, it is returned
    /// without a new episode.
    ///
    /// On failure the store is cleared and every queued caller receives the
    /// same error. A leader dropped mid-flight leaves the store untouched;
    /// its followers go around again and one of them leads the next episode.
    pub async fn acquire_fresh_credential<A: TokenAuthority>(
        &self,
        store: &CredentialStore,
        authority: &A,
        stale: Option<&Token>,
        deadline: Duration,
    ) -> Result<Token, AuthError> {
        loop {
            match self.claim(store, stale) {
                Role::Settled(token) => return Ok(token),
                Role::Follower(rx) => {
                    debug!("joining in-flight refresh");
                    match rx.await {
                        Ok(result) => return result,
                        Err(_) => debug!("refresh leader went away, taking over"),
                    }
                }
                Role::Leader => {
                    let episode = self.episodes.fetch_add(1, Ordering::Relaxed) + 1;
                    let pending = Episode { coordinator: self, store, settled: false };
                    let outcome = renew(store, authority, deadline).await;
                    if let Err(ref e) = outcome {
                        warn!(episode, err = %e, "refresh episode failed");
                    } else {
                        debug!(episode, "refresh episode succeeded");
                    }
                    return pending.settle(outcome);
                }
            }
        }
    }

    fn claim(&self, store: &CredentialStore, stale: Option<&Token>) -> Role {
        let mut state = self.state.lock();
        match &mut *state {
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push_back(tx);
                Role::Follower(rx)
            }
            RefreshState::Idle => match store.access() {
                Some(current) if stale != Some(&current) && !store.is_cleared() => {
                    Role::Settled(current)
                }
                _ => {
                    *state = RefreshState::Refreshing { waiters: VecDeque::new() };
                    Role::Leader
                }
            },
        }
    }

    /// Clear the store unless an episode is running; the episode decides then.
    pub(crate) fn clear_if_idle(&self, store: &CredentialStore) -> bool {
        let state = self.state.lock();
        if matches!(*state, RefreshState::Idle) {
            store.clear();
            true
        } else {
            false
        }
    }

    /// Adopt a client-presented access credential when the store lacks one.
    pub(crate) fn adopt_if_idle(&self, store: &CredentialStore, access: Token) {
        let state = self.state.lock();
        if matches!(*state, RefreshState::Idle) {
            store.adopt_access(access);
        }
    }

    /// Overwrite the access credential unless an episode is running.
    pub(crate) fn replace_if_idle(&self, store: &CredentialStore, access: Token) -> bool {
        let state = self.state.lock();
        if matches!(*state, RefreshState::Idle) {
            store.replace_access(access);
            true
        } else {
            false
        }
    }
}

async fn renew<A: TokenAuthority>(
    store: &CredentialStore,
    authority: &A,
    deadline: Duration,
) -> Result<RenewedAccess, AuthError> {
    let Some(refresh) = store.refresh() else {
        return Err(AuthError::Unauthenticated);
    };
    with_deadline(deadline, authority.refresh(&refresh)).await.map_err(|e| e.into_refresh_error())
}

/// The leader's claim on the `Refreshing` state.
struct Episode<'a> {
    coordinator: &'a RefreshCoordinator,
    store: &'a CredentialStore,
    settled: bool,
}

impl Episode<'_> {
    fn settle(mut self, outcome: Result<RenewedAccess, AuthError>) -> Result<Token, AuthError> {
        self.settled = true;
        let waiters = {
            let mut state = self.coordinator.state.lock();
            match outcome {
                Ok(ref renewed) => self.store.apply(renewed),
                Err(_) => self.store.clear(),
            }
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => VecDeque::new(),
            }
        };
        let result = outcome.map(|renewed| renewed.access);
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        result
    }
}

impl Drop for Episode<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.coordinator.state.lock();
        // Dropping the senders wakes every follower to retry.
        let released = match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        };
        warn!(released, "refresh leader dropped before completion");
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
