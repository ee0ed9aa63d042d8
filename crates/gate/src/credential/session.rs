// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use super::coordinator::RefreshCoordinator;
use super::store::CredentialStore;
use super::{Credentials, Token};
use crate::error::AuthError;
use crate::upstream::TokenAuthority;

/// Explicit session context handed to the guard and the outbound wrapper.
///
/// Pairs one credential store with the coordinator that serializes its
/// renewal. Sessions without a refresh credential are never registered and
/// live only for the request that created them.
pub struct Session {
    id: String,
    store: CredentialStore,
    coordinator: RefreshCoordinator,
    last_seen: Mutex<Instant>,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        let id = match credentials.refresh {
            Some(ref refresh) => refresh.fingerprint(),
            None => "anonymous".to_owned(),
        };
        Self {
            id,
            store: CredentialStore::new(credentials),
            coordinator: RefreshCoordinator::new(),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    /// Fingerprint of the refresh credential the session was created with.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn credentials(&self) -> Credentials {
        self.store.snapshot()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn is_cleared(&self) -> bool {
        self.store.is_cleared()
    }

    /// See [`RefreshCoordinator::acquire_fresh_credential`].
    pub async fn acquire_fresh_credential<A: TokenAuthority>(
        &self,
        authority: &A,
        stale: Option<&Token>,
        deadline: Duration,
    ) -> Result<Token, AuthError> {
        let result = self
            .coordinator
            .acquire_fresh_credential(&self.store, authority, stale, deadline)
            .await;
        match result {
            Ok(ref token) if stale != Some(token) => {
                info!(session = %self.id, "access credential renewed");
            }
            Ok(_) => {}
            Err(ref e) => warn!(session = %self.id, err = %e, "credential renewal failed"),
        }
        result
    }

    /// Remove both credentials. No-op while a renewal is in flight.
    pub fn clear(&self) -> bool {
        self.coordinator.clear_if_idle(&self.store)
    }

    pub(crate) fn adopt_access(&self, access: Token) {
        self.coordinator.adopt_if_idle(&self.store, access);
    }

    /// Install an access credential issued outside the gate. No-op while a
    /// renewal is in flight; the renewed credential wins then.
    pub fn replace_access(&self, access: Token) -> bool {
        self.coordinator.replace_if_idle(&self.store, access)
    }

    pub(crate) fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}
