// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use parking_lot::Mutex;

use super::{Credentials, RenewedAccess, Token};

/// Per-session key-value store of the two credentials.
///
/// Writes are `pub(crate)`: only the session (on behalf of the guard and the
/// refresh coordinator) mutates it, always while holding the coordinator's
/// state lock. Lock order is coordinator state, then store.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    credentials: Credentials,
    cleared: bool,
}

impl CredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self { inner: Mutex::new(Inner { credentials, cleared: false }) }
    }

    pub fn snapshot(&self) -> Credentials {
        self.inner.lock().credentials.clone()
    }

    pub fn access(&self) -> Option<Token> {
        self.inner.lock().credentials.access.clone()
    }

    pub fn refresh(&self) -> Option<Token> {
        self.inner.lock().credentials.refresh.clone()
    }

    /// Whether the store was torn down after a terminal failure.
    pub fn is_cleared(&self) -> bool {
        self.inner.lock().cleared
    }

    pub(crate) fn apply(&self, renewed: &RenewedAccess) {
        let mut inner = self.inner.lock();
        inner.credentials.access = Some(renewed.access.clone());
        if let Some(ref refresh) = renewed.refresh {
            inner.credentials.refresh = Some(refresh.clone());
        }
    }

    /// Fill in an access credential the client presented when the store has none.
    pub(crate) fn adopt_access(&self, access: Token) {
        let mut inner = self.inner.lock();
        if inner.credentials.access.is_none() && !inner.cleared {
            inner.credentials.access = Some(access);
        }
    }

    /// Overwrite the access credential. Ignored once the store was cleared.
    pub(crate) fn replace_access(&self, access: Token) {
        let mut inner = self.inner.lock();
        if !inner.cleared {
            inner.credentials.access = Some(access);
        }
    }

    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.credentials = Credentials::default();
        inner.cleared = true;
    }
}
