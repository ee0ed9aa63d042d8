// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session guard: decides, per inbound page request, whether to let it
//! through, renew its credentials first, or send the caller to login.

mod layer;

pub use layer::guard_layer;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::credential::{Credentials, Session, Token};
use crate::error::AuthError;
use crate::routes::{RouteClass, RouteTable};
use crate::upstream::{with_deadline, TokenAuthority};

/// What the transport layer should do with a guarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Continue,
    /// The store now holds these credentials; the request proceeds with them.
    ContinueWithUpdatedStore(Credentials),
    Redirect(String),
    /// Both credentials were removed from the store.
    RedirectAndClear(String),
}

impl GuardOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::ContinueWithUpdatedStore(_) => "continue_updated",
            Self::Redirect(_) => "redirect",
            Self::RedirectAndClear(_) => "redirect_clear",
        }
    }
}

pub struct SessionGuard<A> {
    routes: RouteTable,
    authority: Arc<A>,
    timeout: Duration,
}

impl<A: TokenAuthority> SessionGuard<A> {
    pub fn new(routes: RouteTable, authority: Arc<A>, timeout: Duration) -> Self {
        Self { routes, authority, timeout }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run the guard for `path` against `session`. Never fails: network errors
    /// from verification count as an invalid access credential.
    pub async fn check(&self, path: &str, session: &Session) -> GuardOutcome {
        match self.routes.classify(path) {
            RouteClass::Bypass => GuardOutcome::Continue,
            RouteClass::Public => {
                let signed_in = session.store().access().is_some_and(|t| t.is_well_formed());
                if path != RouteTable::ROOT && signed_in {
                    GuardOutcome::Redirect(self.routes.landing().to_owned())
                } else {
                    GuardOutcome::Continue
                }
            }
            RouteClass::Protected => self.check_protected(session).await,
        }
    }

    async fn check_protected(&self, session: &Session) -> GuardOutcome {
        let credentials = session.credentials();
        if credentials.is_empty() {
            return GuardOutcome::Redirect(self.login());
        }
        if let Some(ref access) = credentials.access {
            match with_deadline(self.timeout, self.authority.verify(access)).await {
                Ok(()) => return GuardOutcome::Continue,
                Err(e) => debug!(session = %session.id(), err = %e, "access credential rejected"),
            }
        }
        match credentials.access_failure() {
            AuthError::AccessExpiredRecoverable => {
                self.renew(session, credentials.access.as_ref()).await
            }
            _ => {
                session.clear();
                GuardOutcome::RedirectAndClear(self.login())
            }
        }
    }

    async fn renew(&self, session: &Session, stale: Option<&Token>) -> GuardOutcome {
        match session.acquire_fresh_credential(&*self.authority, stale, self.timeout).await {
            Ok(_) => GuardOutcome::ContinueWithUpdatedStore(session.credentials()),
            Err(_) => {
                session.clear();
                GuardOutcome::RedirectAndClear(self.login())
            }
        }
    }

    fn login(&self) -> String {
        self.routes.login().to_owned()
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
