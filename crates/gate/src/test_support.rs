// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fakes for the backend seams.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::http::StatusCode;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::credential::{Credentials, RenewedAccess, Token};
use crate::upstream::{
    BackendError, ResourceRequest, ResourceResponse, ResourceTransport, TokenAuthority,
};

/// Assert that an expression returns `Err` whose `Display` contains `$substr`.
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
pub(crate) use assert_err_contains;

pub const TIMEOUT: Duration = Duration::from_secs(2);

pub fn token(value: &str) -> Token {
    Token::new(value)
}

pub fn creds(access: Option<&str>, refresh: Option<&str>) -> Credentials {
    Credentials::new(access.map(Token::new), refresh.map(Token::new))
}

/// How the fake answers a refresh call.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Renew { access: String, refresh: Option<String> },
    Reject(u16),
    Unreachable,
}

/// Fake backend: verifies a fixed set of access credentials, renews per a
/// scripted outcome, and serves protected resources only to valid bearers.
pub struct FakeBackend {
    valid: Mutex<HashSet<String>>,
    outcome: Mutex<RefreshOutcome>,
    reject_all_resources: AtomicBool,
    held: AtomicBool,
    permits: Semaphore,
    pub refresh_entered: Notify,
    pub verify_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
    pub bearers: Mutex<Vec<Option<String>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            valid: Mutex::new(HashSet::new()),
            outcome: Mutex::new(RefreshOutcome::Reject(401)),
            reject_all_resources: AtomicBool::new(false),
            held: AtomicBool::new(false),
            permits: Semaphore::new(0),
            refresh_entered: Notify::new(),
            verify_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            resource_calls: AtomicUsize::new(0),
            bearers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_valid(self, access: &str) -> Self {
        self.valid.lock().insert(access.to_owned());
        self
    }

    pub fn renewing_to(self, access: &str) -> Self {
        self.with_outcome(RefreshOutcome::Renew { access: access.to_owned(), refresh: None })
    }

    pub fn with_outcome(self, outcome: RefreshOutcome) -> Self {
        *self.outcome.lock() = outcome;
        self
    }

    /// Every resource call answers 401, whatever the bearer.
    pub fn rejecting_resources(self) -> Self {
        self.reject_all_resources.store(true, Ordering::SeqCst);
        self
    }

    /// Park refresh calls until [`FakeBackend::release`] is called.
    pub fn held(self) -> Self {
        self.held.store(true, Ordering::SeqCst);
        self
    }

    pub fn release(&self) {
        self.permits.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn resource_count(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }
}

impl TokenAuthority for FakeBackend {
    async fn verify(&self, access: &Token) -> Result<(), BackendError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.valid.lock().contains(access.as_str()) {
            Ok(())
        } else {
            Err(BackendError::Status { status: 401, body: String::new() })
        }
    }

    async fn refresh(&self, _refresh: &Token) -> Result<RenewedAccess, BackendError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_entered.notify_one();
        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
        }
        let outcome = self.outcome.lock().clone();
        match outcome {
            RefreshOutcome::Renew { access, refresh } => {
                self.valid.lock().insert(access.clone());
                Ok(RenewedAccess { access: Token::new(access), refresh: refresh.map(Token::new) })
            }
            RefreshOutcome::Reject(status) => {
                Err(BackendError::Status { status, body: "token_not_valid".to_owned() })
            }
            RefreshOutcome::Unreachable => {
                Err(BackendError::Decode("connection refused".to_owned()))
            }
        }
    }
}

impl ResourceTransport for FakeBackend {
    async fn send(
        &self,
        _request: &ResourceRequest,
        bearer: Option<&Token>,
    ) -> Result<ResourceResponse, BackendError> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        self.bearers.lock().push(bearer.map(|t| t.as_str().to_owned()));
        let authorized = !self.reject_all_resources.load(Ordering::SeqCst)
            && bearer.is_some_and(|t| self.valid.lock().contains(t.as_str()));
        let status = if authorized { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
        Ok(ResourceResponse {
            status,
            content_type: Some("application/json".to_owned()),
            body: Bytes::from_static(b"[]"),
        })
    }
}
