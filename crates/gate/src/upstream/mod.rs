// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend communication: the credential authority and protected resources.
//!
//! The two seams the session layer depends on are traits so tests can swap in
//! fakes; [`client::BackendClient`] implements both over HTTP.

pub mod client;

use std::future::Future;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use bytes::Bytes;

use crate::credential::{RenewedAccess, Token};
use crate::error::AuthError;

/// Errors from a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Normalize a failed refresh call. Any non-2xx is a rejection of the
    /// refresh credential; everything else means the authority was not reached.
    pub fn into_refresh_error(self) -> AuthError {
        match self {
            Self::Status { status, .. } => {
                AuthError::RefreshFailed(format!("refresh rejected with status {status}"))
            }
            other => AuthError::BackendUnreachable(other.to_string()),
        }
    }
}

/// The external authority that verifies and renews credentials.
pub trait TokenAuthority: Send + Sync + 'static {
    /// `Ok` iff the access credential is currently valid.
    fn verify(&self, access: &Token) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Exchange the refresh credential for a new access credential.
    fn refresh(
        &self,
        refresh: &Token,
    ) -> impl Future<Output = Result<RenewedAccess, BackendError>> + Send;
}

/// Transport for protected business calls.
pub trait ResourceTransport: Send + Sync + 'static {
    /// Issue `request`, attaching `bearer` when present. Non-2xx statuses are
    /// returned as responses, not errors.
    fn send(
        &self,
        request: &ResourceRequest,
        bearer: Option<&Token>,
    ) -> impl Future<Output = Result<ResourceResponse, BackendError>> + Send;
}

/// A replayable call to a protected backend resource.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    /// Path relative to the backend base URL.
    pub path: String,
    pub query: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl ResourceRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: None, body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether the path has a `.` or `..` segment, which URL normalisation
    /// would resolve outside the backend base.
    pub fn escapes_base(&self) -> bool {
        self.path.split(['/', '\\']).any(|segment| {
            let segment = segment.to_ascii_lowercase().replace("%2e", ".");
            segment == "." || segment == ".."
        })
    }
}

/// A buffered backend response.
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl ResourceResponse {
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }
}

/// Bound a backend call by `deadline`; expiry becomes [`BackendError::Timeout`].
pub async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(deadline)),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
