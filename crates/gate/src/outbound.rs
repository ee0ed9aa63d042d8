// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound call wrapper for protected backend resources.
//!
//! Attaches the session's access credential, and on a 401 renews it through
//! the session's refresh coordinator and reissues the call exactly once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::credential::{Session, Token};
use crate::error::AuthError;
use crate::upstream::{
    with_deadline, ResourceRequest, ResourceResponse, ResourceTransport, TokenAuthority,
};

pub struct OutboundClient<B> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B> Clone for OutboundClient<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend), timeout: self.timeout }
    }
}

impl<B: TokenAuthority + ResourceTransport> OutboundClient<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Issue `request` on behalf of `session`.
    ///
    /// Non-401 responses come back as-is. A 401 on the retried call is
    /// reported as [`AuthError::Unauthenticated`]; there is no second retry.
    pub async fn call(
        &self,
        session: &Session,
        request: ResourceRequest,
    ) -> Result<ResourceResponse, AuthError> {
        let sent = session.store().access();
        let first = self.send(&request, sent.as_ref()).await?;
        if !first.is_unauthorized() {
            return Ok(first);
        }

        debug!(session = %session.id(), path = %request.path, "401 from backend, renewing");
        let fresh =
            session.acquire_fresh_credential(&*self.backend, sent.as_ref(), self.timeout).await?;

        let retried = self.send(&request, Some(&fresh)).await?;
        if retried.is_unauthorized() {
            warn!(session = %session.id(), path = %request.path, "renewed credential rejected");
            return Err(AuthError::Unauthenticated);
        }
        Ok(retried)
    }

    async fn send(
        &self,
        request: &ResourceRequest,
        bearer: Option<&Token>,
    ) -> Result<ResourceResponse, AuthError> {
        with_deadline(self.timeout, self.backend.send(request, bearer))
            .await
            .map_err(|e| AuthError::BackendUnreachable(e.to_string()))
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
