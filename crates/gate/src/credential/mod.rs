// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session credentials: the access/refresh pair, the per-session store, and
//! the single-flight refresh coordinator that renews it.
//!
//! Only the session guard, the refresh coordinator, and the outbound call
//! wrapper ever look inside a [`Credentials`] value.

pub mod cookies;
pub mod coordinator;
pub mod registry;
pub mod session;
pub mod store;
pub mod sweeper;

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::AuthError;

pub use coordinator::RefreshCoordinator;
pub use registry::SessionRegistry;
pub use session::Session;
pub use store::CredentialStore;

/// An opaque bearer secret.
///
/// `Debug` prints a fingerprint, never the secret itself.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and made only of characters legal in a cookie value and a
    /// bearer header. This is a shape check; validity is decided remotely.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'))
    }

    /// Short stable identifier for logs and registry keys.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.fingerprint())
    }
}

/// The two secrets attached to one session.
///
/// `access` may be absent while `refresh` is present; that is the normal
/// renewal trigger. Both absent means unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access: Option<Token>,
    pub refresh: Option<Token>,
}

impl Credentials {
    pub fn new(access: Option<Token>, refresh: Option<Token>) -> Self {
        Self { access, refresh }
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// What a missing or rejected access credential means for this pair.
    pub fn access_failure(&self) -> AuthError {
        if self.refresh.is_some() {
            AuthError::AccessExpiredRecoverable
        } else {
            AuthError::Unauthenticated
        }
    }
}

/// Result of a successful refresh call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewedAccess {
    pub access: Token,
    /// Present only when the authority rotated the refresh credential.
    pub refresh: Option<Token>,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
