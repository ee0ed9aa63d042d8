// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request path classification.
//!
//! Every path maps to exactly one [`RouteClass`]. Bypass is decided before the
//! public allowlist is consulted, so an asset-like path is never treated as a
//! page even if it textually collides with one.

/// Path prefixes that never consult credentials.
const BYPASS_PREFIXES: &[&str] = &["/_next/", "/api/"];

/// How the session guard treats a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Static assets and the internal API namespace.
    Bypass,
    /// Root, login and register pages.
    Public,
    /// Everything else.
    Protected,
}

/// Route table: the public allowlist plus redirect targets.
#[derive(Debug, Clone)]
pub struct RouteTable {
    login: String,
    register: String,
    landing: String,
}

impl RouteTable {
    pub const ROOT: &'static str = "/";

    pub fn new(
        login: impl Into<String>,
        register: impl Into<String>,
        landing: impl Into<String>,
    ) -> Self {
        Self { login: login.into(), register: register.into(), landing: landing.into() }
    }

    /// Login page; target of every unauthenticated redirect.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Authenticated landing page; target when a signed-in caller opens a public page.
    pub fn landing(&self) -> &str {
        &self.landing
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if is_bypass(path) {
            return RouteClass::Bypass;
        }
        if path == Self::ROOT || path == self.login || path == self.register {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new("/routes/login", "/routes/register", "/routes/dashboard")
    }
}

/// Internal namespaces, `favicon.ico`, and any path whose last segment carries
/// a file extension.
pub fn is_bypass(path: &str) -> bool {
    if BYPASS_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }
    let last = path.rsplit('/').next().unwrap_or_default();
    has_extension(last)
}

fn has_extension(segment: &str) -> bool {
    match segment.rfind('.') {
        Some(idx) => idx + 1 < segment.len(),
        None => false,
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
