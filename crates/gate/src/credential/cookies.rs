// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential cookies: the transport binding of the credential store.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use time::Duration;

use super::{Credentials, Token};

/// Cookie names, lifetimes, and flags.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    pub access_max_age: Duration,
    pub refresh_max_age: Duration,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_name: "access_token".into(),
            refresh_name: "refresh_token".into(),
            access_max_age: Duration::days(7),
            refresh_max_age: Duration::days(30),
            secure: true,
        }
    }
}

fn credential_cookie(
    name: &str,
    token: &Token,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_owned(), token.as_str().to_owned()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), "")).path("/").max_age(Duration::ZERO).build()
}

/// Read both credentials from the request cookies. Empty values count as absent.
pub fn read(jar: &CookieJar, settings: &CookieSettings) -> Credentials {
    let get = |name: &str| {
        jar.get(name).map(|c| c.value()).filter(|v| !v.is_empty()).map(Token::new)
    };
    Credentials::new(get(&settings.access_name), get(&settings.refresh_name))
}

pub fn access_cookie(settings: &CookieSettings, token: &Token) -> Cookie<'static> {
    credential_cookie(&settings.access_name, token, settings.access_max_age, settings.secure)
}

pub fn refresh_cookie(settings: &CookieSettings, token: &Token) -> Cookie<'static> {
    credential_cookie(&settings.refresh_name, token, settings.refresh_max_age, settings.secure)
}

/// Add a cookie for every credential present in `credentials`.
pub fn write(jar: CookieJar, settings: &CookieSettings, credentials: &Credentials) -> CookieJar {
    let mut jar = jar;
    if let Some(ref access) = credentials.access {
        jar = jar.add(access_cookie(settings, access));
    }
    if let Some(ref refresh) = credentials.refresh {
        jar = jar.add(refresh_cookie(settings, refresh));
    }
    jar
}

/// Add cookies only for credentials that differ from what the client presented.
pub fn write_changed(
    jar: CookieJar,
    settings: &CookieSettings,
    presented: &Credentials,
    current: &Credentials,
) -> CookieJar {
    let changed = Credentials::new(
        current.access.clone().filter(|t| presented.access.as_ref() != Some(t)),
        current.refresh.clone().filter(|t| presented.refresh.as_ref() != Some(t)),
    );
    write(jar, settings, &changed)
}

/// Expire both credential cookies.
pub fn clear(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    jar.remove(removal_cookie(&settings.access_name))
        .remove(removal_cookie(&settings.refresh_name))
}

/// Rewrite the inbound `Cookie` header so downstream handlers see `credentials`
/// instead of what the client sent.
pub fn rewrite_request_header(
    headers: &mut HeaderMap,
    settings: &CookieSettings,
    credentials: &Credentials,
) {
    let mut pairs: Vec<String> = CookieJar::from_headers(headers)
        .iter()
        .filter(|c| c.name() != settings.access_name && c.name() != settings.refresh_name)
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    if let Some(ref access) = credentials.access {
        pairs.push(format!("{}={}", settings.access_name, access.as_str()));
    }
    if let Some(ref refresh) = credentials.refresh {
        pairs.push(format!("{}={}", settings.refresh_name, refresh.as_str()));
    }
    headers.remove(COOKIE);
    if pairs.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        headers.insert(COOKIE, value);
    }
}

#[cfg(test)]
#[path = "cookies_tests.rs"]
mod tests;
