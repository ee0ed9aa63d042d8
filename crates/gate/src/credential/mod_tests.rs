// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[parameterized(
    jwt_like = { "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOjF9.sig", true },
    opaque = { "abc123", true },
    empty = { "", false },
    space = { "abc 123", false },
    semicolon = { "abc;123", false },
    comma = { "abc,123", false },
    quote = { "\"abc\"", false },
    newline = { "abc\n", false },
)]
fn well_formed(value: &str, expected: bool) {
    assert_eq!(Token::new(value).is_well_formed(), expected);
}

#[test]
fn fingerprint_is_stable_and_short() {
    let a = Token::new("refresh-secret");
    assert_eq!(a.fingerprint(), Token::new("refresh-secret").fingerprint());
    assert_ne!(a.fingerprint(), Token::new("other-secret").fingerprint());
    assert_eq!(a.fingerprint().len(), 16);
}

#[test]
fn debug_never_prints_secret() {
    let rendered = format!("{:?}", Credentials::new(Some(Token::new("s3cr3t")), None));
    assert!(!rendered.contains("s3cr3t"), "{rendered}");
    assert!(rendered.contains("Token("));
}

#[test]
fn empty_credentials() {
    assert!(Credentials::default().is_empty());
    assert!(!Credentials::new(None, Some(Token::new("r"))).is_empty());
}

#[parameterized(
    refresh_only = { None, Some("r1"), AuthError::AccessExpiredRecoverable },
    both = { Some("a1"), Some("r1"), AuthError::AccessExpiredRecoverable },
    access_only = { Some("a1"), None, AuthError::Unauthenticated },
    neither = { None, None, AuthError::Unauthenticated },
)]
fn access_failure_depends_on_refresh(
    access: Option<&str>,
    refresh: Option<&str>,
    expected: AuthError,
) {
    let credentials = Credentials::new(access.map(Token::new), refresh.map(Token::new));
    assert_eq!(credentials.access_failure(), expected);
    assert_eq!(credentials.access_failure().is_terminal(), expected == AuthError::Unauthenticated);
}
