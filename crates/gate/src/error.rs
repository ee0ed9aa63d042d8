// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::forms::{FieldError, ValidationErrors};

/// Error codes for the gate's HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthorized,
    BadRequest,
    Validation,
    NotFound,
    UpstreamError,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::BadRequest => 400,
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::UpstreamError => 502,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into(), fields: Vec::new() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
///
/// `fields` is only populated for form validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// Authentication conditions as seen by the guard, the refresh coordinator,
/// and the outbound call wrapper.
///
/// `Clone` because a single refresh failure is fanned out to every caller
/// queued behind the episode leader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No usable credential at all.
    #[error("not authenticated")]
    Unauthenticated,

    /// Access credential invalid or absent while a refresh credential exists.
    #[error("access credential expired")]
    AccessExpiredRecoverable,

    /// The refresh credential was rejected. Terminal for the session.
    #[error("refresh failed: {0}")]
    RefreshFailed(String),

    /// Network error or timeout talking to the credential authority.
    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    /// Form-level input errors. Never touches session state.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated | Self::AccessExpiredRecoverable | Self::RefreshFailed(_) => {
                ErrorCode::Unauthorized
            }
            Self::BackendUnreachable(_) => ErrorCode::UpstreamError,
            Self::Validation(_) => ErrorCode::Validation,
        }
    }

    /// Whether the session must be torn down after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::RefreshFailed(_))
    }

    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let (status, Json(mut body)) = self.code().to_http_response(self.to_string());
        if let Self::Validation(errors) = self {
            body.error.fields = errors.fields().to_vec();
        }
        (status, Json(body))
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
