// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the auth endpoints under `/api/`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::credential::{cookies, Credentials, Token};
use crate::error::{AuthError, ErrorCode};
use crate::forms::{LoginForm, RegisterForm};
use crate::state::GateState;
use crate::upstream::BackendError;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTokenRequest {
    #[serde(default)]
    pub token: String,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/health`
pub async fn health(State(s): State<Arc<GateState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), session_count: s.sessions.len() })
}

/// `POST /api/auth/login`: exchange email and password for both credential cookies.
pub async fn login(
    State(s): State<Arc<GateState>>,
    jar: CookieJar,
    Json(form): Json<LoginForm>,
) -> Response {
    let form = match form.validate() {
        Ok(form) => form,
        Err(errors) => return AuthError::from(errors).to_http_response().into_response(),
    };

    match s.backend.login(&form.email, &form.password).await {
        Ok(pair) => {
            let credentials =
                Credentials::new(Some(Token::new(pair.access)), Some(Token::new(pair.refresh)));
            tracing::info!(
                session = %credentials.refresh.as_ref().map(Token::fingerprint).unwrap_or_default(),
                "login succeeded"
            );
            let jar = cookies::write(jar, &s.cookies, &credentials);
            (jar, Json(SuccessResponse { success: true })).into_response()
        }
        Err(e) => {
            tracing::warn!(err = %e, "login failed");
            backend_failure(e)
        }
    }
}

/// `POST /api/auth/register`: create an account; the backend's payload is returned.
pub async fn register(
    State(s): State<Arc<GateState>>,
    Json(form): Json<RegisterForm>,
) -> Response {
    let form = match form.validate() {
        Ok(form) => form,
        Err(errors) => return AuthError::from(errors).to_http_response().into_response(),
    };

    match s.backend.register(&form.email, &form.username, &form.password).await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => {
            tracing::warn!(err = %e, "registration failed");
            backend_failure(e)
        }
    }
}

/// `POST /api/auth/logout`: drop the session and expire both cookies.
pub async fn logout(State(s): State<Arc<GateState>>, jar: CookieJar) -> Response {
    let presented = cookies::read(&jar, &s.cookies);
    let session = s.sessions.resolve(&presented);
    session.clear();
    s.sessions.forget(&session);
    (cookies::clear(jar, &s.cookies), Json(SuccessResponse { success: true })).into_response()
}

/// `POST /api/update_token`: replace the access credential in the caller's
/// session and cookie.
pub async fn update_token(
    State(s): State<Arc<GateState>>,
    jar: CookieJar,
    Json(req): Json<UpdateTokenRequest>,
) -> Response {
    let token = Token::new(req.token);
    if !token.is_well_formed() {
        return ErrorCode::BadRequest.to_http_response("token is required").into_response();
    }
    let presented = cookies::read(&jar, &s.cookies);
    let session = s.sessions.resolve(&presented);
    if !session.replace_access(token.clone()) {
        tracing::debug!(session = %session.id(), "renewal in flight, access update skipped");
    }
    let jar = jar.add(cookies::access_cookie(&s.cookies, &token));
    (jar, Json(SuccessResponse { success: true })).into_response()
}

/// Relay a failed login/register call. Backend rejections keep their status
/// and payload; transport failures become a 502.
fn backend_failure(e: BackendError) -> Response {
    match e {
        BackendError::Status { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(payload) => (status, Json(payload)).into_response(),
                Err(_) => ErrorCode::UpstreamError.to_http_response(body).into_response(),
            }
        }
        other => ErrorCode::UpstreamError.to_http_response(other.to_string()).into_response(),
    }
}
