// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding: protected business calls to the backend, and guarded page
//! requests to the app renderer.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, Request, State};
use axum::http::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE, USER_AGENT,
};
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::credential::cookies;
use crate::error::ErrorCode;
use crate::state::GateState;
use crate::upstream::{ResourceRequest, ResourceResponse};

/// Upper bound on a buffered page request body.
const MAX_PAGE_BODY: usize = 2 * 1024 * 1024;

/// `ANY /api/backend/{*path}`: call a protected resource with the caller's session.
///
/// A terminal auth failure answers 401 and expires both cookies.
pub async fn backend(
    State(s): State<Arc<GateState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let presented = cookies::read(&jar, &s.cookies);
    let session = s.sessions.resolve(&presented);

    let mut request = ResourceRequest::new(method, path);
    if request.escapes_base() {
        return ErrorCode::BadRequest
            .to_http_response("path must not contain dot segments")
            .into_response();
    }
    if let Some(query) = query {
        request = request.with_query(query);
    }
    if !body.is_empty() {
        match serde_json::from_slice(&body) {
            Ok(value) => request = request.with_body(value),
            Err(e) => {
                return ErrorCode::BadRequest
                    .to_http_response(format!("invalid JSON body: {e}"))
                    .into_response();
            }
        }
    }

    match s.outbound.call(&session, request).await {
        Ok(resp) => {
            let current = session.credentials();
            if let Some(ref refresh) = current.refresh {
                if presented.refresh.as_ref() != Some(refresh) {
                    s.sessions.rotate(&session, refresh);
                }
            }
            let jar = cookies::write_changed(jar, &s.cookies, &presented, &current);
            (jar, relay(resp)).into_response()
        }
        Err(e) if e.is_terminal() || session.is_cleared() => {
            session.clear();
            s.sessions.forget(&session);
            let jar = cookies::clear(jar, &s.cookies);
            (jar, ErrorCode::Unauthorized.to_http_response(e.to_string())).into_response()
        }
        Err(e) => e.to_http_response().into_response(),
    }
}

fn relay(resp: ResourceResponse) -> Response {
    let mut out = (resp.status, resp.body).into_response();
    if let Some(value) = resp.content_type.and_then(|v| HeaderValue::from_str(&v).ok()) {
        out.headers_mut().insert(CONTENT_TYPE, value);
    }
    out
}

/// Fallback: forward a page request the guard let through to the app renderer.
pub async fn forward_page(State(s): State<Arc<GateState>>, req: Request) -> Response {
    let Some(ref app_url) = s.config.app_url else {
        return ErrorCode::NotFound.to_http_response("not found").into_response();
    };

    let path_and_query = req.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let url = format!("{}{}", app_url.trim_end_matches('/'), path_and_query);
    let method = req.method().clone();
    let headers = req.headers().clone();
    let body = match axum::body::to_bytes(req.into_body(), MAX_PAGE_BODY).await {
        Ok(body) => body,
        Err(e) => {
            return ErrorCode::BadRequest.to_http_response(format!("body: {e}")).into_response();
        }
    };

    let mut upstream = s.pages.request(method, &url).body(body);
    for name in [ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, USER_AGENT] {
        for value in headers.get_all(&name) {
            upstream = upstream.header(&name, value.clone());
        }
    }

    let resp = match upstream.send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(url = %url, err = %e, "page forward failed");
            return ErrorCode::UpstreamError
                .to_http_response(format!("app unreachable: {e}"))
                .into_response();
        }
    };

    let status = resp.status();
    let mut relayed = Vec::new();
    for name in [CACHE_CONTROL, CONTENT_TYPE, LOCATION, SET_COOKIE] {
        for value in resp.headers().get_all(&name) {
            relayed.push((name.clone(), value.clone()));
        }
    }
    let body = match resp.bytes().await {
        Ok(body) => body,
        Err(e) => {
            return ErrorCode::UpstreamError.to_http_response(e.to_string()).into_response();
        }
    };

    let mut out = (status, body).into_response();
    for (name, value) in relayed {
        out.headers_mut().append(name, value);
    }
    out
}
