// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fake backend and page renderer, served over real TCP on
//! ephemeral ports, plus a gate wired to them.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_test::{TestResponse, TestServer};
use clap::Parser;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use diary_gate::config::GateConfig;
use diary_gate::state::GateState;
use diary_gate::transport::build_router;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct-horse";
pub const GOOD_REFRESH: &str = "r1";

static INIT: Once = Once::new();

/// Install the rustls crypto provider (needed for reqwest even on plain HTTP).
pub fn ensure_crypto_provider() {
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Fake diary backend. Accepts [`GOOD_REFRESH`]; when rotating, every
/// successful refresh revokes the presented refresh credential and issues
/// `r2`, `r3`, ...
#[derive(Default)]
pub struct Backend {
    valid: Mutex<HashSet<String>>,
    rotating: AtomicBool,
    rotated: Mutex<HashSet<String>>,
    revoked: Mutex<HashSet<String>>,
    issued: AtomicUsize,
    rotations: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
}

impl Backend {
    pub fn with_valid(self, access: &str) -> Self {
        self.valid.lock().insert(access.to_owned());
        self
    }

    pub fn rotating(self) -> Self {
        self.rotating.store(true, Ordering::SeqCst);
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    fn issue(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("fresh-{n}");
        self.valid.lock().insert(access.clone());
        access
    }

    fn accepts_refresh(&self, refresh: &str) -> bool {
        !self.revoked.lock().contains(refresh)
            && (refresh == GOOD_REFRESH || self.rotated.lock().contains(refresh))
    }

    fn rotate(&self, refresh: &str) -> String {
        self.revoked.lock().insert(refresh.to_owned());
        let n = self.rotations.fetch_add(1, Ordering::SeqCst) + 2;
        let next = format!("r{n}");
        self.rotated.lock().insert(next.clone());
        next
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| self.valid.lock().contains(t))
    }
}

async fn login(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        let access = b.issue();
        Json(json!({ "access": access, "refresh": GOOD_REFRESH })).into_response()
    } else {
        let detail = json!({ "detail": "No active account found with the given credentials" });
        (StatusCode::UNAUTHORIZED, Json(detail)).into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        let errors = json!({ "username": ["A user with that username already exists."] });
        return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
    }
    let user = json!({ "id": 7, "email": body["email"], "username": body["username"] });
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn verify(State(b): State<Arc<Backend>>, headers: HeaderMap) -> StatusCode {
    b.verify_calls.fetch_add(1, Ordering::SeqCst);
    if b.authorized(&headers) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn refresh(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body["refresh"].as_str().unwrap_or_default();
    if !b.accepts_refresh(presented) {
        let detail = json!({ "detail": "Token is invalid or expired" });
        return (StatusCode::UNAUTHORIZED, Json(detail)).into_response();
    }
    if b.rotating.load(Ordering::SeqCst) {
        let refresh = b.rotate(presented);
        Json(json!({ "access": b.issue(), "refresh": refresh })).into_response()
    } else {
        Json(json!({ "access": b.issue() })).into_response()
    }
}

async fn diaries(State(b): State<Arc<Backend>>, uri: Uri, headers: HeaderMap) -> Response {
    b.resource_calls.fetch_add(1, Ordering::SeqCst);
    if !b.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "expired" }))).into_response();
    }
    Json(json!([{ "id": 1, "title": "first", "query": uri.query() }])).into_response()
}

async fn serve(router: Router) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// Page renderer that echoes the path and the inbound `Cookie` header.
async fn page(uri: Uri, headers: HeaderMap) -> String {
    let cookie = headers.get(COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    format!("page {} cookie [{cookie}]", uri.path())
}

pub struct Harness {
    pub backend: Arc<Backend>,
    pub state: Arc<GateState>,
    pub server: TestServer,
}

impl Harness {
    pub async fn start(backend: Backend) -> anyhow::Result<Self> {
        Self::start_with(backend, &[]).await
    }

    /// Start with extra gate flags appended to the defaults.
    pub async fn start_with(backend: Backend, flags: &[&str]) -> anyhow::Result<Self> {
        ensure_crypto_provider();
        let backend = Arc::new(backend);
        let api = Router::new()
            .route("/api/user_authentication/login/", post(login))
            .route("/api/user_authentication/register/", post(register))
            .route("/api/user_authentication/verify_token/", get(verify))
            .route("/api/token/refresh/", post(refresh))
            .route("/api/diaries/", get(diaries).post(diaries))
            .with_state(Arc::clone(&backend));
        let backend_addr = serve(api).await?;
        let app_addr = serve(Router::new().fallback(page)).await?;

        let backend_url = format!("http://{backend_addr}/api/");
        let app_url = format!("http://{app_addr}");
        let defaults = [
            "diary-gate",
            "--backend-url",
            backend_url.as_str(),
            "--app-url",
            app_url.as_str(),
            "--backend-timeout-ms",
            "2000",
            "--insecure-cookies",
        ];
        let config = GateConfig::try_parse_from(defaults.into_iter().chain(flags.iter().copied()))?;
        config.validate()?;

        let state = Arc::new(GateState::new(config, CancellationToken::new()));
        let server = TestServer::new(build_router(Arc::clone(&state)))?;
        Ok(Self { backend, state, server })
    }
}

pub fn cookie(access: Option<&str>, refresh: Option<&str>) -> HeaderValue {
    let mut pairs = Vec::new();
    if let Some(a) = access {
        pairs.push(format!("access_token={a}"));
    }
    if let Some(r) = refresh {
        pairs.push(format!("refresh_token={r}"));
    }
    HeaderValue::from_str(&pairs.join("; ")).unwrap_or(HeaderValue::from_static(""))
}

/// All `Set-Cookie` values on a response.
pub fn set_cookies(resp: &TestResponse) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_owned))
        .collect()
}

/// Value set for cookie `name`, if any.
pub fn set_cookie_value(resp: &TestResponse, name: &str) -> Option<String> {
    set_cookies(resp).into_iter().find_map(|c| {
        let pair = c.split(';').next()?.to_owned();
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_owned())
    })
}

pub fn location(resp: &TestResponse) -> Option<String> {
    resp.headers().get("location").and_then(|v| v.to_str().ok()).map(str::to_owned)
}
