// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the gate.

pub mod http;
pub mod proxy;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{any, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::guard::guard_layer;
use crate::state::GateState;

/// Build the axum `Router` with all gate routes.
pub fn build_router(state: Arc<GateState>) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(http::health))
        // Auth
        .route("/api/auth/login", post(http::login))
        .route("/api/auth/register", post(http::register))
        .route("/api/auth/logout", post(http::logout))
        .route("/api/update_token", post(http::update_token))
        // Protected backend resources
        .route("/api/backend/{*path}", any(proxy::backend))
        // Pages
        .fallback(proxy::forward_page)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(Arc::clone(&state), guard_layer)),
        )
        .with_state(state)
}
