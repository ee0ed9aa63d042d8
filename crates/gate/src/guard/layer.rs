// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use super::GuardOutcome;
use crate::credential::cookies;
use crate::routes::RouteClass;
use crate::state::GateState;

/// Axum middleware that runs the session guard ahead of every route.
///
/// Bypass paths skip cookie parsing and session lookup entirely.
pub async fn guard_layer(
    State(state): State<Arc<GateState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if state.guard.routes().classify(&path) == RouteClass::Bypass {
        return next.run(req).await;
    }

    let presented = cookies::read(&jar, &state.cookies);
    let session = state.sessions.resolve(&presented);
    let outcome = state.guard.check(&path, &session).await;
    tracing::debug!(path = %path, outcome = outcome.as_str(), session = %session.id(), "guard");

    match outcome {
        GuardOutcome::Continue => {
            // Another request may have renewed this session already.
            let current = session.credentials();
            if current == presented || current.is_empty() {
                return next.run(req).await;
            }
            cookies::rewrite_request_header(req.headers_mut(), &state.cookies, &current);
            let jar = cookies::write_changed(jar, &state.cookies, &presented, &current);
            (jar, next.run(req).await).into_response()
        }
        GuardOutcome::ContinueWithUpdatedStore(current) => {
            if let Some(ref refresh) = current.refresh {
                if presented.refresh.as_ref() != Some(refresh) {
                    state.sessions.rotate(&session, refresh);
                }
            }
            cookies::rewrite_request_header(req.headers_mut(), &state.cookies, &current);
            let jar = cookies::write_changed(jar, &state.cookies, &presented, &current);
            (jar, next.run(req).await).into_response()
        }
        GuardOutcome::Redirect(target) => Redirect::temporary(&target).into_response(),
        GuardOutcome::RedirectAndClear(target) => {
            state.sessions.forget(&session);
            (cookies::clear(jar, &state.cookies), Redirect::temporary(&target)).into_response()
        }
    }
}
