// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diary gate: session-continuity layer between browsers and the diary backend.

pub mod config;
pub mod credential;
pub mod error;
pub mod forms;
pub mod guard;
pub mod outbound;
pub mod routes;
pub mod state;
pub mod transport;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::GateConfig;
use crate::credential::sweeper::spawn_session_sweeper;
use crate::state::GateState;
use crate::transport::build_router;

/// Run the gate server until ctrl-c.
pub async fn run(config: GateConfig) -> anyhow::Result<()> {
    config.validate()?;
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state = Arc::new(GateState::new(config, shutdown.clone()));
    spawn_session_sweeper(Arc::clone(&state));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
            shutdown.cancel();
        });
    }

    tracing::info!(backend = %state.backend.base_url(), "diary-gate listening on {addr}");
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
