// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background eviction of idle and cleared sessions.

use std::sync::Arc;

use crate::state::GateState;

/// Spawn a single background task that periodically sweeps the session registry.
pub fn spawn_session_sweeper(state: Arc<GateState>) -> tokio::task::JoinHandle<()> {
    let interval = state.config.session_sweep_interval();
    let max_idle = state.config.session_max_idle();

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let evicted = state.sessions.sweep(max_idle);
            if evicted > 0 {
                tracing::debug!(evicted, remaining = state.sessions.len(), "session sweep");
            }
        }
    })
}
