// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::GateConfig;
use crate::credential::cookies::CookieSettings;
use crate::credential::SessionRegistry;
use crate::guard::SessionGuard;
use crate::outbound::OutboundClient;
use crate::upstream::client::BackendClient;

/// Shared gate state.
pub struct GateState {
    pub config: GateConfig,
    pub cookies: CookieSettings,
    pub backend: Arc<BackendClient>,
    pub guard: SessionGuard<BackendClient>,
    pub outbound: OutboundClient<BackendClient>,
    pub sessions: SessionRegistry,
    /// Plain client for forwarding page requests to the app renderer.
    pub pages: reqwest::Client,
    pub shutdown: CancellationToken,
}

impl GateState {
    pub fn new(config: GateConfig, shutdown: CancellationToken) -> Self {
        let timeout = config.backend_timeout();
        let backend = Arc::new(BackendClient::new(&config.backend_url, timeout));
        let guard = SessionGuard::new(config.route_table(), Arc::clone(&backend), timeout);
        let outbound = OutboundClient::new(Arc::clone(&backend), timeout);
        let sessions = SessionRegistry::with_rotation_grace(config.rotation_grace());
        let pages = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();
        Self {
            cookies: config.cookie_settings(),
            config,
            backend,
            guard,
            outbound,
            sessions,
            pages,
            shutdown,
        }
    }
}
