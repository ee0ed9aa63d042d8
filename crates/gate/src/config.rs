// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::credential::cookies::CookieSettings;
use crate::routes::RouteTable;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the diary gate.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "diary-gate", version, about = "Session-continuity gate for the diary app")]
pub struct GateConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "DIARY_GATE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "DIARY_GATE_PORT")]
    pub port: u16,

    /// Base URL of the backend API (credential authority and resources).
    #[arg(long, default_value = "http://localhost:8000/api/", env = "DIARY_GATE_BACKEND_URL")]
    pub backend_url: String,

    /// Upstream page renderer. Guarded page requests are forwarded here.
    #[arg(long, env = "DIARY_GATE_APP_URL")]
    pub app_url: Option<String>,

    /// Timeout for every backend call in milliseconds.
    #[arg(long, default_value_t = 5000, env = "DIARY_GATE_BACKEND_TIMEOUT_MS")]
    pub backend_timeout_ms: u64,

    /// Access credential cookie lifetime in seconds.
    #[arg(long, default_value_t = 7 * 24 * 3600, env = "DIARY_GATE_ACCESS_MAX_AGE_SECS")]
    pub access_max_age_secs: u64,

    /// Refresh credential cookie lifetime in seconds.
    #[arg(long, default_value_t = 30 * 24 * 3600, env = "DIARY_GATE_REFRESH_MAX_AGE_SECS")]
    pub refresh_max_age_secs: u64,

    #[arg(long, default_value = "access_token", env = "DIARY_GATE_ACCESS_COOKIE")]
    pub access_cookie: String,

    #[arg(long, default_value = "refresh_token", env = "DIARY_GATE_REFRESH_COOKIE")]
    pub refresh_cookie: String,

    #[arg(long, default_value = "/routes/login", env = "DIARY_GATE_LOGIN_PATH")]
    pub login_path: String,

    #[arg(long, default_value = "/routes/register", env = "DIARY_GATE_REGISTER_PATH")]
    pub register_path: String,

    /// Where signed-in callers land when they open login or register.
    #[arg(long, default_value = "/routes/dashboard", env = "DIARY_GATE_LANDING_PATH")]
    pub landing_path: String,

    /// Omit the `Secure` cookie attribute (plain-HTTP local development).
    #[arg(long, env = "DIARY_GATE_INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Idle session sweep interval in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "DIARY_GATE_SESSION_SWEEP_MS")]
    pub session_sweep_ms: u64,

    /// How long a rotated-out refresh credential still resolves to its
    /// session, in milliseconds. Zero disables the grace period.
    #[arg(long, default_value_t = 10_000, env = "DIARY_GATE_ROTATION_GRACE_MS")]
    pub rotation_grace_ms: u64,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "DIARY_GATE_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "DIARY_GATE_LOG_LEVEL")]
    pub log_level: String,
}

impl GateConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend_timeout_ms == 0 {
            anyhow::bail!("--backend-timeout-ms must be greater than zero");
        }
        if self.access_max_age_secs == 0 || self.refresh_max_age_secs == 0 {
            anyhow::bail!("cookie max-age must be greater than zero");
        }
        if self.session_sweep_ms == 0 {
            anyhow::bail!("--session-sweep-ms must be greater than zero");
        }
        for (flag, path) in [
            ("--login-path", &self.login_path),
            ("--register-path", &self.register_path),
            ("--landing-path", &self.landing_path),
        ] {
            if !path.starts_with('/') {
                anyhow::bail!("{flag} must start with '/': {path}");
            }
        }
        if self.access_cookie.is_empty() || self.access_cookie == self.refresh_cookie {
            anyhow::bail!("cookie names must be non-empty and distinct");
        }
        reqwest::Url::parse(&self.backend_url)
            .map_err(|e| anyhow::anyhow!("invalid --backend-url {}: {e}", self.backend_url))?;
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.session_sweep_ms)
    }

    pub fn rotation_grace(&self) -> Duration {
        Duration::from_millis(self.rotation_grace_ms)
    }

    /// Sessions idle longer than the refresh cookie lifetime can never be used again.
    pub fn session_max_idle(&self) -> Duration {
        Duration::from_secs(self.refresh_max_age_secs)
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            access_name: self.access_cookie.clone(),
            refresh_name: self.refresh_cookie.clone(),
            access_max_age: time::Duration::seconds(saturating_i64(self.access_max_age_secs)),
            refresh_max_age: time::Duration::seconds(saturating_i64(self.refresh_max_age_secs)),
            secure: !self.insecure_cookies,
        }
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(&self.login_path, &self.register_path, &self.landing_path)
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
