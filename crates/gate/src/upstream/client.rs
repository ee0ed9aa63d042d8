// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the diary backend.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{BackendError, ResourceRequest, ResourceResponse, ResourceTransport, TokenAuthority};
use crate::credential::{RenewedAccess, Token};

pub const LOGIN_PATH: &str = "user_authentication/login/";
pub const REGISTER_PATH: &str = "user_authentication/register/";
pub const VERIFY_PATH: &str = "user_authentication/verify_token/";
pub const REFRESH_PATH: &str = "token/refresh/";

/// Both credentials issued by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// HTTP client wrapper for the backend at one base URL.
pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        let base_url = format!("{}/", base_url.trim_end_matches('/'));
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange email and password for a credential pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self.client.post(self.url(LOGIN_PATH)).json(&body).send().await?;
        let resp = ensure_success(resp).await?;
        resp.json::<TokenPair>().await.map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Create an account. Returns the backend's payload unchanged.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<serde_json::Value, BackendError> {
        let body =
            serde_json::json!({ "email": email, "username": username, "password": password });
        let resp = self.client.post(self.url(REGISTER_PATH)).json(&body).send().await?;
        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl TokenAuthority for BackendClient {
    async fn verify(&self, access: &Token) -> Result<(), BackendError> {
        let resp =
            self.client.get(self.url(VERIFY_PATH)).bearer_auth(access.as_str()).send().await?;
        ensure_success(resp).await.map(drop)
    }

    async fn refresh(&self, refresh: &Token) -> Result<RenewedAccess, BackendError> {
        let body = serde_json::json!({ "refresh": refresh.as_str() });
        let resp = self.client.post(self.url(REFRESH_PATH)).json(&body).send().await?;
        let resp = ensure_success(resp).await?;
        let parsed: RefreshResponse =
            resp.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
        if parsed.access.is_empty() {
            return Err(BackendError::Decode("empty access credential".to_owned()));
        }
        Ok(RenewedAccess {
            access: Token::new(parsed.access),
            refresh: parsed.refresh.filter(|r| !r.is_empty()).map(Token::new),
        })
    }
}

impl ResourceTransport for BackendClient {
    async fn send(
        &self,
        request: &ResourceRequest,
        bearer: Option<&Token>,
    ) -> Result<ResourceResponse, BackendError> {
        if request.escapes_base() {
            return Err(BackendError::Decode(format!("path escapes base: {}", request.path)));
        }
        let mut url =
            Url::parse(&self.url(&request.path)).map_err(|e| BackendError::Decode(e.to_string()))?;
        url.set_query(request.query.as_deref());

        let mut req = self.client.request(request.method.clone(), url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token.as_str());
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let content_type =
            resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_owned);
        let body = resp.bytes().await?;
        Ok(ResourceResponse { status, content_type, body })
    }
}

/// Return the response on 2xx, otherwise an error carrying status and body.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status { status, body })
}
