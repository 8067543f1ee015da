//! oVirt engine REST API client with SSO session management.
//!
//! Communicates with the engine via `https://{host}/ovirt-engine/api/...`.
//! `connect` acquires a bearer token from the engine SSO endpoint and
//! verifies it with a lightweight round-trip before returning; `close`
//! revokes the token best-effort. One client is owned by exactly one
//! logical operation — there is no pooling and no shared global state.

use std::time::Duration;

use reqwest::{Certificate, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::{OvirtError, OvirtErrorKind, OvirtResult};
use crate::types::EngineConfig;

/// A live, verified session with the engine REST API.
pub struct EngineClient {
    client: Client,
    /// Engine base, e.g. "https://engine.lab.local/ovirt-engine"
    base_url: String,
    /// API root, `{base_url}/api`
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SsoToken {
    access_token: String,
}

impl EngineClient {
    /// Acquire and verify a session.
    ///
    /// Fails with a single user-actionable `Connection` (or
    /// `Authentication`) error; raw transport errors never escape.
    pub async fn connect(config: &EngineConfig) -> OvirtResult<Self> {
        let base = Url::parse(config.url.trim_end_matches('/')).map_err(|e| {
            OvirtError::connection(format!("invalid engine URL \"{}\": {e}", config.url))
        })?;
        let base_url = base.as_str().trim_end_matches('/').to_string();

        let mut builder = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs));
        if let Some(ref ca_file) = config.ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| {
                OvirtError::connection(format!("cannot read CA file {ca_file}: {e}"))
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                OvirtError::connection(format!("CA file {ca_file} is not valid PEM: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| OvirtError::connection(format!("failed to build HTTP client: {e}")))?;

        log::info!("Connecting to oVirt engine at {base_url}");
        let token = Self::acquire_token(&client, &base_url, config).await?;

        let engine = Self {
            client,
            api_url: format!("{base_url}/api"),
            base_url,
            token,
        };
        engine.verify().await?;
        Ok(engine)
    }

    async fn acquire_token(
        client: &Client,
        base_url: &str,
        config: &EngineConfig,
    ) -> OvirtResult<String> {
        let url = format!("{base_url}/sso/oauth/token");
        let resp = client
            .post(&url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "password"),
                ("scope", "ovirt-app-api"),
                ("username", &config.username),
                ("password", &config.password),
            ])
            .send()
            .await
            .map_err(|e| {
                OvirtError::connection(format!(
                    "cannot reach the engine SSO endpoint at {url}: {e}. \
                     Check the engine URL and network connectivity, then retry."
                ))
            })?;

        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::BAD_REQUEST {
            return Err(OvirtError::auth(format!(
                "the engine rejected the credentials for user \"{}\"",
                config.username
            )));
        }
        let status = resp.status();
        if !status.is_success() {
            return Err(OvirtError::connection(format!(
                "engine SSO endpoint returned HTTP {status}; check the engine URL and retry"
            )));
        }

        let token: SsoToken = resp.json().await.map_err(|e| {
            OvirtError::connection(format!("unexpected SSO token response: {e}"))
        })?;
        Ok(token.access_token)
    }

    /// Lightweight round-trip against the API root to confirm the
    /// session is usable.
    async fn verify(&self) -> OvirtResult<()> {
        self.get_raw("").await.map_err(|e| {
            OvirtError::connection(format!(
                "cannot access the engine API: {}. Check configuration, \
                 connection and credentials, then retry.",
                e.message
            ))
        })?;
        log::debug!("Engine session verified against {}", self.api_url);
        Ok(())
    }

    /// Revoke the session token and consume the client.
    ///
    /// Best-effort: never fails the caller's result.
    pub async fn close(self) {
        let url = format!("{}/services/sso-logout", self.base_url);
        let result = self
            .client
            .post(&url)
            .form(&[("token", self.token.as_str()), ("scope", "ovirt-app-api")])
            .send()
            .await;
        match result {
            Ok(_) => log::debug!("Engine session released"),
            Err(e) => log::warn!("Ignoring engine logout failure: {e}"),
        }
    }

    // ── HTTP helpers ────────────────────────────────────────────────

    /// GET a JSON response. `path` is relative to the API root.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> OvirtResult<T> {
        let resp = self.get_raw(path).await?;
        Self::parse_response(resp).await
    }

    async fn get_raw(&self, path: &str) -> OvirtResult<Response> {
        let url = format!("{}{path}", self.api_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::check_status(resp).await
    }

    /// GET a JSON response with query params (e.g. a `search` filter).
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> OvirtResult<T> {
        let url = format!("{}{path}", self.api_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Self::parse_response(resp).await
    }

    /// POST a JSON body, return the parsed response.
    pub async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> OvirtResult<T> {
        let url = format!("{}{path}", self.api_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Self::parse_response(resp).await
    }

    /// POST an action with an empty JSON body, discarding the response.
    pub async fn post_empty(&self, path: &str) -> OvirtResult<()> {
        let url = format!("{}{path}", self.api_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    /// DELETE, ignoring the response body.
    pub async fn delete(&self, path: &str) -> OvirtResult<()> {
        let url = format!("{}{path}", self.api_url);
        let resp = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn check_status(resp: Response) -> OvirtResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => Err(OvirtError::auth(format!(
                "session expired or invalid: {body}"
            ))),
            StatusCode::FORBIDDEN => Err(OvirtError::new(
                OvirtErrorKind::AccessDenied,
                format!("access denied: {body}"),
            )),
            StatusCode::NOT_FOUND => Err(OvirtError::not_found(format!(
                "resource not found: {body}"
            ))),
            _ => Err(OvirtError::api(code, format!("API error {code}: {body}"))),
        }
    }

    async fn parse_response<T: DeserializeOwned>(resp: Response) -> OvirtResult<T> {
        let text = resp
            .text()
            .await
            .map_err(|e| OvirtError::parse(format!("failed to read response body: {e}")))?;

        if text.is_empty() {
            // Action endpoints may return an empty body on success.
            return serde_json::from_str("null").map_err(|e| {
                OvirtError::parse(format!("cannot deserialise empty response: {e}"))
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            OvirtError::parse(format!(
                "JSON parse error: {e} — body: {}",
                &text[..text.len().min(500)]
            ))
        })
    }
}
