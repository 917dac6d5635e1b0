//! HTTP session against a management endpoint.
//!
//! Connecting fetches the live state document from `{url}/management/state`
//! and caches it for the duration of the session; operations read the cached
//! document or post new documents through the same client.

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use drydock_core::error::SessionError;
use drydock_core::session::{Credential, Resource, Session};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug)]
pub struct HttpSession {
    resource: Resource,
    credential: Option<Credential>,
    http: reqwest::Client,
    base_url: String,
    live_state: Option<Value>,
}

impl HttpSession {
    pub fn new(resource: Resource, credential: Option<Credential>) -> anyhow::Result<Self> {
        let base_url = resource
            .properties
            .get("url")
            .ok_or_else(|| {
                anyhow::anyhow!("resource '{}' has no 'url' property", resource.id)
            })?
            .trim_end_matches('/')
            .to_string();
        let timeout_ms = resource
            .properties
            .get("timeout_ms")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            resource,
            credential,
            http,
            base_url,
            live_state: None,
        })
    }

    /// Live state document fetched at connect time.
    pub fn live_state(&self) -> Option<&Value> {
        self.live_state.as_ref()
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            Some(credential) => {
                req.basic_auth(&credential.user, Some(&credential.password))
            }
            None => req,
        }
    }

    /// POST a JSON document to a path under the management endpoint.
    pub async fn post_document(&self, path: &str, document: &Value) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self
            .auth(self.http.post(&url).json(document))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("POST {url} returned {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl Session for HttpSession {
    fn resource_id(&self) -> &str {
        &self.resource.id
    }

    async fn connect(&mut self) -> Result<(), SessionError> {
        let url = format!("{}/management/state", self.base_url);
        let resp = self
            .auth(self.http.get(&url))
            .send()
            .await
            .map_err(|err| SessionError::ConnectFailed {
                resource: self.resource.id.clone(),
                reason: err.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::ConnectFailed {
                resource: self.resource.id.clone(),
                reason: format!("GET {url} returned {status}"),
            });
        }
        let state: Value =
            resp.json()
                .await
                .map_err(|err| SessionError::ConnectFailed {
                    resource: self.resource.id.clone(),
                    reason: format!("cannot decode live state: {err}"),
                })?;
        tracing::debug!(resource = %self.resource.id, "live state fetched");
        self.live_state = Some(state);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        // Stateless transport, only the cached state is dropped.
        self.live_state = None;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
