//! HTTP memory-service client.
//!
//! Speaks a small JSON REST surface:
//! - `GET  /entities/{name}` → 200 (exists) or 404
//! - `POST /entities` with `{name, entity_type, observations}`
//! - `POST /entities/{name}/observations` with `{observation}`

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use transync_shared::{MemoryConfig, Result, TransyncError};

use crate::MemoryStore;

/// User-Agent string for memory service requests.
const USER_AGENT: &str = concat!("Transync/", env!("CARGO_PKG_VERSION"));

/// [`MemoryStore`] backed by a memory service over HTTP.
pub struct HttpMemory {
    http: Client,
    base_url: Url,
}

impl HttpMemory {
    /// Build a client for the given endpoint.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        // A trailing slash keeps Url::join appending instead of replacing
        // the last path segment.
        let normalized = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            TransyncError::config(format!("invalid memory endpoint '{endpoint}': {e}"))
        })?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransyncError::Memory(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    /// Build a client from config; `None` when no endpoint is configured.
    pub fn from_config(config: &MemoryConfig) -> Result<Option<Self>> {
        match &config.endpoint {
            Some(endpoint) => Ok(Some(Self::new(endpoint, config.timeout_secs)?)),
            None => Ok(None),
        }
    }

    fn entity_url(&self, entity: &str) -> Result<Url> {
        self.base_url
            .join(&format!("entities/{entity}"))
            .map_err(|e| TransyncError::Memory(format!("invalid entity name '{entity}': {e}")))
    }
}

#[async_trait]
impl MemoryStore for HttpMemory {
    async fn exists(&self, entity: &str) -> Result<bool> {
        let url = self.entity_url(entity)?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransyncError::Memory(format!("{url}: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(TransyncError::Memory(format!("{url}: HTTP {status}"))),
        }
    }

    async fn create_entity(
        &self,
        entity: &str,
        kind: &str,
        observations: &[String],
    ) -> Result<()> {
        let url = self
            .base_url
            .join("entities")
            .map_err(|e| TransyncError::Memory(e.to_string()))?;

        let body = serde_json::json!({
            "name": entity,
            "entity_type": kind,
            "observations": observations,
        });

        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransyncError::Memory(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransyncError::Memory(format!("{url}: HTTP {status}")));
        }

        debug!(entity, kind, "entity created");
        Ok(())
    }

    async fn add_observation(&self, entity: &str, observation: &str) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("entities/{entity}/observations"))
            .map_err(|e| TransyncError::Memory(e.to_string()))?;

        let body = serde_json::json!({ "observation": observation });

        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| TransyncError::Memory(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransyncError::Memory(format!("{url}: HTTP {status}")));
        }

        debug!(entity, "observation appended");
        Ok(())
    }
}
