//! Typed per-service clients with user-agent stamping.
//!
//! One [`Client`] per `(project, region, kind)`, cached process-wide.
//! Clients own the HTTP handle and bearer-token source; the service
//! wrappers in [`crate::service`] build requests on top of them.

use crate::context::{ExecutionContext, MetadataSource};
use crate::error::{Error, RemoteError, RemoteStatus, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// The service surfaces a client can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// Generative endpoint (images, video LROs)
    Generative,
    /// Regional prediction endpoint (music, try-on)
    Prediction,
    /// Text-to-speech endpoint
    TextToSpeech,
    /// Object-store endpoint
    ObjectStore,
}

/// Source of bearer tokens for outgoing requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently-valid access token.
    async fn token(&self) -> Result<String>;
}

/// Fetches access tokens from the host-metadata service.
pub struct MetadataTokenProvider {
    metadata: Arc<dyn MetadataSource>,
}

impl MetadataTokenProvider {
    /// Create a provider over the given metadata source.
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn token(&self) -> Result<String> {
        let body = self
            .metadata
            .get("instance/service-accounts/default/token")
            .await?;
        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| Error::Configuration(format!("malformed token response: {e}")))?;
        parsed["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Configuration("token response missing access_token".into()))
    }
}

/// Fixed-token provider for tests and pre-fetched credentials.
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A service client bound to an execution context.
pub struct Client {
    /// Which surface this client addresses
    pub kind: ClientKind,
    /// The context the client was built for
    pub context: ExecutionContext,
    base_url: String,
    http: reqwest::Client,
    token: Arc<dyn TokenProvider>,
}

impl Client {
    /// Base URL of the bound endpoint.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parent path `projects/<p>/locations/<r>` for model resources.
    pub fn location_path(&self) -> String {
        format!(
            "projects/{}/locations/{}",
            self.context.project_id, self.context.region
        )
    }

    /// POST a JSON body, returning the parsed JSON response.
    ///
    /// HTTP failures are normalized through [`RemoteStatus::from_http`]
    /// so every surface shares one status vocabulary.
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
    ) -> std::result::Result<Value, RemoteError> {
        let token = self.token.token().await.map_err(|e| {
            RemoteError::new(RemoteStatus::Unauthenticated, e.to_string())
        })?;
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.context.user_agent)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::new(RemoteStatus::Unavailable, e.to_string()))?;
        Self::read_json(response).await
    }

    /// GET a JSON resource.
    pub async fn get_json(&self, path: &str) -> std::result::Result<Value, RemoteError> {
        let token = self.token.token().await.map_err(|e| {
            RemoteError::new(RemoteStatus::Unauthenticated, e.to_string())
        })?;
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.context.user_agent)
            .send()
            .await
            .map_err(|e| RemoteError::new(RemoteStatus::Unavailable, e.to_string()))?;
        Self::read_json(response).await
    }

    /// GET a binary resource.
    pub async fn get_bytes(&self, path: &str) -> std::result::Result<Vec<u8>, RemoteError> {
        let token = self.token.token().await.map_err(|e| {
            RemoteError::new(RemoteStatus::Unauthenticated, e.to_string())
        })?;
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.context.user_agent)
            .send()
            .await
            .map_err(|e| RemoteError::new(RemoteStatus::Unavailable, e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::new(RemoteStatus::from_http(status), message));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::new(RemoteStatus::Unavailable, e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// POST a binary payload with an explicit content type.
    pub async fn post_bytes(
        &self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> std::result::Result<Value, RemoteError> {
        let token = self.token.token().await.map_err(|e| {
            RemoteError::new(RemoteStatus::Unauthenticated, e.to_string())
        })?;
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &self.context.user_agent)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| RemoteError::new(RemoteStatus::Unavailable, e.to_string()))?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> std::result::Result<Value, RemoteError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::new(RemoteStatus::Unavailable, e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(RemoteError::new(RemoteStatus::from_http(status), body));
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::new(RemoteStatus::Unknown, format!("bad JSON body: {e}")))
    }
}

/// Process-wide factory caching clients by `(project, region, kind)`.
pub struct ClientFactory {
    token: Arc<dyn TokenProvider>,
    cache: DashMap<(String, String, ClientKind), Arc<Client>>,
}

impl ClientFactory {
    /// Create a factory over the given token provider.
    pub fn new(token: Arc<dyn TokenProvider>) -> Self {
        Self {
            token,
            cache: DashMap::new(),
        }
    }

    /// Get or build the client for a surface and context.
    pub fn get(&self, kind: ClientKind, context: &ExecutionContext) -> Result<Arc<Client>> {
        let key = (
            context.project_id.clone(),
            context.region.clone(),
            kind,
        );
        if let Some(client) = self.cache.get(&key) {
            return Ok(client.clone());
        }

        let base_url = match kind {
            // Generative and prediction surfaces bind a regional host.
            ClientKind::Generative | ClientKind::Prediction => {
                format!("https://{}-aiplatform.googleapis.com/v1", context.region)
            }
            ClientKind::TextToSpeech => "https://texttospeech.googleapis.com/v1".to_string(),
            ClientKind::ObjectStore => "https://storage.googleapis.com".to_string(),
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        let client = Arc::new(Client {
            kind,
            context: context.clone(),
            base_url,
            http,
            token: self.token.clone(),
        });
        tracing::debug!(?kind, region = %context.region, "initialized service client");
        self.cache.insert(key, client.clone());
        Ok(client)
    }
}
