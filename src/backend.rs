//! Backend clients for the content and view servers.
//!
//! The resolution pipeline talks to two separate services with different
//! parameter vocabularies, so each gets its own capability trait:
//!
//! - [`ContentBackend`] answers GetContent with typed hit metadata.
//! - [`ViewBackend`] renders a URL and streams the result into a sink.
//!
//! [`HttpContentBackend`] and [`HttpViewBackend`] implement them over the
//! ACI HTTP convention (`GET /?action=<Action>&<Param>=<value>...`) with
//! `reqwest`. Neither retries: a failed call is reported once and the
//! caller decides what it means. Timeouts come from the backend's
//! `timeout_secs` setting.

use async_trait::async_trait;
use docview_core::config::ServerEndpoint;
use docview_core::models::GetContentResponse;
use docview_core::request::ActionRequest;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::aci::{parse_get_content, AciError, AciResponseError};
use crate::config::BackendConfig;

/// Maximum number of error body bytes kept for diagnostics.
const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Failure of a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend processed the action and reported an error.
    #[error("backend reported error {0}")]
    Aci(AciError),
    /// The backend answered with a status outside the 2xx range.
    #[error("backend returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed backend response: {0}")]
    Malformed(String),
    /// Writing the streamed response to the caller's sink failed.
    #[error("failed to write response to output: {0}")]
    Sink(#[source] std::io::Error),
}

impl From<AciResponseError> for BackendError {
    fn from(e: AciResponseError) -> Self {
        match e {
            AciResponseError::Error(aci) => BackendError::Aci(aci),
            AciResponseError::Malformed(msg) => BackendError::Malformed(msg),
        }
    }
}

/// Search backend capable of a GetContent visibility check.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn get_content(&self, request: &ActionRequest) -> Result<GetContentResponse, BackendError>;
}

/// Receives the media type of a view before any of its bytes are written.
pub type ContentTypeHook<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Rendering backend that streams a document view.
#[async_trait]
pub trait ViewBackend: Send + Sync {
    /// Execute `request` and copy the response body into `sink` as it
    /// arrives. Returns the number of bytes written.
    ///
    /// If the backend reports a media type, `on_content_type` is called with
    /// it once, before the first write.
    async fn view(
        &self,
        request: &ActionRequest,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        on_content_type: ContentTypeHook<'_>,
    ) -> Result<u64, BackendError>;
}

/// Shared ACI-over-HTTP plumbing.
#[derive(Debug, Clone)]
struct AciHttpClient {
    base: Url,
    client: reqwest::Client,
}

impl AciHttpClient {
    fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        Ok(Self {
            base: endpoint_url(&config.endpoint)?,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }

    async fn send(&self, request: &ActionRequest) -> Result<reqwest::Response, BackendError> {
        tracing::debug!(base = %self.base, action = request.action(), "sending ACI request");

        let response = self
            .client
            .get(self.base.clone())
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(body, MAX_ERROR_BODY_BYTES),
            });
        }

        Ok(response)
    }
}

/// Base URL (`<scheme>://<host>:<port>/`) of a backend endpoint.
pub fn endpoint_url(endpoint: &ServerEndpoint) -> anyhow::Result<Url> {
    let host = if endpoint.host.contains(':') && !endpoint.host.starts_with('[') {
        format!("[{}]", endpoint.host)
    } else {
        endpoint.host.clone()
    };
    let raw = format!("{}://{}:{}/", endpoint.protocol.scheme(), host, endpoint.port);
    Url::parse(&raw).map_err(|e| anyhow::anyhow!("invalid backend endpoint {}: {}", raw, e))
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

/// [`ContentBackend`] speaking ACI over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContentBackend {
    http: AciHttpClient,
}

impl HttpContentBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: AciHttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl ContentBackend for HttpContentBackend {
    async fn get_content(&self, request: &ActionRequest) -> Result<GetContentResponse, BackendError> {
        let response = self.http.send(request).await?;
        let body = response.bytes().await?;
        Ok(parse_get_content(&body)?)
    }
}

/// [`ViewBackend`] speaking ACI over HTTP.
#[derive(Debug, Clone)]
pub struct HttpViewBackend {
    http: AciHttpClient,
}

impl HttpViewBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: AciHttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl ViewBackend for HttpViewBackend {
    async fn view(
        &self,
        request: &ActionRequest,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        on_content_type: ContentTypeHook<'_>,
    ) -> Result<u64, BackendError> {
        let mut response = self.http.send(request).await?;
        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            on_content_type(content_type);
        }

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await.map_err(BackendError::Sink)?;
            written += chunk.len() as u64;
        }
        sink.flush().await.map_err(BackendError::Sink)?;

        Ok(written)
    }
}
