//! Document view orchestration.
//!
//! [`ViewService`] turns a [`ViewRequest`] into bytes on a sink:
//!
//! ```text
//! GetContent ──▶ first hit ──▶ select_view_url ──┬─ Some(url) ──▶ View ──▶ sink
//!     │                                           └─ None ──▶ RawDocument ──▶ formatter ──▶ sink
//!     └─ no hits / ACI error ──▶ NotFound
//! ```
//!
//! Resolution ([`ViewService::resolve`]) and streaming
//! ([`ViewService::stream`]) are separate steps so callers can act on
//! resolution failures before committing to a response. Nothing is written
//! to the sink until a strategy has been fully resolved.
//!
//! The view configuration is read from the [`ConfigProvider`] once per
//! request. There is no caching or de-duplication across requests and no
//! retrying of failed backend calls.

use docview_core::fields::CONTENT_FIELD;
use docview_core::models::{Hit, RawDocument, ViewRequest};
use docview_core::request::{get_content_request, view_request, ActionRequest};
use docview_core::strategy::select_view_url;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::backend::{BackendError, ContentBackend, ContentTypeHook, ViewBackend};
use crate::config::ConfigProvider;
use crate::error::ViewError;
use crate::raw::RawContentFormatter;

/// Returned by [`ViewService::view_static_content_promotion`].
pub const STATIC_PROMOTIONS_UNSUPPORTED: &str =
    "Viewing static content promotions on premise is not yet possible";

/// How a document will be rendered, decided before any output is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedView {
    /// Render through the view server.
    ViewServer {
        reference: String,
        request: ActionRequest,
    },
    /// Format the indexed text locally.
    RawContent(RawDocument),
}

impl ResolvedView {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            ResolvedView::ViewServer { .. } => "view_server",
            ResolvedView::RawContent(_) => "raw_content",
        }
    }
}

/// Resolves document references and streams their rendered views.
pub struct ViewService {
    content: Arc<dyn ContentBackend>,
    viewer: Arc<dyn ViewBackend>,
    config: Arc<dyn ConfigProvider>,
    formatter: Arc<dyn RawContentFormatter>,
}

impl ViewService {
    pub fn new(
        content: Arc<dyn ContentBackend>,
        viewer: Arc<dyn ViewBackend>,
        config: Arc<dyn ConfigProvider>,
        formatter: Arc<dyn RawContentFormatter>,
    ) -> Self {
        Self {
            content,
            viewer,
            config,
            formatter,
        }
    }

    /// Render `request`'s document into `sink`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// - [`ViewError::NotFound`] if the document does not exist or is not
    ///   visible; nothing is written.
    /// - [`ViewError::Render`] if the view server fails.
    /// - [`ViewError::UriConstruction`] if a connector URI cannot be built.
    /// - [`ViewError::Backend`] if the content backend is unreachable.
    /// - [`ViewError::Io`] if writing to `sink` fails.
    pub async fn view_document(
        &self,
        request: &ViewRequest,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ViewError> {
        let resolved = self.resolve(request).await?;
        self.stream(resolved, sink).await
    }

    /// Static content promotions cannot be viewed on this deployment.
    pub async fn view_static_content_promotion(
        &self,
        reference: &str,
        _sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ViewError> {
        tracing::debug!(reference, "static content promotion view requested");
        Err(ViewError::NotImplemented(STATIC_PROMOTIONS_UNSUPPORTED))
    }

    /// Check the document exists and decide how to render it.
    pub async fn resolve(&self, request: &ViewRequest) -> Result<ResolvedView, ViewError> {
        let config = self.config.current();
        let hit = self
            .load_document(&request.reference, &request.database, &config.reference_field)
            .await?;

        let resolved = match select_view_url(&hit, &config)? {
            Some(url) => {
                tracing::info!(
                    reference = %request.reference,
                    mode = ?config.viewing_mode,
                    %url,
                    "rendering through view server"
                );
                ResolvedView::ViewServer {
                    reference: request.reference.clone(),
                    request: view_request(&url, &request.options),
                }
            }
            None => {
                tracing::info!(
                    reference = %request.reference,
                    mode = ?config.viewing_mode,
                    "no view url, falling back to raw content"
                );
                ResolvedView::RawContent(raw_document(hit))
            }
        };

        Ok(resolved)
    }

    /// Write a resolved view to `sink`.
    pub async fn stream(
        &self,
        resolved: ResolvedView,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ViewError> {
        self.stream_with_content_type(resolved, sink, &mut |_: &str| {})
            .await
    }

    /// Like [`stream`](Self::stream), reporting the media type of the output
    /// to `on_content_type` before the first byte is written.
    ///
    /// The view server's type is passed through when it sends one; raw
    /// content uses the formatter's type.
    pub async fn stream_with_content_type(
        &self,
        resolved: ResolvedView,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        on_content_type: ContentTypeHook<'_>,
    ) -> Result<u64, ViewError> {
        match resolved {
            ResolvedView::ViewServer { reference, request } => {
                match self.viewer.view(&request, sink, on_content_type).await {
                    Ok(written) => Ok(written),
                    Err(BackendError::Sink(e)) => Err(ViewError::Io(e)),
                    Err(cause) => {
                        tracing::warn!(%reference, error = %cause, "view server failed");
                        Err(ViewError::Render { reference, cause })
                    }
                }
            }
            ResolvedView::RawContent(document) => {
                // Dropped on every path out of this block.
                let mut formatted = self.formatter.format(&document)?;
                on_content_type(self.formatter.content_type());
                let written = tokio::io::copy(&mut formatted, &mut *sink).await?;
                sink.flush().await?;
                Ok(written)
            }
        }
    }

    async fn load_document(
        &self,
        reference: &str,
        database: &str,
        reference_field: &str,
    ) -> Result<Hit, ViewError> {
        let request = get_content_request(database, reference, reference_field);

        let response = match self.content.get_content(&request).await {
            Ok(response) => response,
            Err(cause @ BackendError::Aci(_)) => {
                tracing::debug!(reference, error = %cause, "GetContent reported an error");
                return Err(ViewError::NotFound {
                    reference: reference.to_string(),
                    cause: Some(cause),
                });
            }
            Err(cause) => return Err(ViewError::Backend(cause)),
        };

        response
            .hits
            .into_iter()
            .next()
            .ok_or_else(|| ViewError::not_found(reference))
    }
}

fn raw_document(hit: Hit) -> RawDocument {
    let content = hit.field(CONTENT_FIELD).unwrap_or_default().to_string();
    RawDocument {
        reference: hit.reference,
        title: hit.title,
        content,
    }
}
