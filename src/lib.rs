//! # docview
//!
//! Resolves an opaque document reference held by an ACI search backend into
//! renderable content and streams it to a caller.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   GetContent   ┌──────────────┐
//! │  Caller  │──────────────▶│   Content    │
//! │ CLI/HTTP │                │   backend    │
//! └────┬─────┘                └──────┬───────┘
//!      │                             │ first hit
//!      ▼                             ▼
//! ┌──────────────┐  select  ┌────────────────────┐
//! │ ViewService  │─────────▶│ connector URI /     │
//! │              │          │ reference field /   │
//! └────┬─────────┘          │ raw content         │
//!      │                    └────────────────────┘
//!      ├──▶ View server ──▶ sink
//!      └──▶ HTML formatter ──▶ sink
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and the per-request view config provider |
//! | [`aci`] | ACI XML response parsing |
//! | [`backend`] | Content and view backend traits and HTTP clients |
//! | [`raw`] | Raw content formatting |
//! | [`view`] | Resolution and streaming orchestration |
//! | [`error`] | View error taxonomy |
//! | [`server`] | HTTP server |
//!
//! Pure resolution logic (field extraction, strategy selection, request
//! building) lives in the `docview-core` crate.

pub mod aci;
pub mod backend;
pub mod config;
pub mod error;
pub mod raw;
pub mod server;
pub mod view;

use std::sync::Arc;

use crate::backend::{HttpContentBackend, HttpViewBackend};
use crate::config::{Config, ConfigProvider};
use crate::raw::HtmlRawContentFormatter;
use crate::view::ViewService;

/// Wire a [`ViewService`] to the HTTP backends named in `config`.
pub fn build_service(
    config: &Config,
    provider: Arc<dyn ConfigProvider>,
) -> anyhow::Result<ViewService> {
    Ok(ViewService::new(
        Arc::new(HttpContentBackend::new(&config.content)?),
        Arc::new(HttpViewBackend::new(&config.view_server)?),
        provider,
        Arc::new(HtmlRawContentFormatter),
    ))
}
