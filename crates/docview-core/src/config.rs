//! View configuration types.
//!
//! These are the only configuration values the resolution logic reads.
//! Loading and validation live in the application crate.

use serde::Deserialize;

/// How a renderable URL is derived from a document's metadata.
///
/// When the chosen mode yields no URL, the raw content fallback applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewingMode {
    /// Build a connector `View` URL from `AUTN_IDENTIFIER` and `AUTN_GROUP`.
    Connector,
    /// Pass the value of the configured reference field to the view server.
    #[serde(alias = "field")]
    ReferenceField,
}

/// Transport protocol of a backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[serde(alias = "HTTP")]
    Http,
    #[serde(alias = "HTTPS")]
    Https,
}

impl Protocol {
    /// URI scheme for this protocol, always lower-case.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Protocol, host and port of a backend service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerEndpoint {
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

fn default_protocol() -> Protocol {
    Protocol::Http
}

impl ServerEndpoint {
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }
}

/// Snapshot of the view settings used for one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewConfig {
    pub viewing_mode: ViewingMode,
    /// Field requested from the content backend and, in reference-field
    /// mode, the field whose value is sent to the view server.
    #[serde(default = "default_reference_field")]
    pub reference_field: String,
    /// Connector service used in connector mode.
    #[serde(default)]
    pub connector: Option<ServerEndpoint>,
}

fn default_reference_field() -> String {
    "url".to_string()
}

impl ViewConfig {
    pub fn connector(endpoint: ServerEndpoint, reference_field: impl Into<String>) -> Self {
        Self {
            viewing_mode: ViewingMode::Connector,
            reference_field: reference_field.into(),
            connector: Some(endpoint),
        }
    }

    pub fn reference_field(reference_field: impl Into<String>) -> Self {
        Self {
            viewing_mode: ViewingMode::ReferenceField,
            reference_field: reference_field.into(),
            connector: None,
        }
    }
}
