//! View strategy selection.
//!
//! Decides, from the view configuration and a hit's metadata, which URL
//! the view server should render:
//!
//! | Mode | URL |
//! |------|-----|
//! | `connector` | `<scheme>://<host>:<port>/?action=View&identifier=..&autn_group=..` |
//! | `reference_field` | value of the configured reference field, verbatim |
//!
//! `Ok(None)` means no URL is available and the caller falls back to raw
//! content. Missing identity fields degrade to that fallback; a connector
//! URI that cannot be built from present values is an error.

use std::net::Ipv6Addr;
use thiserror::Error;
use url::{Position, Url};

use crate::config::{ServerEndpoint, ViewConfig, ViewingMode};
use crate::fields::{AUTN_GROUP, AUTN_IDENTIFIER};
use crate::models::Hit;
use crate::request::ACTION_VIEW;

/// Query parameter names of a connector `View` action.
pub const PARAM_ACTION: &str = "action";
pub const PARAM_IDENTIFIER: &str = "identifier";
pub const PARAM_AUTN_GROUP: &str = "autn_group";

/// The connector view URI could not be assembled.
///
/// Inputs come from validated configuration and fields that are known to be
/// present, so this indicates a configuration defect rather than bad input.
#[derive(Debug, Error)]
pub enum UriConstructionError {
    #[error("Error constructing Connector URI: connector is not configured")]
    MissingConnector,
    #[error("Error constructing Connector URI: invalid host {0:?}")]
    InvalidHost(String),
    #[error("Error constructing Connector URI: {0}")]
    Parse(#[from] url::ParseError),
}

/// Select the URL to send to the view server for `hit`, if any.
pub fn select_view_url(
    hit: &Hit,
    config: &ViewConfig,
) -> Result<Option<String>, UriConstructionError> {
    match config.viewing_mode {
        ViewingMode::Connector => {
            let (Some(identifier), Some(group)) = (hit.field(AUTN_IDENTIFIER), hit.field(AUTN_GROUP))
            else {
                return Ok(None);
            };
            let connector = config
                .connector
                .as_ref()
                .ok_or(UriConstructionError::MissingConnector)?;
            build_connector_uri(connector, identifier, group).map(Some)
        }
        ViewingMode::ReferenceField => Ok(hit.field(&config.reference_field).map(str::to_string)),
    }
}

/// Build a connector `View` URI for the given identity.
///
/// The path is always `/`: connectors take everything in the query string.
/// The configured port is always written out, including the scheme's
/// default. IPv6 hosts may be given bare (`::1`) or bracketed (`[::1]`).
///
/// ```rust
/// use docview_core::config::{Protocol, ServerEndpoint};
/// use docview_core::strategy::build_connector_uri;
///
/// let endpoint = ServerEndpoint::new(Protocol::Http, "proxy", 9000);
/// let uri = build_connector_uri(&endpoint, "id1", "g1").unwrap();
/// assert_eq!(uri, "http://proxy:9000/?action=View&identifier=id1&autn_group=g1");
/// ```
pub fn build_connector_uri(
    connector: &ServerEndpoint,
    identifier: &str,
    group: &str,
) -> Result<String, UriConstructionError> {
    let host = authority_host(&connector.host)?;

    let scheme = connector.protocol.scheme();
    let mut url = Url::parse(&format!("{}://{}:{}/", scheme, host, connector.port))?;
    let Some(host) = url.host_str().map(str::to_string) else {
        return Err(UriConstructionError::InvalidHost(connector.host.clone()));
    };

    url.query_pairs_mut()
        .append_pair(PARAM_ACTION, ACTION_VIEW)
        .append_pair(PARAM_IDENTIFIER, identifier)
        .append_pair(PARAM_AUTN_GROUP, group);

    // `Url` drops a port equal to the scheme default, so the authority is
    // written back explicitly.
    Ok(format!(
        "{}://{}:{}{}",
        scheme,
        host,
        connector.port,
        &url[Position::BeforePath..]
    ))
}

/// Validate a configured host and return it in URI authority form.
///
/// `Url::parse` would silently reinterpret `/?#@\` as path, query or
/// userinfo, and a bare `:` as a port separator, so those are only allowed
/// as part of an IPv6 literal.
fn authority_host(host: &str) -> Result<String, UriConstructionError> {
    let invalid = || UriConstructionError::InvalidHost(host.to_string());

    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner
            .parse::<Ipv6Addr>()
            .map(|_| host.to_string())
            .map_err(|_| invalid());
    }
    if host.contains(':') {
        return host
            .parse::<Ipv6Addr>()
            .map(|_| format!("[{}]", host))
            .map_err(|_| invalid());
    }

    let bad = host.is_empty()
        || host
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "/?#@[]\\".contains(c));
    if bad {
        return Err(invalid());
    }
    Ok(host.to_string())
}
