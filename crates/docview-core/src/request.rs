//! ACI action requests.
//!
//! Both backends speak the ACI convention: an `action` name plus a flat
//! list of parameters sent as a query string. [`ActionRequest`] keeps the
//! parameters in insertion order; the builders below produce the two
//! requests the resolution pipeline issues.
//!
//! # GetContent
//!
//! ```text
//! action=GetContent&Reference=<ref>&DatabaseMatch=<db>&Print=Fields
//!     &PrintFields=<reference field>,AUTN_IDENTIFIER,AUTN_GROUP,DRECONTENT
//! ```
//!
//! # View
//!
//! ```text
//! action=View&Reference=<url>&NoACI=true&EmbedImages=true&StripScript=true
//!     &OriginalBaseURL=true[&Links=..&StartTag=..&EndTag=..&Boolean=true][&OutputType=..]
//! ```

use crate::fields::{AUTN_GROUP, AUTN_IDENTIFIER, CONTENT_FIELD};
use crate::models::ViewOptions;

/// Action name of the visibility check issued against the content backend.
pub const ACTION_GET_CONTENT: &str = "GetContent";
/// Action name understood by both the view server and connectors.
pub const ACTION_VIEW: &str = "View";

/// Highlight markup used when the caller does not supply its own tags.
pub const DEFAULT_HIGHLIGHT_START_TAG: &str = "<span class=\"docview-highlight\">";
pub const DEFAULT_HIGHLIGHT_END_TAG: &str = "</span>";

/// A named backend action with ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    action: String,
    params: Vec<(String, String)>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter. Later values never replace earlier ones.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First value of a parameter, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All query pairs, `action` first.
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 1);
        pairs.push(("action", self.action.as_str()));
        pairs.extend(self.params.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        pairs
    }
}

/// Build the GetContent request used to check that a document exists and is
/// visible, printing every field the later stages read.
pub fn get_content_request(database: &str, reference: &str, reference_field: &str) -> ActionRequest {
    let mut request = ActionRequest::new(ACTION_GET_CONTENT);
    request.add("Reference", reference);
    if !database.is_empty() {
        request.add("DatabaseMatch", database);
    }
    request.add("Print", "Fields");
    request.add("PrintFields", print_fields(reference_field).join(","));
    request
}

fn print_fields(reference_field: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = Vec::with_capacity(4);
    for name in [reference_field, AUTN_IDENTIFIER, AUTN_GROUP, CONTENT_FIELD] {
        if name.is_empty() || fields.iter().any(|f| f.eq_ignore_ascii_case(name)) {
            continue;
        }
        fields.push(name);
    }
    fields
}

/// Build the view server request for a resolved document URL.
pub fn view_request(url: &str, options: &ViewOptions) -> ActionRequest {
    let mut request = ActionRequest::new(ACTION_VIEW);
    request.add("Reference", url);
    request.add("NoACI", "true");
    request.add("EmbedImages", options.embed_images.to_string());
    request.add("StripScript", options.strip_script.to_string());
    request.add("OriginalBaseURL", options.original_base_url.to_string());

    let terms: Vec<&str> = options
        .highlight_expressions
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !terms.is_empty() {
        request.add("Links", terms.join(","));
        request.add(
            "StartTag",
            options
                .start_tag
                .as_deref()
                .unwrap_or(DEFAULT_HIGHLIGHT_START_TAG),
        );
        request.add(
            "EndTag",
            options.end_tag.as_deref().unwrap_or(DEFAULT_HIGHLIGHT_END_TAG),
        );
        request.add("Boolean", "true");
    }

    if let Some(ref output_type) = options.output_type {
        request.add("OutputType", output_type);
    }

    request
}
