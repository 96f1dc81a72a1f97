//! Core data models for document view resolution.
//!
//! These types carry the result of a GetContent visibility check and the
//! request-scoped values derived from it. All of them are built once per
//! request and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::fields::extract_field;

/// A single named field inside a content fragment.
///
/// `value` is `None` when the field element had no leading text, e.g.
/// `<AUTN_GROUP/>` or a field whose first child is a nested element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub name: String,
    pub value: Option<String>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// A field node with no text content.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// One content fragment of a hit: its fields in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFragment {
    pub fields: Vec<FieldNode>,
}

impl ContentFragment {
    pub fn new(fields: Vec<FieldNode>) -> Self {
        Self { fields }
    }
}

/// One matched document returned by the content backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hit {
    pub reference: String,
    pub title: Option<String>,
    pub database: Option<String>,
    /// Content payload. Only the first fragment is ever consulted.
    pub content: Vec<ContentFragment>,
}

impl Hit {
    /// Look up a metadata field on this hit.
    ///
    /// See [`extract_field`] for the matching rules.
    pub fn field(&self, name: &str) -> Option<&str> {
        extract_field(&self.content, name)
    }
}

/// Parsed response of a GetContent action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetContentResponse {
    pub hits: Vec<Hit>,
}

impl GetContentResponse {
    pub fn first_hit(&self) -> Option<&Hit> {
        self.hits.first()
    }
}

/// Rendering options forwarded to the view server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Terms to highlight in the rendered document.
    #[serde(default)]
    pub highlight_expressions: Vec<String>,
    #[serde(default)]
    pub start_tag: Option<String>,
    #[serde(default)]
    pub end_tag: Option<String>,
    /// Desired output format, passed through as `OutputType`.
    #[serde(default)]
    pub output_type: Option<String>,
    #[serde(default = "default_true")]
    pub embed_images: bool,
    #[serde(default = "default_true")]
    pub strip_script: bool,
    #[serde(default = "default_true")]
    pub original_base_url: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            highlight_expressions: Vec::new(),
            start_tag: None,
            end_tag: None,
            output_type: None,
            embed_images: true,
            strip_script: true,
            original_base_url: true,
        }
    }
}

/// A caller's request to view one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub reference: String,
    pub database: String,
    pub options: ViewOptions,
}

impl ViewRequest {
    pub fn new(reference: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            database: database.into(),
            options: ViewOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }
}

/// Minimal document synthesized from indexed text when no view URL exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDocument {
    pub reference: String,
    pub title: Option<String>,
    pub content: String,
}
