//! Metadata field extraction.
//!
//! Hits carry their metadata as an ordered list of content fragments, each
//! an ordered list of `(name, value)` field nodes. Lookups follow the
//! content backend's conventions:
//!
//! - field names are case-insensitive,
//! - only the first content fragment is considered,
//! - the first matching field wins, even if it has no value.
//!
//! # Example
//!
//! ```rust
//! use docview_core::fields::extract_field;
//! use docview_core::models::{ContentFragment, FieldNode};
//!
//! let content = vec![ContentFragment::new(vec![
//!     FieldNode::new("DRECONTENT_URL", "http://store/x"),
//! ])];
//! assert_eq!(extract_field(&content, "drecontent_url"), Some("http://store/x"));
//! assert_eq!(extract_field(&content, "AUTN_GROUP"), None);
//! ```

use crate::models::ContentFragment;

/// Connector identifier of a document, used to build connector view URIs.
pub const AUTN_IDENTIFIER: &str = "AUTN_IDENTIFIER";
/// Connector group of a document, used to build connector view URIs.
pub const AUTN_GROUP: &str = "AUTN_GROUP";
/// Indexed text content, used for the raw content fallback.
pub const CONTENT_FIELD: &str = "DRECONTENT";

/// Return the value of the first field called `name` in the first fragment.
///
/// Returns `None` when the content is empty, when no field matches, or when
/// the first matching field has no text value.
pub fn extract_field<'a>(content: &'a [ContentFragment], name: &str) -> Option<&'a str> {
    let fragment = content.first()?;

    fragment
        .fields
        .iter()
        .find(|field| field.name.eq_ignore_ascii_case(name))
        .and_then(|field| field.value.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldNode;

    fn fragment(fields: &[(&str, Option<&str>)]) -> ContentFragment {
        ContentFragment::new(
            fields
                .iter()
                .map(|(name, value)| match value {
                    Some(v) => FieldNode::new(*name, *v),
                    None => FieldNode::empty(*name),
                })
                .collect(),
        )
    }

    #[test]
    fn empty_content_yields_none() {
        assert_eq!(extract_field(&[], "DRECONTENT"), None);
    }

    #[test]
    fn empty_fragment_yields_none() {
        let content = vec![ContentFragment::default()];
        assert_eq!(extract_field(&content, "DRECONTENT"), None);
    }

    #[test]
    fn matches_regardless_of_case() {
        let content = vec![fragment(&[("AUTN_Identifier", Some("id1"))])];
        for name in ["AUTN_IDENTIFIER", "autn_identifier", "Autn_Identifier"] {
            assert_eq!(extract_field(&content, name), Some("id1"), "lookup {}", name);
        }
    }

    #[test]
    fn missing_field_yields_none() {
        let content = vec![fragment(&[("TITLE", Some("Report")), ("AUTHOR", Some("kim"))])];
        assert_eq!(extract_field(&content, "AUTN_GROUP"), None);
    }

    #[test]
    fn first_match_wins() {
        let content = vec![fragment(&[
            ("CATEGORY", Some("first")),
            ("category", Some("second")),
        ])];
        assert_eq!(extract_field(&content, "CATEGORY"), Some("first"));
    }

    #[test]
    fn first_match_without_value_shadows_later_matches() {
        let content = vec![fragment(&[("URL", None), ("URL", Some("http://later"))])];
        assert_eq!(extract_field(&content, "URL"), None);
    }

    #[test]
    fn only_first_fragment_is_scanned() {
        let content = vec![
            fragment(&[("TITLE", Some("one"))]),
            fragment(&[("AUTN_GROUP", Some("g1"))]),
        ];
        assert_eq!(extract_field(&content, "AUTN_GROUP"), None);
        assert_eq!(extract_field(&content, "TITLE"), Some("one"));
    }

    #[test]
    fn empty_string_value_is_present() {
        let content = vec![fragment(&[("DRECONTENT", Some(""))])];
        assert_eq!(extract_field(&content, "DRECONTENT"), Some(""));
    }
}
