//! ACI XML response parsing.
//!
//! The content backend answers every action with an `autnresponse`
//! envelope. A successful GetContent looks like:
//!
//! ```xml
//! <autnresponse xmlns:autn="http://schemas.autonomy.com/aci/">
//!   <action>GETCONTENT</action>
//!   <response>SUCCESS</response>
//!   <responsedata>
//!     <autn:hit>
//!       <autn:reference>doc-1</autn:reference>
//!       <autn:database>News</autn:database>
//!       <autn:title>Quarterly report</autn:title>
//!       <autn:content>
//!         <DOCUMENT>
//!           <AUTN_IDENTIFIER>id1</AUTN_IDENTIFIER>
//!           <DRECONTENT>Body text</DRECONTENT>
//!         </DOCUMENT>
//!       </autn:content>
//!     </autn:hit>
//!   </responsedata>
//! </autnresponse>
//! ```
//!
//! A failed action carries `<response>ERROR</response>` and an `<error>`
//! block in `responsedata`, which is surfaced as [`AciError`].
//!
//! Element names are matched on their local part, so the `autn:` prefix
//! is optional. Each direct child of `autn:content` becomes a
//! [`ContentFragment`]; each of its direct children becomes a
//! [`FieldNode`] whose value is the field's leading text, if any, exactly
//! as sent.

use docview_core::models::{ContentFragment, FieldNode, GetContentResponse, Hit};
use quick_xml::events::Event;
use serde::Serialize;
use thiserror::Error;

/// Error reported by an ACI server inside a well-formed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AciError {
    pub error_id: String,
    pub error_string: String,
    pub description: String,
    pub code: Option<String>,
}

impl std::fmt::Display for AciError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.error_id, self.error_string)?;
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AciResponseError {
    #[error("ACI error {0}")]
    Error(AciError),
    #[error("malformed ACI response: {0}")]
    Malformed(String),
}

/// Parse a GetContent response body.
pub fn parse_get_content(xml: &[u8]) -> Result<GetContentResponse, AciResponseError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut parser = GetContentParser::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                parser.start(name)?;
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                parser.start(name)?;
                parser.end();
            }
            Ok(Event::End(_)) => parser.end(),
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| AciResponseError::Malformed(e.to_string()))?;
                parser.text(&text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                parser.text(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AciResponseError::Malformed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

/// Streaming state for [`parse_get_content`].
#[derive(Default)]
struct GetContentParser {
    stack: Vec<String>,
    status: Option<String>,
    error: AciError,
    hits: Vec<Hit>,
    hit: Option<Hit>,
    /// Stack depth at which the open hit element sits.
    hit_depth: usize,
    fragment: Option<ContentFragment>,
    field: Option<FieldNode>,
    /// Whether the open field's first child has been seen.
    field_child_seen: bool,
}

impl GetContentParser {
    fn start(&mut self, name: String) -> Result<(), AciResponseError> {
        if self.stack.is_empty() && name != "autnresponse" {
            return Err(AciResponseError::Malformed(format!(
                "unexpected root element <{}>",
                name
            )));
        }

        self.stack.push(name);
        let depth = self.stack.len();

        if self.hit.is_none() {
            if depth == 3 && self.path_is(&["autnresponse", "responsedata", "hit"]) {
                self.hit = Some(Hit::default());
                self.hit_depth = depth;
            }
            return Ok(());
        }

        if !self.in_hit_content() {
            return Ok(());
        }

        let relative = depth - self.hit_depth;
        match relative {
            2 => self.fragment = Some(ContentFragment::default()),
            3 => {
                let name = self.stack[depth - 1].clone();
                self.field = Some(FieldNode::empty(name));
                self.field_child_seen = false;
            }
            _ => self.field_child_seen = true,
        }

        Ok(())
    }

    /// Field values are kept verbatim; everything else is trimmed, and
    /// whitespace between elements is ignored.
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let depth = self.stack.len();

        if self.path_is(&["autnresponse", "response"]) {
            self.status = Some(text.trim().to_string());
            return;
        }

        if depth == 4 && self.path_starts_with(&["autnresponse", "responsedata", "error"]) {
            let value = text.trim().to_string();
            match self.stack[3].to_ascii_lowercase().as_str() {
                "errorid" => self.error.error_id = value,
                "errorstring" => self.error.error_string = value,
                "errordescription" => self.error.description = value,
                "errorcode" => self.error.code = Some(value),
                _ => {}
            }
            return;
        }

        let Some(hit) = self.hit.as_mut() else {
            return;
        };

        if depth == self.hit_depth + 1 {
            let value = text.trim().to_string();
            match self.stack[depth - 1].as_str() {
                "reference" => hit.reference = value,
                "title" => hit.title = Some(value),
                "database" => hit.database = Some(value),
                _ => {}
            }
        } else if depth == self.hit_depth + 3 && self.stack[self.hit_depth] == "content" {
            if let Some(field) = self.field.as_mut() {
                if !self.field_child_seen {
                    field.value = Some(text.to_string());
                    self.field_child_seen = true;
                }
            }
        } else if depth > self.hit_depth + 3 {
            self.field_child_seen = true;
        }
    }

    fn end(&mut self) {
        let depth = self.stack.len();

        if self.hit.is_some() {
            if depth == self.hit_depth + 3 {
                if let (Some(field), Some(fragment)) = (self.field.take(), self.fragment.as_mut()) {
                    fragment.fields.push(field);
                }
            } else if depth == self.hit_depth + 2 {
                if let (Some(fragment), Some(hit)) = (self.fragment.take(), self.hit.as_mut()) {
                    hit.content.push(fragment);
                }
            } else if depth == self.hit_depth {
                if let Some(hit) = self.hit.take() {
                    self.hits.push(hit);
                }
            }
        }

        self.stack.pop();
    }

    fn finish(self) -> Result<GetContentResponse, AciResponseError> {
        match self.status.as_deref() {
            Some("SUCCESS") => Ok(GetContentResponse { hits: self.hits }),
            Some("ERROR") => Err(AciResponseError::Error(self.error)),
            Some(other) => Err(AciResponseError::Malformed(format!(
                "unexpected response status {:?}",
                other
            ))),
            None => Err(AciResponseError::Malformed(
                "missing <response> status".to_string(),
            )),
        }
    }

    fn in_hit_content(&self) -> bool {
        self.stack.len() > self.hit_depth + 1 && self.stack[self.hit_depth] == "content"
    }

    fn path_is(&self, path: &[&str]) -> bool {
        self.stack.len() == path.len() && self.path_starts_with(path)
    }

    fn path_starts_with(&self, path: &[&str]) -> bool {
        self.stack.len() >= path.len() && self.stack.iter().zip(path).all(|(a, b)| a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<autnresponse xmlns:autn="http://schemas.autonomy.com/aci/">
  <action>GETCONTENT</action>
  <response>SUCCESS</response>
  <responsedata>
    <autn:hit>
      <autn:reference>doc-1</autn:reference>
      <autn:id>42</autn:id>
      <autn:database>News</autn:database>
      <autn:title>Fish &amp; Chips</autn:title>
      <autn:content>
        <DOCUMENT>
          <DRECONTENT_URL>http://store/x</DRECONTENT_URL>
          <AUTN_GROUP/>
          <NESTED><INNER>deep</INNER></NESTED>
          <DRECONTENT><![CDATA[Body <b>text</b>]]></DRECONTENT>
        </DOCUMENT>
        <DOCUMENT>
          <AUTN_IDENTIFIER>second</AUTN_IDENTIFIER>
        </DOCUMENT>
      </autn:content>
    </autn:hit>
    <autn:hit>
      <autn:reference>doc-2</autn:reference>
    </autn:hit>
  </responsedata>
</autnresponse>"#;

    #[test]
    fn parses_hits_and_fragments() {
        let response = parse_get_content(HIT_XML.as_bytes()).unwrap();
        assert_eq!(response.hits.len(), 2);

        let hit = response.first_hit().unwrap();
        assert_eq!(hit.reference, "doc-1");
        assert_eq!(hit.database.as_deref(), Some("News"));
        assert_eq!(hit.title.as_deref(), Some("Fish & Chips"));
        assert_eq!(hit.content.len(), 2);

        let fields = &hit.content[0].fields;
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], FieldNode::new("DRECONTENT_URL", "http://store/x"));
        assert_eq!(fields[1], FieldNode::empty("AUTN_GROUP"));
        assert_eq!(fields[2], FieldNode::empty("NESTED"));
        assert_eq!(fields[3], FieldNode::new("DRECONTENT", "Body <b>text</b>"));

        assert_eq!(hit.field("drecontent_url"), Some("http://store/x"));
        assert_eq!(hit.field("AUTN_IDENTIFIER"), None);

        assert_eq!(response.hits[1].reference, "doc-2");
        assert!(response.hits[1].content.is_empty());
    }

    #[test]
    fn parses_empty_result() {
        let xml = r#"<autnresponse>
  <action>GETCONTENT</action>
  <response>SUCCESS</response>
  <responsedata/>
</autnresponse>"#;
        let response = parse_get_content(xml.as_bytes()).unwrap();
        assert!(response.hits.is_empty());
    }

    #[test]
    fn error_response_becomes_aci_error() {
        let xml = r#"<autnresponse>
  <action>GETCONTENT</action>
  <response>ERROR</response>
  <responsedata>
    <error>
      <errorid>AXEGETCONTENT525</errorid>
      <rawerrorid>0x20D</rawerrorid>
      <errorstring>ERRORNOTFOUND</errorstring>
      <errordescription>The requested documents were not found.</errordescription>
      <errorcode>ERRORNOTFOUND</errorcode>
    </error>
  </responsedata>
</autnresponse>"#;
        let err = parse_get_content(xml.as_bytes()).unwrap_err();
        match err {
            AciResponseError::Error(e) => {
                assert_eq!(e.error_id, "AXEGETCONTENT525");
                assert_eq!(e.error_string, "ERRORNOTFOUND");
                assert_eq!(e.description, "The requested documents were not found.");
                assert_eq!(e.code.as_deref(), Some("ERRORNOTFOUND"));
            }
            other => panic!("expected ACI error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_foreign_root_element() {
        let err = parse_get_content(b"<html><body>502 Bad Gateway</body></html>").unwrap_err();
        assert!(matches!(err, AciResponseError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_status() {
        let err = parse_get_content(b"<autnresponse><responsedata/></autnresponse>").unwrap_err();
        assert!(matches!(err, AciResponseError::Malformed(_)));
    }

    #[test]
    fn rejects_broken_xml() {
        let err = parse_get_content(b"<autnresponse><response>SUCCESS</oops>").unwrap_err();
        assert!(matches!(err, AciResponseError::Malformed(_)));
    }

    #[test]
    fn field_text_keeps_surrounding_whitespace() {
        let xml = "<autnresponse><response>SUCCESS</response><responsedata>\
<autn:hit><autn:reference> doc-1 </autn:reference><autn:content><DOCUMENT>\n  \
<DRECONTENT>\n  indented line\n\n  second  \n</DRECONTENT>\n  \
<PADDED>  x  </PADDED>\n\
</DOCUMENT></autn:content></autn:hit></responsedata></autnresponse>";

        let response = parse_get_content(xml.as_bytes()).unwrap();
        let hit = response.first_hit().unwrap();
        assert_eq!(hit.reference, "doc-1");
        assert_eq!(hit.content[0].fields.len(), 2);
        assert_eq!(
            hit.field("DRECONTENT"),
            Some("\n  indented line\n\n  second  \n")
        );
        assert_eq!(hit.field("PADDED"), Some("  x  "));
    }

    #[test]
    fn whitespace_only_field_is_kept() {
        let xml = "<autnresponse><response>SUCCESS</response><responsedata><hit>\
<reference>doc-1</reference><content><DOCUMENT><BLANK>   </BLANK></DOCUMENT></content>\
</hit></responsedata></autnresponse>";

        let response = parse_get_content(xml.as_bytes()).unwrap();
        assert_eq!(response.first_hit().unwrap().field("BLANK"), Some("   "));
    }
}
