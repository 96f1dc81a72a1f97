//! Raw content formatting.
//!
//! When no view URL can be resolved for a document, its indexed text is
//! turned into a minimal display document instead. The formatter hands back
//! a byte stream; the caller owns it and releases it by dropping it, on
//! every exit path.

use docview_core::models::RawDocument;
use tokio::io::AsyncRead;

/// Byte stream produced by a [`RawContentFormatter`].
pub type RawContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Converts plain extracted text into a display-ready byte stream.
pub trait RawContentFormatter: Send + Sync {
    fn format(&self, document: &RawDocument) -> std::io::Result<RawContentStream>;

    /// Media type of the formatted stream.
    fn content_type(&self) -> &str {
        "text/html; charset=utf-8"
    }
}

/// Renders a [`RawDocument`] as a small standalone HTML page.
///
/// The title (falling back to the reference) becomes the heading; content is
/// split into paragraphs on blank lines. All text is HTML-escaped.
#[derive(Debug, Clone, Default)]
pub struct HtmlRawContentFormatter;

impl HtmlRawContentFormatter {
    pub fn render(&self, document: &RawDocument) -> String {
        let heading = document
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&document.reference);
        let heading = html_escape::encode_text(heading);

        let mut html = String::with_capacity(document.content.len() + 256);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", heading));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("<h1>{}</h1>\n", heading));

        for paragraph in document
            .content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            html.push_str(&format!("<p>{}</p>\n", html_escape::encode_text(paragraph)));
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

impl RawContentFormatter for HtmlRawContentFormatter {
    fn format(&self, document: &RawDocument) -> std::io::Result<RawContentStream> {
        Ok(Box::new(std::io::Cursor::new(self.render(document).into_bytes())))
    }
}
