//! Flattened MIME leaf data.

/// Placeholder used for absent content type, encoding, disposition and filename.
pub const NA: &str = "NA";

/// One non-multipart unit of a message body after flattening.
///
/// `text` is empty unless the content type starts with `text` and the
/// transfer encoding is not base64, or the leaf is a bare string (content
/// type [`NA`]).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LeafPart {
    /// Lowercased `type/subtype`, or `"NA"` for bare payload strings.
    pub content_type: String,
    /// Raw `Content-Transfer-Encoding` value, or `"NA"`.
    pub transfer_encoding: String,
    /// Disposition token (`attachment`, `inline`, ...), or `"NA"`.
    pub disposition: String,
    /// Quoted filename from `Content-Disposition`, or `"NA"`.
    pub filename: String,
    /// Decoded, trimmed text content.
    pub text: String,
}

impl LeafPart {
    pub fn is_attachment(&self) -> bool {
        self.disposition == "attachment"
    }

    /// `text/html` parts and bare strings are treated as formatted content.
    pub fn is_formatted(&self) -> bool {
        self.content_type == "text/html" || self.content_type == NA
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}
