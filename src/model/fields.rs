//! The per-message field-set produced by the assembler.

use serde::Serialize;

use crate::error::{PhishError, Result};

/// Header keys copied verbatim into every [`EmailFieldSet`].
pub const HEADER_KEYS: [&str; 8] = [
    "Message-ID",
    "Date",
    "From",
    "To",
    "Subject",
    "Content-Length",
    "X-Virus-Scanned",
    "X-Priority",
];

/// Every label accepted by [`EmailFieldSet::field`], in serialization order.
pub const FIELD_LABELS: [&str; 22] = [
    "Message-ID",
    "Date",
    "From",
    "To",
    "Subject",
    "Content-Length",
    "X-Virus-Scanned",
    "X-Priority",
    "Attached Files",
    "Attachments",
    "URL Links",
    "URLs",
    "IP Addresses",
    "IPs",
    "Images Embedded",
    "Images",
    "Encoding",
    "Is HTML",
    "Is JavaScript",
    "Is CSS",
    "Raw Message",
    "Extracted Text",
];

/// Flattened record of parsed and derived signals for one message.
///
/// Missing headers are empty strings. Counts always equal the length of the
/// matching list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailFieldSet {
    #[serde(rename = "Message-ID")]
    pub message_id: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Content-Length")]
    pub content_length: String,
    #[serde(rename = "X-Virus-Scanned")]
    pub x_virus_scanned: String,
    #[serde(rename = "X-Priority")]
    pub x_priority: String,

    #[serde(rename = "Attached Files")]
    pub attached_files: Vec<String>,
    #[serde(rename = "Attachments")]
    pub attachment_count: usize,
    #[serde(rename = "URL Links")]
    pub url_links: Vec<String>,
    #[serde(rename = "URLs")]
    pub url_count: usize,
    #[serde(rename = "IP Addresses")]
    pub ip_addresses: Vec<String>,
    #[serde(rename = "IPs")]
    pub ip_count: usize,
    #[serde(rename = "Images Embedded")]
    pub images_embedded: Vec<String>,
    #[serde(rename = "Images")]
    pub image_count: usize,
    #[serde(rename = "Encoding")]
    pub encoding: String,
    #[serde(rename = "Is HTML")]
    pub is_html: bool,
    #[serde(rename = "Is JavaScript")]
    pub is_javascript: bool,
    #[serde(rename = "Is CSS")]
    pub is_css: bool,
    #[serde(rename = "Raw Message")]
    pub raw_message: String,
    #[serde(rename = "Extracted Text")]
    pub extracted_text: String,
}

impl Default for EmailFieldSet {
    fn default() -> Self {
        Self {
            message_id: String::new(),
            date: String::new(),
            from: String::new(),
            to: String::new(),
            subject: String::new(),
            content_length: String::new(),
            x_virus_scanned: String::new(),
            x_priority: String::new(),
            attached_files: Vec::new(),
            attachment_count: 0,
            url_links: Vec::new(),
            url_count: 0,
            ip_addresses: Vec::new(),
            ip_count: 0,
            images_embedded: Vec::new(),
            image_count: 0,
            encoding: "NA".to_string(),
            is_html: false,
            is_javascript: false,
            is_css: false,
            raw_message: String::new(),
            extracted_text: String::new(),
        }
    }
}

/// Typed view of a single field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Count(usize),
    Flag(bool),
    List(&'a [String]),
}

impl FieldValue<'_> {
    /// Text content, or `None` for counts, flags and lists.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way the CSV export writes it.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.to_string(),
            FieldValue::Count(n) => n.to_string(),
            FieldValue::Flag(b) => b.to_string(),
            FieldValue::List(items) => items.join("; "),
        }
    }
}

impl EmailFieldSet {
    /// Look up a field by its label (e.g. `"URL Links"`).
    ///
    /// Unknown labels are a caller/configuration mismatch and are reported
    /// as [`PhishError::UnknownField`].
    pub fn field(&self, label: &str) -> Result<FieldValue<'_>> {
        let value = match label {
            "Message-ID" => FieldValue::Text(&self.message_id),
            "Date" => FieldValue::Text(&self.date),
            "From" => FieldValue::Text(&self.from),
            "To" => FieldValue::Text(&self.to),
            "Subject" => FieldValue::Text(&self.subject),
            "Content-Length" => FieldValue::Text(&self.content_length),
            "X-Virus-Scanned" => FieldValue::Text(&self.x_virus_scanned),
            "X-Priority" => FieldValue::Text(&self.x_priority),
            "Attached Files" => FieldValue::List(&self.attached_files),
            "Attachments" => FieldValue::Count(self.attachment_count),
            "URL Links" => FieldValue::List(&self.url_links),
            "URLs" => FieldValue::Count(self.url_count),
            "IP Addresses" => FieldValue::List(&self.ip_addresses),
            "IPs" => FieldValue::Count(self.ip_count),
            "Images Embedded" => FieldValue::List(&self.images_embedded),
            "Images" => FieldValue::Count(self.image_count),
            "Encoding" => FieldValue::Text(&self.encoding),
            "Is HTML" => FieldValue::Flag(self.is_html),
            "Is JavaScript" => FieldValue::Flag(self.is_javascript),
            "Is CSS" => FieldValue::Flag(self.is_css),
            "Raw Message" => FieldValue::Text(&self.raw_message),
            "Extracted Text" => FieldValue::Text(&self.extracted_text),
            other => return Err(PhishError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    /// Set a header-derived field by its header key. Unknown keys are ignored.
    pub(crate) fn set_header(&mut self, key: &str, value: String) {
        match key {
            "Message-ID" => self.message_id = value,
            "Date" => self.date = value,
            "From" => self.from = value,
            "To" => self.to = value,
            "Subject" => self.subject = value,
            "Content-Length" => self.content_length = value,
            "X-Virus-Scanned" => self.x_virus_scanned = value,
            "X-Priority" => self.x_priority = value,
            _ => {}
        }
    }
}

/// A field-set with the caller-assigned label attached (dataset rows).
#[derive(Debug, Clone, Serialize)]
pub struct LabeledFieldSet {
    #[serde(flatten)]
    pub fields: EmailFieldSet,
    #[serde(rename = "Is Phishy", skip_serializing_if = "Option::is_none")]
    pub is_phishy: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_resolves() {
        let fields = EmailFieldSet::default();
        for label in FIELD_LABELS {
            assert!(fields.field(label).is_ok(), "label {label} should resolve");
        }
    }

    #[test]
    fn test_unknown_label_is_lookup_failure() {
        let fields = EmailFieldSet::default();
        let err = fields.field("Spam Score").unwrap_err();
        assert!(matches!(err, PhishError::UnknownField(ref l) if l == "Spam Score"));
    }

    #[test]
    fn test_default_encoding_is_na() {
        assert_eq!(EmailFieldSet::default().encoding, "NA");
    }

    #[test]
    fn test_serializes_with_labels() {
        let labeled = LabeledFieldSet {
            fields: EmailFieldSet::default(),
            is_phishy: Some(true),
        };
        let json = serde_json::to_value(&labeled).unwrap();
        assert_eq!(json["URLs"], 0);
        assert_eq!(json["Is HTML"], false);
        assert_eq!(json["Is Phishy"], true);
    }

    #[test]
    fn test_render_list() {
        let files = vec!["a.pdf".to_string(), "b.zip".to_string()];
        assert_eq!(FieldValue::List(&files).render(), "a.pdf; b.zip");
    }
}
