//! Builds one [`EmailFieldSet`] per message from its headers and leaves.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::extract::decomposer::{extract_leaf_data, flatten_payload};
use crate::html::finder::{HtmlFinder, StructuralAnalyzer};
use crate::html::text::body_text;
use crate::model::fields::{EmailFieldSet, HEADER_KEYS};
use crate::model::leaf::LeafPart;
use crate::model::message::RawMessage;
use crate::signals::{PhishyMatcher, SignalMatcher};

/// Orchestrates decomposition, structural analysis and signal matching.
///
/// The assembler holds a matcher and creates a fresh analyzer for every
/// message, so it can be shared freely and reused across messages.
#[derive(Debug, Clone, Default)]
pub struct Assembler<M = PhishyMatcher> {
    matcher: M,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: SignalMatcher> Assembler<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    /// Build the field-set of `message` using [`HtmlFinder`] for HTML parts.
    pub fn assemble(&self, message: &RawMessage) -> EmailFieldSet {
        self.assemble_with::<HtmlFinder>(message)
    }

    /// Build the field-set of `message` with a caller-chosen analyzer type.
    ///
    /// Only the first non-empty HTML (or bare) leaf is analyzed; URL and IP
    /// fields come from that leaf, or from the plain-text leaf when the
    /// message has no formatted content.
    pub fn assemble_with<A>(&self, message: &RawMessage) -> EmailFieldSet
    where
        A: StructuralAnalyzer + Default,
    {
        let mut fields = EmailFieldSet::default();
        for key in HEADER_KEYS {
            let value = message.header(key).unwrap_or_default();
            fields.set_header(key, value.to_string());
        }
        fields.message_id = fields
            .message_id
            .trim_matches(|c| c == '<' || c == '>')
            .to_string();

        let leaves: Vec<LeafPart> = flatten_payload(message)
            .into_iter()
            .map(extract_leaf_data)
            .collect();

        let is_plain = leaves
            .iter()
            .any(|leaf| leaf.content_type == "text/plain" && leaf.has_text());
        let is_formatted = leaves
            .iter()
            .any(|leaf| leaf.is_formatted() && leaf.has_text());
        let mut is_parsed = false;

        for leaf in &leaves {
            if leaf.is_attachment() {
                fields.attachment_count += 1;
                fields.attached_files.push(leaf.filename.clone());
            }
            if !leaf.has_text() {
                continue;
            }

            match leaf.content_type.as_str() {
                "text/javascript" => fields.is_javascript = true,
                "text/css" => fields.is_css = true,
                "text/plain" => {
                    fields.extracted_text = leaf.text.clone();
                    if !is_formatted {
                        self.extract_signals(&mut fields, leaf, false);
                    }
                }
                _ if leaf.is_formatted() && !is_parsed => {
                    let mut analyzer = A::default();
                    analyzer.feed(&leaf.text);
                    let analysis = analyzer.analysis();
                    fields.is_html = analysis.is_html;
                    fields.is_javascript = analysis.is_js;
                    fields.is_css = analysis.is_css;
                    fields.image_count = analysis.images.len();
                    fields.images_embedded = analysis.images;

                    self.extract_signals(&mut fields, leaf, true);

                    if !is_plain {
                        let text = body_text(&leaf.text);
                        fields.extracted_text = if text.is_empty() {
                            leaf.text.clone()
                        } else {
                            text
                        };
                    }
                    is_parsed = true;
                }
                other => debug!(content_type = other, "Leaf not used for extraction"),
            }
        }

        fields
    }

    /// Populate URL, IP, encoding and raw-message fields from one leaf.
    fn extract_signals(&self, fields: &mut EmailFieldSet, leaf: &LeafPart, is_html: bool) {
        let urls = if is_html {
            self.matcher.extract_urls_from_html(&leaf.text)
        } else {
            self.matcher.extract_urls_from_text(&leaf.text)
        };
        fields.url_count = urls.len();
        fields.url_links = urls;

        let ips = self.matcher.find_ips(&leaf.text);
        fields.ip_count = ips.len();
        fields.ip_addresses = ips;

        fields.encoding = leaf.transfer_encoding.clone();
        fields.raw_message = leaf.text.clone();
    }
}

impl<M: SignalMatcher + Sync> Assembler<M> {
    /// Assemble many messages in parallel. Output order matches input order.
    pub fn assemble_batch(&self, messages: &[RawMessage]) -> Vec<EmailFieldSet> {
        let fields: Vec<EmailFieldSet> = messages.par_iter().map(|m| self.assemble(m)).collect();
        info!(count = fields.len(), "Assembled batch");
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::headers;
    use crate::parser::mime::parse_raw_message;

    fn part(content_type: &str, body: &str) -> RawMessage {
        RawMessage::leaf(headers([("Content-Type", content_type)]), body)
    }

    fn mixed(parts: Vec<RawMessage>) -> RawMessage {
        RawMessage::multipart(
            headers([
                ("Message-ID", "<abc@example.com>"),
                ("Subject", "Account notice"),
                ("Content-Type", "multipart/mixed; boundary=x"),
            ]),
            parts,
        )
    }

    #[test]
    fn test_headers_copied() {
        let msg = RawMessage::leaf(
            headers([
                ("Message-ID", "<abc@example.com>"),
                ("X-Priority", "1 (Highest)"),
            ]),
            "",
        );
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.message_id, "abc@example.com");
        assert_eq!(fields.x_priority, "1 (Highest)");
        assert_eq!(fields.from, "");
        assert_eq!(fields.encoding, "NA");
    }

    #[test]
    fn test_html_precedence_over_plain() {
        let msg = mixed(vec![
            part("text/plain", "Visit http://plain.example.com today from 10.1.2.3"),
            part(
                "text/html",
                r#"<html><body><a href="http://html.example.com">Login</a> 192.168.1.1</body></html>"#,
            ),
        ]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.url_links, vec!["http://html.example.com"]);
        assert_eq!(fields.ip_addresses, vec!["192.168.1.1"]);
        assert_eq!(
            fields.extracted_text,
            "Visit http://plain.example.com today from 10.1.2.3"
        );
        assert!(fields.is_html);
        assert!(fields.raw_message.starts_with("<html>"));
    }

    #[test]
    fn test_plain_only_uses_text_extraction() {
        let msg = mixed(vec![part(
            "text/plain",
            "Reset at https://bank.example.com/reset now",
        )]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.url_links, vec!["https://bank.example.com/reset"]);
        assert_eq!(fields.url_count, 1);
        assert!(!fields.is_html);
        assert_eq!(fields.encoding, "NA");
    }

    #[test]
    fn test_html_only_extracts_visible_text() {
        let msg = mixed(vec![part(
            "text/html",
            r#"<html><head><title>t</title></head><body><p>Dear user</p><img src="logo.png"></body></html>"#,
        )]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.extracted_text, "Dear user");
        assert_eq!(fields.images_embedded, vec!["logo.png"]);
        assert_eq!(fields.image_count, 1);
    }

    #[test]
    fn test_html_without_text_falls_back_to_raw() {
        let msg = mixed(vec![part("text/html", r#"<img src="a.gif">"#)]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.extracted_text, r#"<img src="a.gif">"#);
    }

    #[test]
    fn test_only_first_html_part_is_analyzed() {
        let msg = mixed(vec![
            part("text/html", r#"<a href="http://first.example.com">1</a>"#),
            part(
                "text/html",
                r#"<a href="http://second.example.com">2</a><script type="text/javascript"></script>"#,
            ),
        ]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.url_links, vec!["http://first.example.com"]);
        assert!(!fields.is_javascript);
    }

    #[test]
    fn test_attachments_counted_regardless_of_type() {
        let attachment = RawMessage::leaf(
            headers([
                ("Content-Type", "application/zip"),
                ("Content-Transfer-Encoding", "base64"),
                ("Content-Disposition", r#"attachment; filename="payload.zip""#),
            ]),
            "UEsDBA==",
        );
        let inline_image = RawMessage::leaf(
            headers([
                ("Content-Type", "image/png"),
                ("Content-Disposition", "inline"),
            ]),
            "iVBORw0K",
        );
        let msg = mixed(vec![part("text/plain", "see attached"), attachment, inline_image]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.attachment_count, 1);
        assert_eq!(fields.attached_files, vec!["payload.zip"]);
    }

    #[test]
    fn test_script_and_style_parts() {
        let msg = mixed(vec![
            part("text/javascript", "alert(1)"),
            part("text/css", "p { color: red }"),
        ]);
        let fields = Assembler::new().assemble(&msg);
        assert!(fields.is_javascript);
        assert!(fields.is_css);
        assert_eq!(fields.url_count, 0);
    }

    #[test]
    fn test_no_text_leaves() {
        let msg = mixed(vec![RawMessage::leaf(
            headers([("Content-Type", "image/png")]),
            "iVBORw0K",
        )]);
        let fields = Assembler::new().assemble(&msg);
        assert_eq!(fields.url_count, 0);
        assert_eq!(fields.ip_count, 0);
        assert_eq!(fields.image_count, 0);
        assert!(!fields.is_html);
        assert_eq!(fields.extracted_text, "");
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let msg = parse_raw_message(
            b"Subject: hi\nContent-Type: text/html\n\n<a href=\"http://x.com\">x</a><img src=\"a.png\">\n",
        );
        let assembler = Assembler::new();
        let first = assembler.assemble(&msg);
        let second = assembler.assemble(&msg);
        assert_eq!(first, second);
        assert_eq!(second.image_count, 1);
    }

    #[test]
    fn test_batch_preserves_order() {
        let messages: Vec<RawMessage> = (0..32)
            .map(|i| {
                let subject = format!("message {i}");
                RawMessage::leaf(headers([("Subject", subject.as_str())]), format!("body {i}"))
            })
            .collect();
        let fields = Assembler::new().assemble_batch(&messages);
        assert_eq!(fields.len(), 32);
        for (i, f) in fields.iter().enumerate() {
            assert_eq!(f.subject, format!("message {i}"));
        }
    }
}
