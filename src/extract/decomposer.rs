//! Message decomposition: flatten a [`RawMessage`] tree into leaves and read
//! the content metadata of each leaf.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::leaf::{LeafPart, NA};
use crate::model::message::{Payload, RawMessage};
use crate::parser::mime;

/// `<token>[; ... filename ... = ... "<name>"]`. The filename excludes
/// characters that are invalid in file names.
static DISPOSITION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\w+)(?:;[\S\s]*filename[\S\s]*=[\S\s]*"([^</*?"\\>:|]+)")?"#)
        .expect("valid disposition regex")
});

/// One unit of a flattened message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a> {
    /// The raw payload of a non-multipart root message. It has no headers
    /// of its own.
    Bare(&'a str),
    /// A structured part. `in_digest` is set when the direct parent is a
    /// `multipart/digest`, which changes the default content type.
    Part { message: &'a RawMessage, in_digest: bool },
}

/// Flatten `message` into its leaves, depth-first and left-to-right.
///
/// A non-multipart root yields exactly one [`Leaf::Bare`]. Nesting depth is
/// unbounded: traversal uses an explicit stack.
pub fn flatten_payload(message: &RawMessage) -> Vec<Leaf<'_>> {
    let children = match &message.payload {
        Payload::Leaf(body) => return vec![Leaf::Bare(body)],
        Payload::Parts(children) => children,
    };

    let root_is_digest = is_digest(message);
    let mut leaves = Vec::new();
    let mut stack: Vec<(&RawMessage, bool)> =
        children.iter().rev().map(|c| (c, root_is_digest)).collect();

    while let Some((part, in_digest)) = stack.pop() {
        match &part.payload {
            Payload::Leaf(_) => leaves.push(Leaf::Part {
                message: part,
                in_digest,
            }),
            Payload::Parts(children) => {
                let child_in_digest = is_digest(part);
                stack.extend(children.iter().rev().map(|c| (c, child_in_digest)));
            }
        }
    }

    leaves
}

fn is_digest(message: &RawMessage) -> bool {
    mime::content_type(message.header("Content-Type"), false) == "multipart/digest"
}

/// Read content type, transfer encoding, disposition, filename and text of a leaf.
///
/// Undecodable content never fails: it yields empty text.
pub fn extract_leaf_data(leaf: Leaf<'_>) -> LeafPart {
    let (message, in_digest) = match leaf {
        Leaf::Bare(body) => {
            return LeafPart {
                content_type: NA.to_string(),
                transfer_encoding: NA.to_string(),
                disposition: NA.to_string(),
                filename: NA.to_string(),
                text: body.trim().to_string(),
            }
        }
        Leaf::Part { message, in_digest } => (message, in_digest),
    };

    let content_type = mime::content_type(message.header("Content-Type"), in_digest);
    let transfer_encoding = message
        .header("Content-Transfer-Encoding")
        .unwrap_or(NA)
        .to_string();
    let (disposition, filename) = parse_disposition(message.header("Content-Disposition"));

    let is_text = content_type.starts_with("text")
        && !transfer_encoding.to_ascii_lowercase().contains("base64");
    let text = match &message.payload {
        Payload::Leaf(body) if is_text => body.trim().to_string(),
        _ => String::new(),
    };

    LeafPart {
        content_type,
        transfer_encoding,
        disposition,
        filename,
        text,
    }
}

/// Split a `Content-Disposition` value into `(token, filename)`.
///
/// Absent or unparsable values yield `("NA", "NA")`; a missing filename is `"NA"`.
pub fn parse_disposition(value: Option<&str>) -> (String, String) {
    let Some(value) = value else {
        return (NA.to_string(), NA.to_string());
    };
    match DISPOSITION_REGEX.captures(value) {
        Some(caps) => {
            let disposition = caps[1].to_string();
            let filename = caps
                .get(2)
                .map_or_else(|| NA.to_string(), |m| m.as_str().to_string());
            (disposition, filename)
        }
        None => {
            debug!(value, "Unparsable Content-Disposition");
            (NA.to_string(), NA.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::headers;

    fn text_part(content_type: &str, body: &str) -> RawMessage {
        RawMessage::leaf(headers([("Content-Type", content_type)]), body)
    }

    #[test]
    fn test_bare_root_is_single_leaf() {
        let msg = RawMessage::leaf(headers([("Content-Type", "text/plain")]), "  hello  ");
        let leaves = flatten_payload(&msg);
        assert_eq!(leaves, vec![Leaf::Bare("  hello  ")]);

        let data = extract_leaf_data(leaves[0]);
        assert_eq!(data.content_type, "NA");
        assert_eq!(data.transfer_encoding, "NA");
        assert_eq!(data.text, "hello");
    }

    #[test]
    fn test_flattening_is_depth_first() {
        let msg = RawMessage::multipart(
            headers([("Content-Type", "multipart/mixed; boundary=a")]),
            vec![
                text_part("text/plain", "A"),
                RawMessage::multipart(
                    headers([("Content-Type", "multipart/alternative; boundary=b")]),
                    vec![text_part("text/html", "B"), text_part("text/plain", "C")],
                ),
            ],
        );
        let texts: Vec<String> = flatten_payload(&msg)
            .into_iter()
            .map(|leaf| extract_leaf_data(leaf).text)
            .collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let mut msg = text_part("text/plain", "deep");
        for _ in 0..100_000 {
            msg = RawMessage::multipart(headers([("Content-Type", "multipart/mixed")]), vec![msg]);
        }
        let leaves = flatten_payload(&msg);
        assert_eq!(leaves.len(), 1);
        assert_eq!(extract_leaf_data(leaves[0]).text, "deep");
    }

    #[test]
    fn test_disposition_parsing() {
        assert_eq!(
            parse_disposition(Some(r#"attachment; filename="invoice.pdf""#)),
            ("attachment".to_string(), "invoice.pdf".to_string())
        );
        assert_eq!(
            parse_disposition(Some("inline")),
            ("inline".to_string(), "NA".to_string())
        );
        assert_eq!(
            parse_disposition(None),
            ("NA".to_string(), "NA".to_string())
        );
        assert_eq!(
            parse_disposition(Some("; broken")),
            ("NA".to_string(), "NA".to_string())
        );
        // Unquoted and path-like filenames are not captured
        assert_eq!(
            parse_disposition(Some("attachment; filename=plain.txt")),
            ("attachment".to_string(), "NA".to_string())
        );
        assert_eq!(
            parse_disposition(Some(r#"attachment; filename="../etc/passwd""#)),
            ("attachment".to_string(), "NA".to_string())
        );
    }

    #[test]
    fn test_leaf_metadata() {
        let part = RawMessage::leaf(
            headers([
                ("Content-Type", "application/pdf; name=\"invoice.pdf\""),
                ("Content-Transfer-Encoding", "base64"),
                ("Content-Disposition", "attachment; filename=\"invoice.pdf\""),
            ]),
            "JVBERi0xLjQK",
        );
        let data = extract_leaf_data(Leaf::Part {
            message: &part,
            in_digest: false,
        });
        assert_eq!(data.content_type, "application/pdf");
        assert_eq!(data.transfer_encoding, "base64");
        assert_eq!(data.disposition, "attachment");
        assert_eq!(data.filename, "invoice.pdf");
        assert!(data.text.is_empty());
    }

    #[test]
    fn test_base64_text_has_no_text() {
        let part = RawMessage::leaf(
            headers([
                ("Content-Type", "text/plain"),
                ("Content-Transfer-Encoding", "Base64"),
            ]),
            "aGVsbG8=",
        );
        let data = extract_leaf_data(Leaf::Part {
            message: &part,
            in_digest: false,
        });
        assert_eq!(data.content_type, "text/plain");
        assert!(data.text.is_empty());
    }

    #[test]
    fn test_missing_content_type_defaults() {
        let part = RawMessage::leaf(Vec::new(), " body ");
        let plain = extract_leaf_data(Leaf::Part {
            message: &part,
            in_digest: false,
        });
        assert_eq!(plain.content_type, "text/plain");
        assert_eq!(plain.text, "body");

        let digest = extract_leaf_data(Leaf::Part {
            message: &part,
            in_digest: true,
        });
        assert_eq!(digest.content_type, "message/rfc822");
        assert!(digest.text.is_empty());
    }
}
