//! MIME structure parsing: raw bytes into a [`RawMessage`] tree.
//!
//! `mail-parser` does the MIME work. This module walks its part list and
//! keeps header values exactly as written in the message.

use mail_parser::{Header, Message, MessageParser, MessagePart, MessagePartId, PartType};
use tracing::debug;

use crate::model::message::RawMessage;
use crate::parser::header;

/// Maximum nesting of multipart / `message/rfc822` containers. Deeper
/// entities are kept as undecoded leaves.
const MAX_DEPTH: usize = 64;

/// Parse a complete raw message (headers + body) into a [`RawMessage`] tree.
///
/// Never fails: input `mail-parser` cannot make sense of becomes a single
/// leaf without headers, a multipart without a usable boundary is kept as a
/// single leaf.
pub fn parse_raw_message(raw_message: &[u8]) -> RawMessage {
    // Strip the leading "From " separator line if present
    let message_bytes = skip_from_line(raw_message);

    let parser = MessageParser::default();
    match parser.parse(message_bytes) {
        Some(msg) => convert_part(&msg, 0, 0),
        None => {
            debug!("No headers found, keeping message as a single body");
            RawMessage::leaf(Vec::new(), String::from_utf8_lossy(message_bytes))
        }
    }
}

/// Convert part `part_id` of `message` and everything below it.
///
/// Text parts carry the body decoded by `mail-parser` (transfer encoding and
/// charset). Other leaves keep their body as found in the message.
fn convert_part(message: &Message<'_>, part_id: MessagePartId, depth: usize) -> RawMessage {
    let Some(part) = message.parts.get(part_id) else {
        return RawMessage::default();
    };
    let raw = message.raw_message();
    let headers = raw_headers(raw, &part.headers);

    if depth >= MAX_DEPTH {
        debug!(depth, "Nesting limit reached, keeping entity as a leaf");
        return RawMessage::leaf(headers, raw_body(raw, part));
    }

    match &part.body {
        PartType::Text(text) | PartType::Html(text) => RawMessage::leaf(headers, &**text),
        PartType::Binary(_) | PartType::InlineBinary(_) => {
            RawMessage::leaf(headers, raw_body(raw, part))
        }
        PartType::Multipart(part_ids) => {
            let parts = part_ids
                .iter()
                .map(|&id| convert_part(message, id, depth + 1))
                .collect();
            RawMessage::multipart(headers, parts)
        }
        PartType::Message(embedded) => {
            RawMessage::multipart(headers, vec![convert_part(embedded, 0, depth + 1)])
        }
    }
}

/// Header `(name, value)` pairs as they appear in `raw`, values unfolded.
fn raw_headers(raw: &[u8], headers: &[Header<'_>]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| {
            // The name ends at the colon just before `offset_start`
            let name = raw
                .get(h.offset_field..h.offset_start.saturating_sub(1))
                .unwrap_or_default();
            let value = raw.get(h.offset_start..h.offset_end).unwrap_or_default();
            (
                header::decode_header_bytes(name).trim().to_string(),
                header::unfold_value(&header::decode_header_bytes(value)),
            )
        })
        .collect()
}

fn raw_body(raw: &[u8], part: &MessagePart<'_>) -> String {
    let body = raw
        .get(part.offset_body..part.offset_end)
        .unwrap_or_default();
    String::from_utf8_lossy(body).into_owned()
}

/// Lowercased `type/subtype` of a `Content-Type` header value.
///
/// Absent → `text/plain` (or `message/rfc822` directly inside a
/// `multipart/digest`). A value that is not `type/subtype` → `text/plain`.
pub fn content_type(value: Option<&str>, in_digest: bool) -> String {
    let Some(value) = value else {
        return if in_digest {
            "message/rfc822".to_string()
        } else {
            "text/plain".to_string()
        };
    };
    let ctype = value.split(';').next().unwrap_or("").trim().to_lowercase();
    if ctype.matches('/').count() != 1 {
        return "text/plain".to_string();
    }
    ctype
}

/// Skip the `From ` separator line at the start of MBOX messages.
pub(crate) fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        // Find end of line
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
