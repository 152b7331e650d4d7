//! Parser for individual `.eml` files (RFC 5322 messages without MBOX framing).

use std::path::Path;

use crate::error::{PhishError, Result};
use crate::model::message::RawMessage;
use crate::parser::mime;

/// Read a single `.eml` file into a [`RawMessage`] tree.
///
/// A stray leading `From ` line is tolerated and skipped.
pub fn parse_eml(path: impl AsRef<Path>) -> Result<RawMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| PhishError::open(path, e))?;
    Ok(mime::parse_raw_message(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_eml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n")
            .unwrap();
        let msg = parse_eml(file.path()).unwrap();
        assert_eq!(msg.header("from"), Some("a@b.com"));
        assert_eq!(msg.header("subject"), Some("Hi"));
    }

    #[test]
    fn test_missing_eml_file() {
        let err = parse_eml("/nonexistent/message.eml").unwrap_err();
        assert!(matches!(err, PhishError::FileNotFound(_)));
    }
}
