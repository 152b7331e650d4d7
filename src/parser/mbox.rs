//! Streaming MBOX parser.
//!
//! Reads MBOX files line-by-line with a 1 MB buffer.
//! Never loads the entire file into memory. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{PhishError, Result};

/// Size of the internal read buffer (1 MB for fast sequential reads on modern SSDs).
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default maximum message size in bytes (256 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Report progress every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Streaming MBOX parser.
///
/// Reads through the file sequentially, invoking a caller-supplied callback for
/// every message it finds. The parser is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| PhishError::open(&path, e))?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    /// Bodies longer than `max` bytes are truncated (with a warning).
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the MBOX file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback receives `(offset, raw_bytes)` and returns `true` to
    /// continue or `false` to abort early. Raw bytes include the `From `
    /// separator line.
    ///
    /// Returns the number of messages found.
    pub fn parse(
        &self,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| PhishError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut message_start: u64 = 0;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut last_progress: u64 = 0;
        let mut saw_separator = false;
        let mut truncated = false;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| PhishError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let consume_len = memchr_newline(buf).map_or(buf.len(), |pos| pos + 1);
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if !message_buf.is_empty() {
                    if !message_callback(message_start, &message_buf) {
                        return Ok(count);
                    }
                    count += 1;
                }
                saw_separator = true;
                truncated = false;
                message_start = current_offset;
                message_buf.clear();
                message_buf.extend_from_slice(&line_buf);
            } else if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else if !truncated {
                warn!(
                    offset = message_start,
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;

            if let Some(cb) = progress_callback {
                if current_offset - last_progress >= PROGRESS_INTERVAL {
                    cb(current_offset, self.file_size);
                    last_progress = current_offset;
                }
            }
        }

        if !saw_separator {
            return Err(PhishError::InvalidMbox(self.path.clone()));
        }

        // Flush last message
        if !message_buf.is_empty() && message_callback(message_start, &message_buf) {
            count += 1;
        }

        if let Some(cb) = progress_callback {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }

    /// Count messages without keeping them.
    pub fn count_messages(&self) -> Result<u64> {
        self.parse(&mut |_, _| true, None)
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_mbox(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn collect(parser: &MboxParser) -> Vec<Vec<u8>> {
        let mut messages = Vec::new();
        parser
            .parse(
                &mut |_, raw| {
                    messages.push(raw.to_vec());
                    true
                },
                None,
            )
            .unwrap();
        messages
    }

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(
            b"From user@example.com Thu Jan 01 00:00:00 2024\n"
        ));
        assert!(!is_mbox_separator(b"from user@example.com\n")); // lowercase
        assert!(!is_mbox_separator(b">From user@example.com\n")); // escaped
        assert!(!is_mbox_separator(b"Subject: From here\n"));
    }

    #[test]
    fn test_is_mbox_separator_with_bom() {
        let mut line = vec![0xEF, 0xBB, 0xBF];
        line.extend_from_slice(b"From user@example.com Thu Jan 01 00:00:00 2024\n");
        assert!(is_mbox_separator(&line));
    }

    #[test]
    fn test_is_blank_line() {
        assert!(is_blank_line(b"\n"));
        assert!(is_blank_line(b"\r\n"));
        assert!(is_blank_line(b"  \n"));
        assert!(!is_blank_line(b"hello\n"));
    }

    #[test]
    fn test_splits_messages() {
        let file = write_mbox(
            b"From a@x Thu Jan 01 00:00:00 2024\nSubject: one\n\nBody 1\n\n\
From b@x Thu Jan 01 00:00:00 2024\nSubject: two\n\n>From quoted line\n",
        );
        let parser = MboxParser::new(file.path()).unwrap();
        let messages = collect(&parser);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with(b"From a@x"));
        assert!(messages[1].ends_with(b">From quoted line\n"));
        assert_eq!(parser.count_messages().unwrap(), 2);
    }

    #[test]
    fn test_early_abort() {
        let file = write_mbox(b"From a\n\nx\n\nFrom b\n\ny\n");
        let parser = MboxParser::new(file.path()).unwrap();
        let count = parser.parse(&mut |_, _| false, None).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_truncates_oversized_message() {
        let file = write_mbox(b"From a\nSubject: big\n\n0123456789\n0123456789\n");
        let parser = MboxParser::new(file.path())
            .unwrap()
            .with_max_message_size(30);
        let messages = collect(&parser);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], b"From a\nSubject: big\n\n".to_vec());
    }

    #[test]
    fn test_empty_and_missing_files() {
        let empty = write_mbox(b"");
        assert_eq!(MboxParser::new(empty.path()).unwrap().count_messages().unwrap(), 0);

        let err = MboxParser::new("/nonexistent/archive.mbox").err().unwrap();
        assert!(matches!(err, PhishError::FileNotFound(_)));
    }

    #[test]
    fn test_not_an_mbox() {
        let file = write_mbox(b"Subject: bare message\n\nbody\n");
        let err = MboxParser::new(file.path()).unwrap().count_messages().unwrap_err();
        assert!(matches!(err, PhishError::InvalidMbox(_)));
    }
}
