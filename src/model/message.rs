//! Structured message tree handed to the extraction engine.

/// A parsed message (or MIME part).
///
/// Headers keep their original order and raw (unfolded) values. Lookups are
/// case-insensitive and return the first occurrence.
///
/// Trees of any depth drop without recursion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// `(name, value)` pairs in the order they appear.
    pub headers: Vec<(String, String)>,
    /// Body of this message or part.
    pub payload: Payload,
}

/// Body of a [`RawMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A single body. Text parts are transfer- and charset-decoded; other
    /// parts keep the body as written in the message.
    Leaf(String),
    /// Sub-parts of a multipart container, or the embedded message of a
    /// `message/rfc822` part.
    Parts(Vec<RawMessage>),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Leaf(String::new())
    }
}

impl RawMessage {
    /// Build a single-part message.
    pub fn leaf(headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            headers,
            payload: Payload::Leaf(body.into()),
        }
    }

    /// Build a container message.
    pub fn multipart(headers: Vec<(String, String)>, parts: Vec<RawMessage>) -> Self {
        Self {
            headers,
            payload: Payload::Parts(parts),
        }
    }

    /// First value for a header name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the payload is a list of sub-messages.
    pub fn is_multipart(&self) -> bool {
        matches!(self.payload, Payload::Parts(_))
    }
}

impl Drop for RawMessage {
    fn drop(&mut self) {
        let Payload::Parts(parts) = &mut self.payload else {
            return;
        };
        let mut pending = std::mem::take(parts);
        while let Some(mut part) = pending.pop() {
            if let Payload::Parts(children) = &mut part.payload {
                pending.append(children);
            }
        }
    }
}

/// Shorthand for building header lists in tests and callers.
pub fn headers<const N: usize>(pairs: [(&str, &str); N]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
