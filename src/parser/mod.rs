//! Email parsing: MBOX streaming parser, EML parser, header decoding, and MIME structure.

pub mod eml;
pub mod header;
pub mod mbox;
pub mod mime;

pub use header::decode_encoded_words as decode_mime_words;
pub use mime::parse_raw_message;
