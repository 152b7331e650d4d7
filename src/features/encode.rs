//! Scalar encoders turning field-set values into numbers.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));

/// `1` when the message carries a non-empty `X-Virus-Scanned` header.
pub fn enumerate_virus_scanned(value: &str) -> u8 {
    u8::from(!value.is_empty())
}

/// First run of digits in `X-Priority` (`"1 (Highest)"` → 1), `0` when absent.
pub fn enumerate_priority(value: &str) -> u64 {
    DIGITS_REGEX
        .find(value)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Fixed code for a `Content-Transfer-Encoding` name, case-insensitive.
///
/// | encoding | code |
/// |---|---|
/// | `NA` / unknown | 0 |
/// | `base64` | 1 |
/// | `quoted-printable` | 2 |
/// | `8bit` | 3 |
/// | `7bit` | 4 |
/// | `binary` | 5 |
pub fn enumerate_encoding(value: &str) -> u8 {
    match value.to_lowercase().as_str() {
        "base64" => 1,
        "quoted-printable" => 2,
        "8bit" => 3,
        "7bit" => 4,
        "binary" => 5,
        _ => 0,
    }
}

pub fn enumerate_bool(value: bool) -> u8 {
    u8::from(value)
}

/// Length of `text` in characters.
pub fn message_length(text: &str) -> usize {
    text.chars().count()
}

/// Structural ratios over a message's URLs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UrlCharacteristics {
    /// Fraction of URLs starting with `https` (case-insensitive).
    pub secure_ratio: f64,
    /// Fraction of URLs containing non-ASCII characters.
    pub unicode_ratio: f64,
    /// Mean length in characters.
    pub avg_length: f64,
    /// Mean number of `/`-separated segments after the first `://`.
    pub avg_levels: f64,
}

impl UrlCharacteristics {
    /// Values reported for a message without URLs.
    pub const EMPTY: Self = Self {
        secure_ratio: 1.0,
        unicode_ratio: 1.0,
        avg_length: 0.0,
        avg_levels: 0.0,
    };

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (
            self.secure_ratio,
            self.unicode_ratio,
            self.avg_length,
            self.avg_levels,
        )
    }
}

pub fn url_characteristics(urls: &[String]) -> UrlCharacteristics {
    if urls.is_empty() {
        return UrlCharacteristics::EMPTY;
    }

    let (mut secure, mut unicode, mut length, mut levels) = (0usize, 0usize, 0usize, 0usize);
    for url in urls {
        if url.to_lowercase().starts_with("https") {
            secure += 1;
        }
        if !url.is_ascii() {
            unicode += 1;
        }
        length += message_length(url);
        levels += url_levels(url);
    }

    let n = urls.len() as f64;
    UrlCharacteristics {
        secure_ratio: secure as f64 / n,
        unicode_ratio: unicode as f64 / n,
        avg_length: length as f64 / n,
        avg_levels: levels as f64 / n,
    }
}

/// Number of `/`-separated segments after the first `://`. Without a scheme
/// separator the first two characters are skipped instead.
fn url_levels(url: &str) -> usize {
    let path = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url.char_indices().nth(2).map_or("", |(i, _)| &url[i..]),
    };
    path.split('/').count()
}
