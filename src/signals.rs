//! Phishing signal matchers: IP addresses and URLs in text and HTML.
//!
//! Everything here is a pure function over strings. [`PhishyMatcher`] bundles
//! them behind the [`SignalMatcher`] trait so the assembler can hold one.

use std::net::IpAddr;
use std::sync::LazyLock;

use linkify::{LinkFinder, LinkKind};
use regex::Regex;

use crate::html::tokenizer::{html_to_tokens, HtmlToken};

/// Liberal URL pattern: `scheme:` / `www.` / `domain.tld/` prefixes followed
/// by anything that is not whitespace or angle brackets, with balanced
/// parentheses and no trailing punctuation.
pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?i)\b(?:[a-z][\w\-]+:(?:/{1,3}|[a-z0-9%])|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)"#,
        r#"(?:[^\s()<>]|\((?:[^\s()<>]|(?:\([^\s()<>]+\)))*\))+"#,
        r#"(?:\((?:[^\s()<>]|(?:\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’])"#,
    ))
    .expect("valid URL regex")
});

/// IPv4 dotted quads and IPv6 literals (full, compressed, zoned, v4-embedded).
pub static IP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    const IPV4: &str = r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";
    const IPV6: &str = concat!(
        r"(?:(?:[0-9a-fA-F]{1,4}:){7,7}[0-9a-fA-F]{1,4}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,7}:",
        r"|(?:[0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,5}(?::[0-9a-fA-F]{1,4}){1,2}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,4}(?::[0-9a-fA-F]{1,4}){1,3}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,3}(?::[0-9a-fA-F]{1,4}){1,4}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,2}(?::[0-9a-fA-F]{1,4}){1,5}",
        r"|[0-9a-fA-F]{1,4}:(?:(?::[0-9a-fA-F]{1,4}){1,6})",
        r"|:(?:(?::[0-9a-fA-F]{1,4}){1,7}|:)",
        r"|fe80:(?::[0-9a-fA-F]{0,4}){0,4}%[0-9a-zA-Z]{1,}",
        r"|::(?:ffff(?::0{1,4}){0,1}:){0,1}(?:(?:25[0-5]|(?:2[0-4]|1{0,1}[0-9]){0,1}[0-9])\.){3,3}(?:25[0-5]|(?:2[0-4]|1{0,1}[0-9]){0,1}[0-9])",
        r"|(?:[0-9a-fA-F]{1,4}:){1,4}:(?:(?:25[0-5]|(?:2[0-4]|1{0,1}[0-9]){0,1}[0-9])\.){3,3}(?:25[0-5]|(?:2[0-4]|1{0,1}[0-9]){0,1}[0-9]))",
    );
    Regex::new(&format!("(?i){IPV4}|{IPV6}")).expect("valid IP regex")
});

static MESSAGE_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("valid tag regex"));

/// Attributes that may carry a URL, in the order they are scanned.
pub const URL_ATTRIBUTES: [&str; 19] = [
    "action",
    "archive",
    "background",
    "cite",
    "classid",
    "codebase",
    "data",
    "dsync",
    "dynsrc",
    "formaction",
    "href",
    "icon",
    "longdesc",
    "lowsrc",
    "manifest",
    "poster",
    "profile",
    "src",
    "usemap",
];

/// Smallest IPv4 address value kept by [`is_valid_ip`].
///
/// Borrowed from the IPv4 minimum reassembly size; it only rejects
/// degenerate near-zero matches and says nothing about address validity.
pub const IPV4_FLOOR: u32 = 576;

/// Smallest IPv6 address value kept by [`is_valid_ip`] (IPv6 minimum MTU).
pub const IPV6_FLOOR: u128 = 1280;

/// Operations the assembler needs from a signal matcher.
pub trait SignalMatcher {
    fn find_ips(&self, text: &str) -> Vec<String>;
    fn extract_urls_from_text(&self, text: &str) -> Vec<String>;
    fn extract_urls_from_html(&self, html: &str) -> Vec<String>;
}

/// Default matcher backed by the free functions of this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhishyMatcher;

impl SignalMatcher for PhishyMatcher {
    fn find_ips(&self, text: &str) -> Vec<String> {
        find_ips(text)
    }

    fn extract_urls_from_text(&self, text: &str) -> Vec<String> {
        extract_urls_from_text(text)
    }

    fn extract_urls_from_html(&self, html: &str) -> Vec<String> {
        extract_urls_from_html(html)
    }
}

/// Find plausible IP addresses in `text`, in order of appearance.
pub fn find_ips(text: &str) -> Vec<String> {
    let text = clean_text(text);
    IP_REGEX
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|ip| is_valid_ip(ip))
        .map(String::from)
        .collect()
}

/// Find URLs in plain text, in order of appearance, duplicates included.
pub fn extract_urls_from_text(text: &str) -> Vec<String> {
    let text = clean_message_tags(&clean_text(text));

    if text.contains(char::REPLACEMENT_CHARACTER) {
        // Lossily decoded input: the link finder's domain heuristics misfire
        // on replacement characters, the pattern does not care.
        return URL_REGEX
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .filter(|url| !url.is_empty())
            .collect();
    }

    let mut finder = LinkFinder::new();
    finder.url_must_have_scheme(false);
    finder.kinds(&[LinkKind::Url]);
    finder
        .links(&text)
        .map(|link| link.as_str().to_string())
        .collect()
}

/// Extract URLs from URL-bearing attributes of an HTML fragment.
///
/// Attributes are visited in [`URL_ATTRIBUTES`] order and tags in document
/// order within each attribute. Fragment links (`#...`) are skipped; values
/// of attributes other than `href` must look like a URL.
pub fn extract_urls_from_html(html: &str) -> Vec<String> {
    let tokens = html_to_tokens(&clean_text(html));
    let mut urls = Vec::new();

    for attribute in URL_ATTRIBUTES {
        for token in &tokens {
            let HtmlToken::StartTag { attributes, .. } = token else {
                continue;
            };
            // Duplicate attributes: the last one wins
            let Some(value) = attributes
                .iter()
                .rev()
                .find(|(name, _)| name == attribute)
                .map(|(_, value)| value.as_deref().unwrap_or(""))
            else {
                continue;
            };
            if value.starts_with('#') {
                continue;
            }
            let url = clean_html(value);
            if attribute == "href" || matches_url_at_start(url) {
                urls.push(url.to_string());
            }
        }
    }

    urls
}

fn matches_url_at_start(value: &str) -> bool {
    URL_REGEX.find(value).is_some_and(|m| m.start() == 0)
}

/// Strip a leading quoted-printable `3D` artifact and surrounding quotes.
pub fn clean_html(value: &str) -> &str {
    value
        .strip_prefix("3D")
        .unwrap_or(value)
        .trim_matches('"')
}

/// Collapse every whitespace run into a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove whitespace inside `<...>` spans.
pub fn clean_message_tags(text: &str) -> String {
    MESSAGE_TAG_REGEX
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps[0]
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
        })
        .into_owned()
}

/// Whether `ip` parses as an IPv4/IPv6 address above the size floors.
pub fn is_valid_ip(ip: &str) -> bool {
    // Scoped IPv6 literals (`fe80::1%eth0`): the zone does not change the value
    let address = ip.split_once('%').map_or(ip, |(addr, _)| addr);
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => u32::from(v4) >= IPV4_FLOOR,
        Ok(IpAddr::V6(v6)) => u128::from(v6) >= IPV6_FLOOR,
        Err(_) => false,
    }
}
