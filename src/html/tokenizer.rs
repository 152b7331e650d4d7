//! Permissive HTML tokenizer.
//!
//! Never fails: anything that does not look like markup is text. Tag and
//! attribute names are lowercased, attribute values are entity-decoded.
//! `script` and `style` contents are raw text, so markup inside them does not
//! produce tags.

use std::borrow::Cow;

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum HtmlToken {
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        is_self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Comment {
        text: String,
    },
    Text {
        text: String,
    },
}

/// Split an HTML fragment into tokens in document order.
pub fn html_to_tokens(input: &str) -> Vec<HtmlToken> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let tag_start = pos;
        match bytes.get(pos + 1) {
            Some(b'!') if bytes[pos..].starts_with(b"<!--") => {
                push_text(&mut tokens, &input[text_start..tag_start]);
                let (text, end) = match input[pos + 4..].find("-->") {
                    Some(offset) => (&input[pos + 4..pos + 4 + offset], pos + 4 + offset + 3),
                    None => (&input[pos + 4..], bytes.len()),
                };
                tokens.push(HtmlToken::Comment {
                    text: text.trim().to_string(),
                });
                pos = end;
                text_start = pos;
            }
            Some(b'!') | Some(b'?') => {
                // Doctype, CDATA marker or processing instruction
                push_text(&mut tokens, &input[text_start..tag_start]);
                pos = skip_past(bytes, pos, b'>');
                text_start = pos;
            }
            Some(b'/') if bytes.get(pos + 2).is_some_and(|b| b.is_ascii_alphabetic()) => {
                push_text(&mut tokens, &input[text_start..tag_start]);
                let name_end = scan_name(bytes, pos + 2);
                tokens.push(HtmlToken::EndTag {
                    name: input[pos + 2..name_end].to_ascii_lowercase(),
                });
                pos = skip_past(bytes, name_end, b'>');
                text_start = pos;
            }
            Some(b) if b.is_ascii_alphabetic() => {
                push_text(&mut tokens, &input[text_start..tag_start]);
                let (token, end) = parse_start_tag(input, pos + 1);
                pos = end;

                let raw_text_close: Option<&[u8]> = match &token {
                    HtmlToken::StartTag {
                        name,
                        is_self_closing: false,
                        ..
                    } => match name.as_str() {
                        "script" => Some(b"</script".as_slice()),
                        "style" => Some(b"</style".as_slice()),
                        _ => None,
                    },
                    _ => None,
                };
                tokens.push(token);

                if let Some(close) = raw_text_close {
                    let raw_end = find_ignore_ascii_case(&bytes[pos..], close)
                        .map_or(bytes.len(), |offset| pos + offset);
                    if raw_end > pos {
                        tokens.push(HtmlToken::Text {
                            text: input[pos..raw_end].to_string(),
                        });
                    }
                    pos = raw_end;
                }
                text_start = pos;
            }
            _ => {
                pos += 1;
            }
        }
    }

    push_text(&mut tokens, &input[text_start.min(bytes.len())..]);
    tokens
}

/// Offset of the first ASCII case-insensitive occurrence of `needle`.
fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Parse a start tag whose name begins at `pos`. Returns the token and the
/// position right after the closing `>`.
fn parse_start_tag(input: &str, mut pos: usize) -> (HtmlToken, usize) {
    let bytes = input.as_bytes();
    let name_end = scan_name(bytes, pos);
    let name = input[pos..name_end].to_ascii_lowercase();
    pos = name_end;

    let mut attributes = Vec::new();
    let mut is_self_closing = false;

    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            if bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'>') {
                is_self_closing = true;
            }
            pos += 1;
        }
        match bytes.get(pos) {
            None => break,
            Some(b'>') => {
                pos += 1;
                break;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < bytes.len() && !matches!(bytes[pos], b'=' | b'>' | b'/') {
            if bytes[pos].is_ascii_whitespace() {
                break;
            }
            pos += 1;
        }
        if pos == attr_start {
            // Stray '='
            pos += 1;
            continue;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();

        let mut lookahead = pos;
        while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
            lookahead += 1;
        }
        if bytes.get(lookahead) != Some(&b'=') {
            attributes.push((attr_name, None));
            continue;
        }

        pos = lookahead;
        while pos < bytes.len() && (bytes[pos] == b'=' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }

        let value = match bytes.get(pos) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value_start = pos + 1;
                let value_end = input[value_start..]
                    .find(quote as char)
                    .map_or(bytes.len(), |offset| value_start + offset);
                pos = (value_end + 1).min(bytes.len());
                &input[value_start..value_end]
            }
            _ => {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                {
                    pos += 1;
                }
                &input[value_start..pos]
            }
        };

        attributes.push((attr_name, Some(decode_entities(value).into_owned())));
    }

    (
        HtmlToken::StartTag {
            name,
            attributes,
            is_self_closing,
        },
        pos,
    )
}

fn scan_name(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && !matches!(bytes[pos], b'/' | b'>')
    {
        pos += 1;
    }
    pos
}

fn skip_past(bytes: &[u8], pos: usize, needle: u8) -> usize {
    bytes[pos..]
        .iter()
        .position(|&b| b == needle)
        .map_or(bytes.len(), |offset| pos + offset + 1)
}

fn push_text(tokens: &mut Vec<HtmlToken>, text: &str) {
    if !text.is_empty() {
        tokens.push(HtmlToken::Text {
            text: decode_entities(text).into_owned(),
        });
    }
}

/// Decode named and numeric character references. Unknown entities are kept.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(start) = remaining.find('&') {
        result.push_str(&remaining[..start]);
        let after = &remaining[start + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end > 0 && end <= 10)
            .and_then(|end| decode_entity(&after[..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                result.push(ch);
                remaining = &after[end + 1..];
            }
            None => {
                result.push('&');
                remaining = after;
            }
        }
    }

    result.push_str(remaining);
    Cow::Owned(result)
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let ch = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "euro" => '€',
        "pound" => '£',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "bull" => '•',
        "middot" => '·',
        "zwnj" => '\u{200C}',
        "shy" => '\u{00AD}',
        _ => return None,
    };
    Some(ch)
}
