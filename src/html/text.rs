//! Visible text of an HTML body.

use super::tokenizer::{html_to_tokens, HtmlToken};

/// Elements whose text is never rendered as body content.
const HIDDEN_ELEMENTS: &[&str] = &["head", "title", "script", "style"];

/// Extract the human-readable text of an HTML fragment.
///
/// Every text node outside `head`, `title`, `script` and `style` is trimmed,
/// empty nodes are dropped and the rest joined with a single space. Returns
/// an empty string when the fragment has no visible text.
pub fn body_text(html: &str) -> String {
    let mut hidden_depth: usize = 0;
    let mut pieces: Vec<String> = Vec::new();

    for token in html_to_tokens(html) {
        match token {
            HtmlToken::StartTag {
                name,
                is_self_closing: false,
                ..
            } if HIDDEN_ELEMENTS.contains(&name.as_str()) => hidden_depth += 1,
            HtmlToken::EndTag { name } if HIDDEN_ELEMENTS.contains(&name.as_str()) => {
                hidden_depth = hidden_depth.saturating_sub(1);
            }
            HtmlToken::Text { text } if hidden_depth == 0 => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed.to_string());
                }
            }
            _ => {}
        }
    }

    pieces.join(" ")
}
