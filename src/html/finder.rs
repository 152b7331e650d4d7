//! HTML structural analysis: tag logs and the signals derived from them.

use serde::Serialize;

use super::tokenizer::{html_to_tokens, HtmlToken};

/// Tags considered safe in mail clients. Any one of them marks content as HTML.
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "br", "big", "blockquote", "caption", "code", "del", "div", "dt", "dd", "font",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "li", "map", "ol", "p", "pre",
    "s", "small", "strong", "span", "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr", "u", "ul", "php", "html", "head", "body", "meta", "title", "style", "link", "abbr",
    "acronym", "address", "area", "bdo", "button", "center", "cite", "col", "colgroup", "dfn",
    "dir", "dl", "em", "fieldset", "form", "input", "kbd", "label", "legend", "menu", "optgroup",
    "option", "q", "samp", "select", "strike", "textarea", "tt", "var",
];

/// File extensions recognized as embedded images.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".apng", ".avif", ".gif", ".jpg", ".jpeg", ".jfif", ".pjpeg", ".pjp", ".png", ".svg", ".webp",
    ".bmp", ".ico", ".cur", ".tif", ".tiff",
];

/// Signals derived from one HTML fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralAnalysis {
    pub is_html: bool,
    pub is_js: bool,
    pub is_css: bool,
    pub images: Vec<String>,
}

/// Capability set the assembler needs from an HTML analyzer.
pub trait StructuralAnalyzer {
    /// Tokenize `html` and record its tags.
    fn feed(&mut self, html: &str);
    /// Derive the signals from everything recorded so far.
    fn analysis(&self) -> StructuralAnalysis;
    /// Forget every recorded tag.
    fn reset(&mut self);
}

type Attributes = Vec<(String, Option<String>)>;

/// Records opening and closing tags and answers questions about them.
///
/// Logs accumulate across [`feed`](Self::feed) calls. Use one instance per
/// message, or call [`reset`](Self::reset) in between.
#[derive(Debug, Clone, Default)]
pub struct HtmlFinder {
    start_tags: Vec<(String, Attributes)>,
    end_tags: Vec<String>,
}

impl HtmlFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an opening tag with its attributes.
    pub fn start_tag(&mut self, name: impl Into<String>, attributes: Attributes) {
        self.start_tags.push((name.into(), attributes));
    }

    /// Record a closing tag. Nesting is not validated.
    pub fn end_tag(&mut self, name: impl Into<String>) {
        self.end_tags.push(name.into());
    }

    pub fn start_tags(&self) -> impl Iterator<Item = &str> {
        self.start_tags.iter().map(|(name, _)| name.as_str())
    }

    pub fn end_tags(&self) -> &[String] {
        &self.end_tags
    }

    /// `true` if any recorded tag is in [`ALLOWED_TAGS`].
    pub fn contains_html(&self) -> bool {
        self.start_tags().any(|tag| ALLOWED_TAGS.contains(&tag))
    }

    /// `true` if any tag carries `type="<content_type>"`.
    pub fn contains_content_type(&self, content_type: &str) -> bool {
        self.start_tags
            .iter()
            .flat_map(|(_, attributes)| attributes)
            .any(|(name, value)| name == "type" && value.as_deref() == Some(content_type))
    }

    pub fn contains_js(&self) -> bool {
        self.contains_content_type("text/javascript")
    }

    pub fn contains_css(&self) -> bool {
        self.contains_content_type("text/css")
    }

    /// Image references from `img`/`source` tags, in tag then attribute order.
    pub fn images(&self) -> Vec<String> {
        self.start_tags
            .iter()
            .filter(|(tag, _)| tag == "img" || tag == "source")
            .flat_map(|(_, attributes)| attributes)
            .filter(|(name, _)| name == "src" || name == "srcset")
            .filter_map(|(_, value)| value.as_ref())
            .filter(|value| {
                let lower = value.to_lowercase();
                IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
            })
            .cloned()
            .collect()
    }
}

impl StructuralAnalyzer for HtmlFinder {
    fn feed(&mut self, html: &str) {
        for token in html_to_tokens(html) {
            match token {
                HtmlToken::StartTag {
                    name,
                    attributes,
                    is_self_closing,
                } => {
                    if is_self_closing {
                        self.start_tag(name.clone(), attributes);
                        self.end_tag(name);
                    } else {
                        self.start_tag(name, attributes);
                    }
                }
                HtmlToken::EndTag { name } => self.end_tag(name),
                HtmlToken::Comment { .. } | HtmlToken::Text { .. } => {}
            }
        }
    }

    fn analysis(&self) -> StructuralAnalysis {
        StructuralAnalysis {
            is_html: self.contains_html(),
            is_js: self.contains_js(),
            is_css: self.contains_css(),
            images: self.images(),
        }
    }

    fn reset(&mut self) {
        self.start_tags.clear();
        self.end_tags.clear();
    }
}
