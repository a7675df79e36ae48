//! Plain-text excerpts of message bodies for prompting.

use scraper::{ElementRef, Html, Node};

pub const DEFAULT_EXCERPT_CHARS: usize = 500;

const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "head", "title", "noscript"];

/// Elements whose boundaries separate words in rendered text.
const BLOCK_ELEMENTS: [&str; 26] = [
    "address", "article", "blockquote", "body", "br", "div", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "html", "li", "ol", "p", "pre", "section", "table", "td", "th", "tr",
    "ul",
];

/// Element names that make a `<name ...>` run count as a tag rather than prose.
const KNOWN_ELEMENTS: [&str; 48] = [
    "a", "abbr", "address", "article", "b", "blockquote", "body", "br", "center", "code", "div",
    "em", "font", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "i",
    "img", "li", "link", "meta", "noscript", "ol", "p", "pre", "script", "section", "small",
    "span", "strong", "style", "sub", "sup", "table", "tbody", "td", "th", "title", "tr", "u",
];

/// Strip markup from `raw`, collapse whitespace and truncate to `max_chars`.
///
/// Only input carrying a recognisable tag is walked as markup; anything else
/// is kept verbatim, entities included, so excerpting an excerpt is a no-op.
/// Never fails: markup that cannot be walked falls back to the raw text.
pub fn excerpt(raw: &str, max_chars: usize) -> String {
    let text = if looks_like_markup(raw) {
        std::panic::catch_unwind(|| markup_text(raw)).unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    };

    truncate_chars(&collapse_whitespace(&text), max_chars)
}

fn looks_like_markup(raw: &str) -> bool {
    raw.match_indices('<')
        .any(|(index, _)| is_tag_start(&raw[index + 1..]))
}

/// Whether `rest`, the text just after a `<`, opens a comment, a doctype or
/// a known element. Opening tags with attributes need at least one `=`, which
/// keeps `a<b and c>d` out.
fn is_tag_start(rest: &str) -> bool {
    if rest.starts_with("!--")
        || rest
            .get(..8)
            .is_some_and(|head| head.eq_ignore_ascii_case("!doctype"))
    {
        return true;
    }

    let (closing, rest) = match rest.strip_prefix('/') {
        Some(after) => (true, after),
        None => (false, rest),
    };
    let name_len = rest
        .find(|ch: char| !ch.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    if !KNOWN_ELEMENTS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
    {
        return false;
    }

    let after_name = &rest[name_len..];
    let Some(end) = after_name.find('>') else {
        return false;
    };
    let inner = &after_name[..end];
    if inner.contains('<') {
        return false;
    }

    let attributes = inner.trim().trim_end_matches('/').trim();
    if attributes.is_empty() {
        return inner.is_empty() || inner.starts_with(char::is_whitespace) || inner.starts_with('/');
    }
    !closing && inner.starts_with(char::is_whitespace) && attributes.contains('=')
}

fn markup_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut out = String::with_capacity(raw.len());
    push_element_text(fragment.root_element(), &mut out);
    out
}

fn push_element_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.iter().any(|skipped| *skipped == name) {
        return;
    }

    let block = BLOCK_ELEMENTS.iter().any(|block| *block == name);
    if block {
        out.push(' ');
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_element_text(child, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push(' ');
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}
