use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};

pub const NO_SUBJECT: &str = "No Subject";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftFormat {
    #[default]
    Text,
    Html,
}

impl DraftFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Html => "HTML",
        }
    }
}

/// Subject used for filing and replies; blank subjects get a placeholder.
pub fn effective_subject(subject: &str) -> &str {
    let trimmed = subject.trim();
    if trimmed.is_empty() { NO_SUBJECT } else { trimmed }
}

pub fn reply_subject(subject: &str) -> String {
    format!("Re: {}", effective_subject(subject))
}

pub fn render_draft_body(generated: &str, format: DraftFormat) -> String {
    match format {
        DraftFormat::Text => generated.trim().to_string(),
        DraftFormat::Html => markdown_to_html(generated.trim()),
    }
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut body = String::new();
    html::push_html(&mut body, parser);

    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n</head>\n<body>\n<div class=\"email-body\">\n{body}</div>\n</body>\n</html>\n"
    )
}
