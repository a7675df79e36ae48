//! Prompt templates with named, load-time validated placeholders.
//!
//! Templates use `{name}` slots; `{{` and `}}` produce literal braces. The
//! only names a template may reference are the fields of [`PromptVars`], so
//! a template that parses is always renderable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Placeholder {
    Subject,
    Sender,
    Body,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [Self::Subject, Self::Sender, Self::Body];

    pub fn name(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Sender => "sender",
            Self::Body => "body",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

/// Message fields available to a template at render time.
#[derive(Debug, Clone, Copy)]
pub struct PromptVars<'a> {
    pub subject: &'a str,
    pub sender: &'a str,
    pub body: &'a str,
}

impl PromptVars<'_> {
    fn get(&self, slot: Placeholder) -> &str {
        match slot {
            Placeholder::Subject => self.subject,
            Placeholder::Sender => self.sender,
            Placeholder::Body => self.body,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> AppResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            match ch {
                '{' if chars.peek().is_some_and(|(_, next)| *next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|(_, next)| *next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &source[index + 1..];
                    let Some(close) = rest.find('}') else {
                        return Err(AppError::Template(format!(
                            "unclosed `{{` at offset {index} in template `{}`",
                            preview(source)
                        )));
                    };

                    let name = rest[..close].trim();
                    let slot = Placeholder::from_name(name).ok_or_else(|| {
                        AppError::Template(format!(
                            "unknown placeholder `{{{name}}}` in template `{}`; expected one of {}",
                            preview(source),
                            known_names()
                        ))
                    })?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));

                    for _ in 0..rest[..=close].chars().count() {
                        chars.next();
                    }
                }
                '}' => {
                    return Err(AppError::Template(format!(
                        "unmatched `}}` at offset {index} in template `{}`",
                        preview(source)
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, vars: &PromptVars<'_>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(vars.get(*slot)),
            }
        }
        out
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for PromptTemplate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for PromptTemplate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::parse(&source).map_err(serde::de::Error::custom)
    }
}

/// A system/user template pair for one completion request.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub system: PromptTemplate,
    pub user: PromptTemplate,
}

impl PromptSpec {
    pub fn new(system: &str, user: &str) -> AppResult<Self> {
        Ok(Self {
            system: PromptTemplate::parse(system)?,
            user: PromptTemplate::parse(user)?,
        })
    }

    pub fn render(&self, vars: &PromptVars<'_>) -> RenderedPrompt {
        RenderedPrompt {
            system: self.system.render(vars),
            user: self.user.render(vars),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

fn known_names() -> String {
    Placeholder::ALL
        .iter()
        .map(|slot| format!("{{{}}}", slot.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn preview(source: &str) -> String {
    let first_line = source.lines().next().unwrap_or_default();
    if first_line.chars().count() <= 40 {
        return first_line.to_string();
    }
    let cut = first_line.chars().take(40).collect::<String>();
    format!("{cut}...")
}
