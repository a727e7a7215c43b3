//! Grouping of lexer tokens into structural units.
//!
//! A single left-to-right pass with one slot of lookbehind (the previous
//! group). Grouping never fails: every token stream has a grouping, and it
//! is the validator's job to decide whether that grouping is a notebook.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer::{LinkTarget, Token, TokenKind};
use crate::span::Span;

/// Heading level reserved for the notebook title.
pub const TITLE_LEVEL: u8 = 1;
/// Heading level reserved for file names.
pub const FILENAME_LEVEL: u8 = 6;

static COLLAPSIBLE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<details( open)?>\s*<summary>([^<]+)</summary>$").expect("valid regex")
});

const COLLAPSIBLE_CLOSE: &str = "</details>";

/// How a filename was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameStyle {
    /// `###### name`
    Heading,
    /// `<details [open]><summary>name</summary>`
    Collapsible { open: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameGroup<'a> {
    pub filename: &'a str,
    pub style: FilenameStyle,
    /// Source of the marker, used in diagnostics.
    pub raw: &'a str,
    pub span: Span,
}

/// Decode-time classification of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Group<'a> {
    Title(Token<'a>),
    Filename(FilenameGroup<'a>),
    Code(Token<'a>),
    /// A file link standing in for an inlined code block.
    LinkedCode(LinkTarget),
    Markdown(Vec<Token<'a>>),
}

impl<'a> Group<'a> {
    /// Check if this is a markdown run with no visible content.
    pub fn is_blank(&self) -> bool {
        match self {
            Group::Markdown(tokens) => tokens.iter().all(Token::is_blank),
            _ => false,
        }
    }
}

/// Group a token stream.
pub fn group_tokens<'a>(tokens: Vec<Token<'a>>) -> Vec<Group<'a>> {
    let mut grouper = Grouper {
        groups: Vec::with_capacity(tokens.len()),
        open_collapsible: false,
    };
    for token in tokens {
        grouper.push(token);
    }
    grouper.groups
}

struct Grouper<'a> {
    groups: Vec<Group<'a>>,
    /// A collapsible filename was paired and its `</details>` is still due.
    open_collapsible: bool,
}

impl<'a> Grouper<'a> {
    fn push(&mut self, token: Token<'a>) {
        let after_filename = matches!(self.groups.last(), Some(Group::Filename(_)));

        match &token.kind {
            TokenKind::Heading { level: TITLE_LEVEL } => {
                self.open_collapsible = false;
                self.groups.push(Group::Title(token));
            }
            TokenKind::Heading {
                level: FILENAME_LEVEL,
            } => {
                self.open_collapsible = false;
                self.groups.push(Group::Filename(FilenameGroup {
                    filename: token.heading_text(),
                    style: FilenameStyle::Heading,
                    raw: token.raw.trim(),
                    span: token.span,
                }));
            }
            TokenKind::Code { .. } if after_filename => {
                self.open_collapsible = self.last_filename_is_collapsible();
                self.groups.push(Group::Code(token));
            }
            TokenKind::Paragraph { link: Some(link) } if after_filename => {
                self.open_collapsible = self.last_filename_is_collapsible();
                self.groups.push(Group::LinkedCode(link.clone()));
            }
            TokenKind::Html => {
                let html = token.raw.trim();
                if let Some(filename) = collapsible_filename(&token) {
                    self.open_collapsible = false;
                    self.groups.push(Group::Filename(filename));
                } else if self.open_collapsible && html == COLLAPSIBLE_CLOSE {
                    tracing::trace!(span = ?token.span, "absorbed collapsible block close");
                    self.open_collapsible = false;
                } else {
                    self.push_markdown(token);
                }
            }
            _ => self.push_markdown(token),
        }
    }

    fn last_filename_is_collapsible(&self) -> bool {
        matches!(
            self.groups.last(),
            Some(Group::Filename(FilenameGroup {
                style: FilenameStyle::Collapsible { .. },
                ..
            }))
        )
    }

    fn push_markdown(&mut self, token: Token<'a>) {
        self.open_collapsible = false;
        match self.groups.last_mut() {
            Some(Group::Markdown(tokens)) => tokens.push(token),
            _ => self.groups.push(Group::Markdown(vec![token])),
        }
    }
}

fn collapsible_filename<'a>(token: &Token<'a>) -> Option<FilenameGroup<'a>> {
    let raw = token.raw.trim();
    let captures = COLLAPSIBLE_OPEN.captures(raw)?;
    let filename = captures.get(2)?.as_str().trim();
    Some(FilenameGroup {
        filename,
        style: FilenameStyle::Collapsible {
            open: captures.get(1).is_some(),
        },
        raw,
        span: token.span,
    })
}
