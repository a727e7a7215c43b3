//! Block-level Markdown tokenizer on top of `pulldown-cmark`.
//!
//! The grouper only needs to know what kind of block each top-level region
//! of the document is, but the encoder must reproduce the document byte for
//! byte. The lexer therefore keeps the raw source of every block and hands
//! the whitespace between blocks to the preceding token, so that
//! concatenating `raw` and `trailing` of every token yields the input.
//!
//! # Example
//!
//! ```rust
//! use srcmd_core::lexer::{lex, TokenKind};
//!
//! let input = "# Title\n\nSome prose.\n";
//! let tokens = lex(input);
//! assert!(matches!(tokens[0].kind, TokenKind::Heading { level: 1 }));
//! assert_eq!(tokens[0].heading_text(), "Title");
//! assert_eq!(tokens.iter().map(|t| t.source_len()).sum::<usize>(), input.len());
//! ```

use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser as MdParser, Tag};

use crate::span::Span;

/// Destination of a paragraph made of a single link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub href: String,
    pub label: String,
}

/// Classification of a top-level block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// ATX or setext heading (levels 1-6).
    Heading { level: u8 },
    /// Fenced or indented code block with its literal content.
    Code { content: String },
    /// Paragraph; `link` is set when its only inline is one link.
    Paragraph { link: Option<LinkTarget> },
    /// Raw HTML block, including comments.
    Html,
    /// Whitespace at the very start of the document.
    Space,
    /// Lists, quotes, rules and any text no block covers.
    Other,
}

/// One top-level block and the whitespace that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The block's own source text.
    pub raw: &'a str,
    /// Whitespace between this block and the next one.
    pub trailing: &'a str,
    /// Byte span of `raw` in the input.
    pub span: Span,
}

impl<'a> Token<'a> {
    /// Check if this token carries no visible content.
    #[inline]
    pub fn is_blank(&self) -> bool {
        matches!(self.kind, TokenKind::Space) || self.raw.trim().is_empty()
    }

    /// Check if this token is a code block.
    #[inline]
    pub fn is_code(&self) -> bool {
        matches!(self.kind, TokenKind::Code { .. })
    }

    /// Number of input bytes this token accounts for.
    #[inline]
    pub fn source_len(&self) -> usize {
        self.raw.len() + self.trailing.len()
    }

    /// Heading text without `#` markers or a setext underline.
    ///
    /// Inline markup is kept verbatim so that it re-encodes unchanged.
    pub fn heading_text(&self) -> &'a str {
        let line = self.raw.trim();
        if !line.starts_with('#') {
            return match line.rsplit_once('\n') {
                Some((text, _underline)) => text.trim(),
                None => line,
            };
        }

        let rest = line.trim_start_matches('#').trim();
        let without_closing = rest.trim_end_matches('#');
        if without_closing.len() < rest.len()
            && (without_closing.is_empty() || without_closing.ends_with(' '))
        {
            without_closing.trim_end()
        } else {
            rest
        }
    }
}

/// Tokenize a Markdown document into top-level blocks.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer {
        input,
        tokens: Vec::with_capacity(32),
        cursor: 0,
    };

    let mut depth = 0usize;
    let mut pending: Option<PendingBlock> = None;

    for (event, range) in MdParser::new_ext(input, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    pending = Some(PendingBlock::open(&tag, range));
                } else if let Some(block) = pending.as_mut() {
                    block.enter(&tag, depth);
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(mut block) = pending.take() {
                        block.range.end = block.range.end.max(range.end);
                        lexer.push_block(block.finish());
                    }
                }
            }
            Event::Html(_) if depth == 0 => lexer.push_block((TokenKind::Html, range)),
            _ if depth == 0 => lexer.push_block((TokenKind::Other, range)),
            other => {
                if let Some(block) = pending.as_mut() {
                    block.leaf(other, depth);
                }
            }
        }
    }

    lexer.absorb_gap(input.len());
    lexer.tokens
}

struct Lexer<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    /// End of the input already covered by tokens.
    cursor: usize,
}

impl<'a> Lexer<'a> {
    fn push_block(&mut self, (kind, range): (TokenKind, Range<usize>)) {
        let start = range.start.max(self.cursor);
        let end = range.end.max(start);
        self.absorb_gap(start);
        self.tokens.push(Token {
            kind,
            raw: &self.input[start..end],
            trailing: "",
            span: Span::from_range(start..end),
        });
        self.cursor = end;
    }

    /// Account for input between the last token and `until`.
    fn absorb_gap(&mut self, until: usize) {
        if until <= self.cursor {
            return;
        }
        let gap = &self.input[self.cursor..until];
        let span = Span::from_range(self.cursor..until);
        self.cursor = until;

        if !gap.trim().is_empty() {
            // Text no block claimed, e.g. link reference definitions.
            self.tokens.push(Token {
                kind: TokenKind::Other,
                raw: gap,
                trailing: "",
                span,
            });
            return;
        }

        match self.tokens.last_mut() {
            Some(last) if last.trailing.is_empty() => last.trailing = gap,
            Some(last) => {
                let start = last.span.end as usize;
                last.trailing = &self.input[start..until];
            }
            None => self.tokens.push(Token {
                kind: TokenKind::Space,
                raw: gap,
                trailing: "",
                span,
            }),
        }
    }
}

/// A top-level block whose end event has not been seen yet.
struct PendingBlock {
    kind: PendingKind,
    range: Range<usize>,
}

enum PendingKind {
    Heading(u8),
    Code(String),
    Paragraph {
        inlines: usize,
        link: Option<LinkTarget>,
    },
    Html,
    Other,
}

impl PendingBlock {
    fn open(tag: &Tag<'_>, range: Range<usize>) -> Self {
        let kind = match tag {
            Tag::Heading { level, .. } => PendingKind::Heading(*level as u8),
            Tag::CodeBlock(_) => PendingKind::Code(String::new()),
            Tag::Paragraph => PendingKind::Paragraph {
                inlines: 0,
                link: None,
            },
            Tag::HtmlBlock => PendingKind::Html,
            _ => PendingKind::Other,
        };
        Self { kind, range }
    }

    /// A nested start event at `depth` (1 = direct child of the block).
    fn enter(&mut self, tag: &Tag<'_>, depth: usize) {
        if let PendingKind::Paragraph { inlines, link } = &mut self.kind {
            if depth == 1 {
                *inlines += 1;
                if let Tag::Link { dest_url, .. } = tag {
                    *link = Some(LinkTarget {
                        href: dest_url.to_string(),
                        label: String::new(),
                    });
                }
            }
        }
    }

    fn leaf(&mut self, event: Event<'_>, depth: usize) {
        match &mut self.kind {
            PendingKind::Code(content) => {
                if let Event::Text(text) = event {
                    content.push_str(&text);
                }
            }
            PendingKind::Paragraph { inlines, link } => {
                if depth == 1 {
                    *inlines += 1;
                } else if let (Some(link), Event::Text(text) | Event::Code(text)) = (link, event)
                {
                    link.label.push_str(&text);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> (TokenKind, Range<usize>) {
        let kind = match self.kind {
            PendingKind::Heading(level) => TokenKind::Heading { level },
            PendingKind::Code(content) => TokenKind::Code { content },
            PendingKind::Paragraph { inlines, link } => TokenKind::Paragraph {
                link: if inlines == 1 { link } else { None },
            },
            PendingKind::Html => TokenKind::Html,
            PendingKind::Other => TokenKind::Other,
        };
        (kind, self.range)
    }
}
