//! Byte ranges into decoded source text.
//!
//! Lexer tokens and grammar errors carry a `Span` so callers can point back
//! at the offending part of a notebook.

use std::ops::Range;

/// A half-open byte range `[start, end)` in the source text.
///
/// # Example
///
/// ```rust
/// use srcmd_core::span::Span;
///
/// let span = Span::new(4, 10);
/// assert_eq!(span.len(), 6);
/// assert_eq!(span.slice("abc\n# Title"), "# Titl");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Starting byte offset (inclusive).
    pub start: u32,
    /// Ending byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Build a span from a `usize` range as produced by `pulldown-cmark`.
    #[inline]
    pub fn from_range(range: Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if this span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Borrow the text this span covers.
    ///
    /// Spans produced by the lexer always sit on UTF-8 boundaries of the
    /// text they were produced from.
    #[inline]
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start as usize..self.end as usize]
    }
}
