//! Incremental parser for tagged LLM output.
//!
//! Model responses describe plans and files with XML-like markup:
//!
//! ```text
//! <plan>
//!   <action type="file">
//!     <description><![CDATA[Add a greeting]]></description>
//!     <file filename="index.tsx"><![CDATA[console.log("hi");]]></file>
//!   </action>
//! </plan>
//! ```
//!
//! The response arrives in chunks of arbitrary size. [`TagParser`] buffers
//! only what it has not consumed yet and reports each tag to its
//! [`TagSink`] the moment the tag's closing marker arrives, children before
//! parents.
//!
//! The grammar is deliberately narrow: attributes must be double-quoted and
//! cannot contain `"`; there are no entities and no escaping outside CDATA.
//!
//! # Example
//!
//! ```rust
//! use srcmd_core::tags::{Tag, TagParser};
//!
//! let mut names = Vec::new();
//! let mut parser = TagParser::new(|tag: &Tag| names.push(tag.name.clone()));
//! for chunk in ["<a><b x=\"1\"><![CDATA[hi]", "]></b>", "</a>"] {
//!     parser.parse(chunk);
//! }
//! assert!(parser.finish().is_ok());
//! assert_eq!(names, ["b", "a"]);
//! ```

use std::collections::BTreeMap;

use memchr::{memchr, memmem};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{TagError, TagErrors};

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w:.-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));

/// A parsed element.
///
/// Once handed to a sink a tag is complete: its content and children never
/// change again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Tag {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub content: String,
    pub children: Vec<Tag>,
}

impl Tag {
    /// Create an empty tag named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Tag> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All direct children named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Receiver of completed tags.
pub trait TagSink {
    fn on_tag(&mut self, tag: &Tag);
}

impl<F: FnMut(&Tag)> TagSink for F {
    fn on_tag(&mut self, tag: &Tag) {
        self(tag)
    }
}

/// Push-based tag parser.
///
/// Not reentrant: a sink must not feed the parser that is calling it.
pub struct TagParser<S> {
    sink: S,
    /// Input received but not consumed yet.
    buffer: String,
    /// Offset in `buffer` before which the current search already failed.
    scan_from: usize,
    /// Open tags, innermost last.
    stack: Vec<Tag>,
    in_cdata: bool,
    errors: TagErrors,
}

impl<S: TagSink> TagParser<S> {
    /// Create a parser that reports completed tags to `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: String::new(),
            scan_from: 0,
            stack: Vec::new(),
            in_cdata: false,
            errors: TagErrors::new(),
        }
    }

    /// Feed the next chunk of input.
    ///
    /// Runs until the buffered input is exhausted or ends in the middle of a
    /// construct, reporting every tag that closes along the way.
    pub fn parse(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        while self.step() {}
    }

    /// Errors recorded so far (mismatched closing markers).
    pub fn errors(&self) -> &TagErrors {
        &self.errors
    }

    /// Names of the tags currently open, outermost first.
    pub fn open_tags(&self) -> impl Iterator<Item = &str> {
        self.stack.iter().map(|tag| tag.name.as_str())
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// End the stream.
    ///
    /// Succeeds only if every tag was closed, every closing marker matched,
    /// and no CDATA section or marker was left open.
    pub fn finish(self) -> Result<S, TagErrors> {
        let Self {
            sink,
            buffer,
            stack,
            in_cdata,
            mut errors,
            ..
        } = self;

        if in_cdata {
            errors.push(TagError::UnterminatedCdata {
                tag: stack.last().map(|tag| tag.name.clone()),
            });
        } else if let Some(start) = memchr(b'<', buffer.as_bytes()) {
            errors.push(TagError::UnterminatedMarker {
                fragment: buffer[start..].to_string(),
            });
        }
        for tag in &stack {
            errors.push(TagError::Unterminated {
                name: tag.name.clone(),
            });
        }

        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "tag stream ended with errors");
        }
        errors.into_result(sink)
    }

    /// Consume one construct from the buffer. Returns false when more input
    /// is needed.
    fn step(&mut self) -> bool {
        if self.in_cdata {
            return self.step_cdata();
        }

        let bytes = self.buffer.as_bytes();
        let Some(open) = memchr(b'<', &bytes[self.scan_from..]).map(|i| i + self.scan_from) else {
            self.scan_from = bytes.len();
            return false;
        };

        let rest = &self.buffer[open..];
        if rest.starts_with(CDATA_OPEN) {
            self.append_text(open);
            self.consume(open + CDATA_OPEN.len());
            self.in_cdata = true;
            return true;
        }
        if CDATA_OPEN.starts_with(rest) {
            // Could still become a CDATA opener.
            self.scan_from = open;
            return false;
        }

        let Some(close) = memchr(b'>', rest.as_bytes()).map(|i| i + open) else {
            self.scan_from = open;
            return false;
        };

        self.append_text(open);
        let marker = self.buffer[open + 1..close].to_string();
        self.consume(close + 1);
        self.handle_marker(marker.trim());
        true
    }

    fn step_cdata(&mut self) -> bool {
        let from = self.scan_from;
        match memmem::find(&self.buffer.as_bytes()[from..], CDATA_CLOSE.as_bytes()) {
            Some(i) => {
                let end = from + i;
                if let Some(tag) = self.stack.last_mut() {
                    tag.content.push_str(&self.buffer[..end]);
                }
                self.consume(end + CDATA_CLOSE.len());
                self.in_cdata = false;
                true
            }
            None => {
                // Keep enough bytes to find a closer split across chunks.
                self.scan_from = self.buffer.len().saturating_sub(CDATA_CLOSE.len() - 1);
                false
            }
        }
    }

    /// Character data before `end` belongs to the innermost open tag unless
    /// it is only formatting whitespace.
    fn append_text(&mut self, end: usize) {
        let text = &self.buffer[..end];
        if text.trim().is_empty() {
            return;
        }
        if let Some(tag) = self.stack.last_mut() {
            tag.content.push_str(text);
        }
    }

    fn consume(&mut self, end: usize) {
        self.buffer.drain(..end);
        self.scan_from = 0;
    }

    fn handle_marker(&mut self, marker: &str) {
        if marker.starts_with('!') || marker.starts_with('?') {
            // Comments, doctypes and processing instructions carry no tags.
            return;
        }

        if let Some(name) = marker.strip_prefix('/') {
            self.close(name.trim());
            return;
        }

        let (marker, self_closing) = match marker.strip_suffix('/') {
            Some(inner) => (inner.trim_end(), true),
            None => (marker, false),
        };
        let (name, attrs) = marker
            .split_once(char::is_whitespace)
            .unwrap_or((marker, ""));
        if name.is_empty() {
            return;
        }

        let mut tag = Tag::new(name);
        for captures in ATTRIBUTE.captures_iter(attrs) {
            tag.attributes
                .insert(captures[1].to_string(), captures[2].to_string());
        }
        self.stack.push(tag);

        if self_closing {
            self.close(name);
        }
    }

    fn close(&mut self, name: &str) {
        match self.stack.last() {
            Some(open) if open.name == name => {}
            other => {
                let expected = other.map(|tag| tag.name.clone());
                tracing::warn!(found = name, ?expected, "dropping mismatched closing tag");
                self.errors.push(TagError::MismatchedClose {
                    expected,
                    found: name.to_string(),
                });
                return;
            }
        }

        if let Some(tag) = self.stack.pop() {
            self.sink.on_tag(&tag);
            if let Some(parent) = self.stack.last_mut() {
                parent.children.push(tag);
            }
        }
    }
}
