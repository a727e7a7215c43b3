//! Error types for decoding, encoding, tag parsing and directory IO.
//!
//! Decode and tag-parse failures are collected into an [`ErrorList`] so that
//! an editor can show every problem at once instead of stopping at the first.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cell::CellKind;
use crate::span::Span;

/// A grammar or content problem found while decoding a notebook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No h1, more than one h1, or the h1 is not the first group.
    #[error("Document must contain exactly one h1 heading")]
    TitleCount,
    /// Zero or several `package.json` file blocks.
    #[error("Document must contain exactly one package.json")]
    PackageJsonCount,
    /// Content between the title and the package.json block.
    #[error("package.json must directly follow the h1 heading")]
    PackageJsonPosition,
    /// A filename marker with no code block or file link after it.
    #[error("h6 is reserved for code cells, but no code block followed '{heading}'")]
    DanglingFilename { heading: String, span: Span },
    /// The `<!-- srcbook:{...} -->` comment is absent.
    #[error("Srcbook metadata is required but was not found in the file")]
    MissingMetadata,
    /// The metadata comment is present but its JSON does not describe a notebook.
    #[error("Srcbook metadata is invalid: {reason}")]
    InvalidMetadata { reason: String },
    /// A code cell filename whose extension maps to no supported language.
    #[error("Unable to infer language for '{filename}'")]
    UnsupportedLanguage { filename: String },
}

/// A violated precondition while encoding cells back to Markdown.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("first cell must be the title, found {}", describe(.found))]
    MissingTitle { found: Option<CellKind> },
    #[error("second cell must be package.json, found {}", describe(.found))]
    MissingPackageJson { found: Option<CellKind> },
    #[error("cell {index} is a {kind} cell, which may only appear once at the top of the document")]
    MisplacedCell { index: usize, kind: CellKind },
    #[error("markdown cell '{id}' uses h{level}, which is reserved for {purpose}")]
    ReservedHeading {
        id: String,
        level: u8,
        purpose: &'static str,
    },
    #[error("failed to serialize srcbook metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

fn describe(found: &Option<CellKind>) -> String {
    match found {
        Some(kind) => format!("a {kind} cell"),
        None => "no cell".to_string(),
    }
}

/// A malformed construct observed by the incremental tag parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// A closing marker whose name does not match the innermost open tag.
    #[error("unexpected closing tag </{found}>{}", expected_suffix(.expected))]
    MismatchedClose {
        expected: Option<String>,
        found: String,
    },
    /// A tag that was still open when the input ended.
    #[error("tag <{name}> was never closed")]
    Unterminated { name: String },
    /// Input ended inside a `<![CDATA[` section.
    #[error("CDATA section was never closed{}", enclosing_suffix(.tag))]
    UnterminatedCdata { tag: Option<String> },
    /// Input ended inside a `<...>` marker.
    #[error("tag marker '{fragment}' was never closed")]
    UnterminatedMarker { fragment: String },
}

fn expected_suffix(expected: &Option<String>) -> String {
    match expected {
        Some(name) => format!(", expected </{name}>"),
        None => " with no open tag".to_string(),
    }
}

fn enclosing_suffix(tag: &Option<String>) -> String {
    match tag {
        Some(name) => format!(" inside <{name}>"),
        None => String::new(),
    }
}

/// A problem turning completed tags into a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("action has unsupported type '{0}'")]
    UnsupportedAction(String),
    #[error("{action} action is missing its <{child}> element")]
    MissingElement {
        action: &'static str,
        child: &'static str,
    },
    #[error("<file> element is missing its filename attribute")]
    MissingFilename,
    #[error("unsupported command '{0}'")]
    UnsupportedCommand(String),
    #[error("plan stream ended with malformed tags: {0}")]
    Stream(#[from] TagErrors),
}

/// Failure reading or writing the directory form of a notebook.
#[derive(Debug, Error)]
pub enum DirError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("external link '{href}' points outside the notebook directory")]
    UnsafeLink { href: String },
    #[error("cell filename '{filename}' points outside the notebook directory")]
    UnsafeFilename { filename: String },
    #[error(transparent)]
    Decode(#[from] DecodeErrors),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// An ordered collection of errors gathered during one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorList<E> {
    errors: Vec<E>,
}

/// Errors from a failed decode.
pub type DecodeErrors = ErrorList<DecodeError>;

/// Errors reported when a tag stream is finished.
pub type TagErrors = ErrorList<TagError>;

impl<E> ErrorList<E> {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Create a collection holding a single error.
    pub fn single(error: E) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Add an error to the collection.
    pub fn push(&mut self, error: E) {
        self.errors.push(error);
    }

    /// Check if no errors were collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors collected.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the errors in the order they were found.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.errors.iter()
    }

    /// `Ok(value)` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl<E: fmt::Display> ErrorList<E> {
    /// The human-readable message of every error, in order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl<E> Default for ErrorList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> From<Vec<E>> for ErrorList<E> {
    fn from(errors: Vec<E>) -> Self {
        Self { errors }
    }
}

impl<E> IntoIterator for ErrorList<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<E: fmt::Display> fmt::Display for ErrorList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ErrorList<E> {}
