//! Typed notebook cells and document metadata.
//!
//! A notebook is an ordered `Vec<Cell>`; the order is the serialization
//! order. The serde representation is tagged by `type` so the same values
//! can be exchanged as JSON with the rest of the application.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source language of a code cell, inferred from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    Javascript,
    Typescript,
}

impl CodeLanguage {
    /// Infer the language from a filename's extension.
    ///
    /// `.js`, `.cjs` and `.mjs` are JavaScript; `.ts`, `.cts` and `.mts` are
    /// TypeScript. Anything else has no language.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext {
            "js" | "cjs" | "mjs" => Some(Self::Javascript),
            "ts" | "cts" | "mts" => Some(Self::Typescript),
            _ => None,
        }
    }

    /// Name used in metadata and as the fenced-code info string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution status of a runnable cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    #[default]
    Idle,
    Running,
}

/// Notebook-level settings carried in the `<!-- srcbook:{...} -->` comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcbookMetadata {
    pub language: CodeLanguage,
    #[serde(
        rename = "tsconfig.json",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tsconfig: Option<String>,
}

impl SrcbookMetadata {
    /// Create metadata for `language` with no tsconfig.
    pub fn new(language: CodeLanguage) -> Self {
        Self {
            language,
            tsconfig: None,
        }
    }

    /// Attach the raw contents of `tsconfig.json`.
    pub fn with_tsconfig(mut self, tsconfig: impl Into<String>) -> Self {
        self.tsconfig = Some(tsconfig.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleCell {
    pub id: String,
    pub text: String,
}

/// The notebook's `package.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageJsonCell {
    pub id: String,
    pub source: String,
    /// Always `package.json`.
    pub filename: String,
    #[serde(default)]
    pub status: CellStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCell {
    pub id: String,
    pub source: String,
    pub language: CodeLanguage,
    pub filename: String,
    #[serde(default)]
    pub status: CellStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownCell {
    pub id: String,
    pub text: String,
}

/// Marks where generated content should be inserted. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderCell {
    pub id: String,
    pub text: String,
}

/// One typed unit of notebook content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Cell {
    #[serde(rename = "title")]
    Title(TitleCell),
    #[serde(rename = "package.json")]
    PackageJson(PackageJsonCell),
    #[serde(rename = "code")]
    Code(CodeCell),
    #[serde(rename = "markdown")]
    Markdown(MarkdownCell),
    #[serde(rename = "placeholder")]
    Placeholder(PlaceholderCell),
}

/// Discriminant of a [`Cell`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Title,
    PackageJson,
    Code,
    Markdown,
    Placeholder,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::PackageJson => "package.json",
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Placeholder => "placeholder",
        })
    }
}

impl Cell {
    /// Get the cell's id.
    pub fn id(&self) -> &str {
        match self {
            Cell::Title(c) => &c.id,
            Cell::PackageJson(c) => &c.id,
            Cell::Code(c) => &c.id,
            Cell::Markdown(c) => &c.id,
            Cell::Placeholder(c) => &c.id,
        }
    }

    /// Get the cell's kind without its payload.
    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Title(_) => CellKind::Title,
            Cell::PackageJson(_) => CellKind::PackageJson,
            Cell::Code(_) => CellKind::Code,
            Cell::Markdown(_) => CellKind::Markdown,
            Cell::Placeholder(_) => CellKind::Placeholder,
        }
    }

    /// Filename for cells backed by a file on disk.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Cell::PackageJson(c) => Some(&c.filename),
            Cell::Code(c) => Some(&c.filename),
            _ => None,
        }
    }

    /// Mutable source text for cells backed by a file on disk.
    pub fn source_mut(&mut self) -> Option<&mut String> {
        match self {
            Cell::PackageJson(c) => Some(&mut c.source),
            Cell::Code(c) => Some(&mut c.source),
            _ => None,
        }
    }
}
