//! Cells back to srcmd Markdown.
//!
//! The output is the canonical form the decoder round-trips byte for byte:
//!
//! ````text
//! <!-- srcbook:{"language":"javascript"} -->
//!
//! # Title
//!
//! <details>
//!   <summary>package.json</summary>
//!
//! ```json
//! {}
//! ```
//! </details>
//!
//! Prose...
//!
//! <details open>
//!   <summary>index.mjs</summary>
//!
//! ```javascript
//! console.log(1);
//! ```
//! </details>
//! ````

use crate::cell::{Cell, CodeCell, MarkdownCell, PackageJsonCell, SrcbookMetadata, TitleCell};
use crate::error::EncodeError;
use crate::group::{FILENAME_LEVEL, TITLE_LEVEL};
use crate::lexer::{lex, TokenKind};

/// Directory, relative to the manifest, that holds code cell files.
pub const SOURCE_DIR: &str = "src";

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Inline each file's source in a fenced block. When false, file blocks
    /// link to the file's path in the directory layout instead.
    pub inline: bool,
}

impl EncodeOptions {
    /// Inline every file's source.
    pub const fn inline() -> Self {
        Self { inline: true }
    }

    /// Link every file to its path in the directory layout.
    pub const fn external() -> Self {
        Self { inline: false }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::inline()
    }
}

/// Encode a full notebook.
///
/// `cells[0]` must be the title and `cells[1]` the package.json; the rest
/// may be markdown, code, or placeholder cells (placeholders are skipped).
pub fn encode(
    cells: &[Cell],
    metadata: &SrcbookMetadata,
    options: EncodeOptions,
) -> Result<String, EncodeError> {
    let (title, package_json, rest) = split_head(cells)?;

    let mut blocks = Vec::with_capacity(cells.len() + 1);
    blocks.push(format!(
        "<!-- srcbook:{} -->",
        serde_json::to_string(metadata)?
    ));
    blocks.push(encode_title(title));
    blocks.push(encode_package_json(package_json, options));

    for (offset, cell) in rest.iter().enumerate() {
        match cell {
            Cell::Markdown(markdown) => {
                check_reserved_headings(markdown)?;
                let text = markdown.text.trim();
                if !text.is_empty() {
                    blocks.push(text.to_string());
                }
            }
            Cell::Code(code) => blocks.push(encode_code(code, options)),
            Cell::Placeholder(placeholder) => {
                tracing::debug!(id = %placeholder.id, "skipping placeholder cell");
            }
            Cell::Title(_) | Cell::PackageJson(_) => {
                return Err(EncodeError::MisplacedCell {
                    index: offset + 2,
                    kind: cell.kind(),
                });
            }
        }
    }

    let mut out = blocks.join("\n\n");
    out.truncate(out.trim_end().len());
    out.push('\n');

    tracing::debug!(cells = cells.len(), bytes = out.len(), inline = options.inline, "encoded notebook");
    Ok(out)
}

fn split_head(cells: &[Cell]) -> Result<(&TitleCell, &PackageJsonCell, &[Cell]), EncodeError> {
    let title = match cells.first() {
        Some(Cell::Title(title)) => title,
        other => {
            return Err(EncodeError::MissingTitle {
                found: other.map(Cell::kind),
            })
        }
    };
    let package_json = match cells.get(1) {
        Some(Cell::PackageJson(package_json)) => package_json,
        other => {
            return Err(EncodeError::MissingPackageJson {
                found: other.map(Cell::kind),
            })
        }
    };
    Ok((title, package_json, &cells[2..]))
}

fn encode_title(cell: &TitleCell) -> String {
    format!("# {}", cell.text)
}

fn encode_package_json(cell: &PackageJsonCell, options: EncodeOptions) -> String {
    FileBlock {
        filename: &cell.filename,
        fence: "json",
        source: &cell.source,
        href: format!("./{}", cell.filename),
        open: false,
    }
    .render(options)
}

fn encode_code(cell: &CodeCell, options: EncodeOptions) -> String {
    FileBlock {
        filename: &cell.filename,
        fence: cell.language.as_str(),
        source: &cell.source,
        href: format!("./{}/{}", SOURCE_DIR, cell.filename),
        open: true,
    }
    .render(options)
}

/// A file rendered as a `<details>` block.
struct FileBlock<'a> {
    filename: &'a str,
    fence: &'a str,
    source: &'a str,
    href: String,
    open: bool,
}

impl FileBlock<'_> {
    fn render(&self, options: EncodeOptions) -> String {
        let body = if options.inline {
            format!("```{}\n{}\n```", self.fence, self.source)
        } else {
            format!("[{}]({})\n", self.filename, self.href)
        };
        format!(
            "<details{}>\n  <summary>{}</summary>\n\n{}\n</details>",
            if self.open { " open" } else { "" },
            self.filename,
            body
        )
    }
}

/// Reject markdown that would decode as a title or a file marker.
fn check_reserved_headings(cell: &MarkdownCell) -> Result<(), EncodeError> {
    for token in lex(&cell.text) {
        let (level, purpose) = match token.kind {
            TokenKind::Heading { level: TITLE_LEVEL } => (TITLE_LEVEL, "the notebook title"),
            TokenKind::Heading {
                level: FILENAME_LEVEL,
            } => (FILENAME_LEVEL, "code cell filenames"),
            _ => continue,
        };
        return Err(EncodeError::ReservedHeading {
            id: cell.id.clone(),
            level,
            purpose,
        });
    }
    Ok(())
}
