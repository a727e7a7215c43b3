//! Conversion of validated groups into cells.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cell::{
    Cell, CellStatus, CodeCell, CodeLanguage, MarkdownCell, PackageJsonCell, TitleCell,
};
use crate::error::DecodeError;
use crate::group::{FilenameGroup, Group};
use crate::id::IdGenerator;
use crate::lexer::{Token, TokenKind};
use crate::validate::PACKAGE_JSON;

static BLANK_LINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// A cell whose source lives in an external file the caller must read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExternalSource {
    pub cell_id: String,
    /// Link destination as written in the document, e.g. `./src/index.mjs`.
    pub href: String,
}

/// Cells produced from one group sequence.
#[derive(Debug, Default)]
pub struct Converted {
    pub cells: Vec<Cell>,
    pub external: Vec<ExternalSource>,
}

/// Turn validated groups into cells.
///
/// Fails only when a code cell's language cannot be inferred; in that case
/// no cells are returned at all.
pub fn convert_groups(
    groups: &[Group<'_>],
    ids: &mut IdGenerator,
) -> Result<Converted, DecodeError> {
    let mut out = Converted::default();
    let mut i = 0;

    while i < groups.len() {
        match &groups[i] {
            Group::Title(token) => out.cells.push(Cell::Title(TitleCell {
                id: ids.next_id(),
                text: token.heading_text().to_string(),
            })),
            Group::Markdown(tokens) => {
                if tokens.iter().any(|token| !token.is_blank()) {
                    out.cells.push(Cell::Markdown(MarkdownCell {
                        id: ids.next_id(),
                        text: markdown_text(tokens),
                    }));
                }
            }
            Group::Filename(filename) => {
                match groups.get(i + 1) {
                    Some(Group::Code(token)) => {
                        out.cells
                            .push(file_cell(filename, code_source(token), ids.next_id())?);
                    }
                    Some(Group::LinkedCode(link)) => {
                        let cell = file_cell(filename, String::new(), ids.next_id())?;
                        out.external.push(ExternalSource {
                            cell_id: cell.id().to_string(),
                            href: link.href.clone(),
                        });
                        out.cells.push(cell);
                    }
                    // Unpaired filenames are rejected by validation.
                    _ => {}
                }
                i += 1;
            }
            // Consumed together with the preceding filename.
            Group::Code(_) | Group::LinkedCode(_) => {}
        }
        i += 1;
    }

    Ok(out)
}

fn file_cell(filename: &FilenameGroup<'_>, source: String, id: String) -> Result<Cell, DecodeError> {
    if filename.filename == PACKAGE_JSON {
        return Ok(Cell::PackageJson(PackageJsonCell {
            id,
            source,
            filename: PACKAGE_JSON.to_string(),
            status: CellStatus::Idle,
        }));
    }

    let language = CodeLanguage::from_filename(filename.filename).ok_or_else(|| {
        DecodeError::UnsupportedLanguage {
            filename: filename.filename.to_string(),
        }
    })?;

    Ok(Cell::Code(CodeCell {
        id,
        source,
        language,
        filename: filename.filename.to_string(),
        status: CellStatus::Idle,
    }))
}

/// Code block content without the newline before the closing fence.
fn code_source(token: &Token<'_>) -> String {
    match &token.kind {
        TokenKind::Code { content } => content.strip_suffix('\n').unwrap_or(content).to_string(),
        _ => String::new(),
    }
}

/// Concatenate a markdown run, collapsing runs of blank lines.
///
/// Code blocks keep their content untouched; only the whitespace after them
/// is normalized.
pub fn markdown_text(tokens: &[Token<'_>]) -> String {
    let mut text = String::new();
    for token in tokens {
        if token.is_code() {
            text.push_str(token.raw);
            text.push_str(&BLANK_LINE_RUN.replace_all(token.trailing, "\n\n"));
        } else {
            let mut raw = String::with_capacity(token.source_len());
            raw.push_str(token.raw);
            raw.push_str(token.trailing);
            text.push_str(&BLANK_LINE_RUN.replace_all(&raw, "\n\n"));
        }
    }
    text
}
