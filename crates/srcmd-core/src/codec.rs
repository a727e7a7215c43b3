//! Whole-document and fragment decoding.
//!
//! Decoding runs text → tokens → groups → cells. Grammar violations are
//! collected and returned together; nothing in this module panics on bad
//! input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, SrcbookMetadata};
use crate::convert::{convert_groups, ExternalSource};
use crate::error::{DecodeError, DecodeErrors};
use crate::group::group_tokens;
use crate::id::IdGenerator;
use crate::lexer::{lex, Token, TokenKind};
use crate::validate::{validate_groups, ValidationLevel};

static METADATA_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*srcbook:(.+)\s*-->$").expect("valid regex"));

/// A decoded notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub metadata: SrcbookMetadata,
    pub cells: Vec<Cell>,
    /// Cells whose source must be read from a linked file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<ExternalSource>,
}

/// Cells decoded from a partial document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub cells: Vec<Cell>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<ExternalSource>,
}

/// Decode a whole notebook.
///
/// Requires a title, exactly one package.json, and the srcbook metadata
/// comment. Grammar errors are reported before metadata problems.
///
/// # Example
///
/// ```rust
/// let text = "<!-- srcbook:{\"language\":\"javascript\"} -->\n\n# Demo\n\n\
///             ####### package.json\n\n```json\n{}\n```\n";
/// let decoded = srcmd_core::decode(text).unwrap();
/// assert_eq!(decoded.cells.len(), 2);
/// ```
#[tracing::instrument(level = "debug", skip_all, fields(bytes = text.len()))]
pub fn decode(text: &str) -> Result<Decoded, DecodeErrors> {
    let (metadata, tokens) = extract_metadata(lex(text));
    let groups = group_tokens(tokens);

    validate_groups(&groups, ValidationLevel::Full).into_result(())?;

    let metadata = metadata
        .unwrap_or(Err(DecodeError::MissingMetadata))
        .map_err(DecodeErrors::single)?;

    let converted =
        convert_groups(&groups, &mut IdGenerator::for_text(text)).map_err(DecodeErrors::single)?;

    tracing::debug!(
        groups = groups.len(),
        cells = converted.cells.len(),
        "decoded notebook"
    );
    Ok(Decoded {
        metadata,
        cells: converted.cells,
        external: converted.external,
    })
}

/// Decode a fragment of cells, such as generated content to insert into an
/// existing notebook.
///
/// Only the filename pairing rule is enforced. A metadata comment, if
/// present, is dropped.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = text.len()))]
pub fn decode_fragment(text: &str) -> Result<Fragment, DecodeErrors> {
    let (_, tokens) = extract_metadata(lex(text));
    let groups = group_tokens(tokens);

    validate_groups(&groups, ValidationLevel::Partial).into_result(())?;

    let converted =
        convert_groups(&groups, &mut IdGenerator::for_text(text)).map_err(DecodeErrors::single)?;

    tracing::debug!(cells = converted.cells.len(), "decoded fragment");
    Ok(Fragment {
        cells: converted.cells,
        external: converted.external,
    })
}

type MetadataResult = Result<SrcbookMetadata, DecodeError>;

/// Pull the first srcbook metadata comment out of the token stream.
fn extract_metadata(tokens: Vec<Token<'_>>) -> (Option<MetadataResult>, Vec<Token<'_>>) {
    let mut metadata = None;
    let mut remaining = Vec::with_capacity(tokens.len());

    for token in tokens {
        if metadata.is_some() || token.kind != TokenKind::Html {
            remaining.push(token);
            continue;
        }
        match METADATA_COMMENT.captures(token.raw.trim()) {
            Some(captures) => {
                let json = captures.get(1).map_or("", |m| m.as_str());
                metadata = Some(serde_json::from_str::<SrcbookMetadata>(json).map_err(|e| {
                    DecodeError::InvalidMetadata {
                        reason: e.to_string(),
                    }
                }));
            }
            None => remaining.push(token),
        }
    }

    (metadata, remaining)
}
