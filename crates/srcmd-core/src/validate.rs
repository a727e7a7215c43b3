//! Grammar checks over grouped tokens.

use crate::error::{DecodeError, DecodeErrors};
use crate::group::Group;

/// The file name that marks the notebook's dependency manifest.
pub const PACKAGE_JSON: &str = "package.json";

/// How much of the notebook grammar a decode must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    /// A whole notebook: title, package.json and filename pairing.
    Full,
    /// A fragment of cells: filename pairing only.
    Partial,
}

/// Check `groups` against the grammar, collecting every violation.
pub fn validate_groups(groups: &[Group<'_>], level: ValidationLevel) -> DecodeErrors {
    let mut errors = DecodeErrors::new();

    if level == ValidationLevel::Full {
        let first_visible = groups.iter().find(|group| !group.is_blank());
        let title_first = matches!(first_visible, Some(Group::Title(_)));
        let title_count = groups
            .iter()
            .filter(|group| matches!(group, Group::Title(_)))
            .count();
        if !title_first || title_count != 1 {
            errors.push(DecodeError::TitleCount);
        }

        let package_json_count = groups
            .iter()
            .filter(|group| matches!(group, Group::Filename(f) if f.filename == PACKAGE_JSON))
            .count();
        if package_json_count != 1 {
            errors.push(DecodeError::PackageJsonCount);
        } else if title_first && title_count == 1 && !package_json_follows_title(groups) {
            errors.push(DecodeError::PackageJsonPosition);
        }
    }

    for (i, group) in groups.iter().enumerate() {
        if let Group::Filename(filename) = group {
            let paired = matches!(
                groups.get(i + 1),
                Some(Group::Code(_) | Group::LinkedCode(_))
            );
            if !paired {
                errors.push(DecodeError::DanglingFilename {
                    heading: filename.raw.to_string(),
                    span: filename.span,
                });
            }
        }
    }

    errors
}

/// Whether the first visible group after the title is the package.json
/// filename.
fn package_json_follows_title(groups: &[Group<'_>]) -> bool {
    let mut visible = groups.iter().filter(|group| !group.is_blank());
    visible.next();
    matches!(visible.next(), Some(Group::Filename(f)) if f.filename == PACKAGE_JSON)
}
