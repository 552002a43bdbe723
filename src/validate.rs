//! Gatekeeping for caller-supplied license identifiers.
//!
//! Identifiers double as lookup keys and file name stems, so they are checked
//! here before any store or file-system access. Nothing is ever rewritten into
//! a different identifier: input is accepted verbatim or rejected.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::ValidationError;

/// A license identifier that passed [`validate_license_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LicenseId(String);

impl LicenseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LicenseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Accept `raw` only if it starts with an ASCII letter or digit and consists of
/// letters, digits, `.`, `-` and `+`.
pub fn validate_license_id(raw: &str) -> Result<LicenseId, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }

    if let Some(ch) = raw.chars().find(|c| matches!(c, '/' | '\\')) {
        return Err(ValidationError::ForbiddenCharacter {
            id: raw.to_string(),
            ch,
        });
    }

    if raw == "." || raw == ".." {
        return Err(ValidationError::PathSegment(raw.to_string()));
    }

    if !raw.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::LeadingCharacter(raw.to_string()));
    }

    if let Some(ch) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+')))
    {
        return Err(ValidationError::ForbiddenCharacter {
            id: raw.to_string(),
            ch,
        });
    }

    Ok(LicenseId(raw.to_string()))
}

/// Build `<base_dir>/<id>.<extension>` and prove it stays inside `base_dir`.
///
/// The identifier is validated first. The joined path must be lexically below
/// the canonical base directory, and if it exists its canonical form (after
/// following symlinks) must be as well. A missing file is not an error here;
/// the caller decides what absence means.
pub fn validate_license_path(
    base_dir: &Path,
    candidate_id: &str,
    extension: &str,
) -> Result<PathBuf, ValidationError> {
    let id = validate_license_id(candidate_id)?;

    let base = base_dir
        .canonicalize()
        .map_err(|e| ValidationError::BaseDirectory {
            path: base_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

    let file_name = format!("{}.{}", id, extension);
    let candidate = base.join(&file_name);

    let escapes = || ValidationError::EscapesBase {
        id: id.to_string(),
        base: base.clone(),
    };

    // Lexical containment: exactly one normal component below the base.
    let relative = candidate.strip_prefix(&base).map_err(|_| escapes())?;
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == file_name.as_str() => {}
        _ => return Err(escapes()),
    }

    // Symbolic containment: a symlink must not lead out of the base.
    if candidate.symlink_metadata().is_ok() {
        let resolved = candidate.canonicalize().map_err(|_| escapes())?;
        if !resolved.starts_with(&base) {
            tracing::warn!(
                license = %id,
                path = %candidate.display(),
                "license path resolves outside the data directory"
            );
            return Err(escapes());
        }
        return Ok(resolved);
    }

    Ok(candidate)
}
