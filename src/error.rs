//! Error kinds surfaced by the engine.
//!
//! - [`ValidationError`]: a caller-supplied identifier was rejected before any
//!   storage access. Recoverable per call.
//! - [`EngineError::NotFound`]: a well-formed identifier is absent from the
//!   record store. Recoverable per call.
//! - [`DataError`]: a dataset or policy source is malformed. Fatal at load.
//! - [`PolicyError`]: a rule cannot be evaluated. Degrades that one match to
//!   the review default.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error returned by [`PolicyEngine`](crate::engine::PolicyEngine) entry points.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("license `{0}` not found in the license dataset")]
    NotFound(String),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
}

impl EngineError {
    /// Stable short name of the error kind, used in structured output.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::NotFound(_) => "not_found",
            EngineError::Data(_) => "data_error",
            EngineError::Policy(_) => "policy_error",
        }
    }
}

/// Rejected license identifier or license path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("license identifier is empty")]
    Empty,

    #[error("license identifier `{0}` must start with a letter or digit")]
    LeadingCharacter(String),

    #[error("license identifier `{id}` contains forbidden character {ch:?}")]
    ForbiddenCharacter { id: String, ch: char },

    #[error("license identifier `{0}` is a relative path segment")]
    PathSegment(String),

    #[error("license data directory {} cannot be resolved: {reason}", .path.display())]
    BaseDirectory { path: PathBuf, reason: String },

    #[error("license path for `{id}` escapes the data directory {}", .base.display())]
    EscapesBase { id: String, base: PathBuf },

    #[error("unknown linking context `{0}` (expected static_linking, dynamic_linking or general)")]
    UnknownContext(String),
}

/// Malformed dataset or policy source.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed license record in {origin}: {reason}")]
    Record { origin: String, reason: String },

    #[error("license record in {origin} declares id `{found}` but was expected to be `{expected}`")]
    IdMismatch {
        origin: String,
        expected: String,
        found: String,
    },

    #[error("duplicate license record `{0}`")]
    Duplicate(String),

    #[error("unsafe license record path: {0}")]
    UnsafePath(#[from] ValidationError),

    #[error("malformed policy source {origin}: {reason}")]
    Policy { origin: String, reason: String },
}

/// A single rule could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("rule `{rule}` references undefined field `{field}`")]
    UndefinedField { rule: String, field: String },

    #[error("rule `{rule}` has an invalid value for `{field}`: {reason}")]
    InvalidValue {
        rule: String,
        field: String,
        reason: String,
    },
}
