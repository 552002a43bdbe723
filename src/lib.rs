//! `license-policy`: decide whether a set of licenses may ship under a given
//! distribution scenario, whether two licenses may be combined, and what
//! compliance obligations follow.
//!
//! # Flow
//! 1. Load license records ([`license::store::LicenseStore`]) from the embedded
//!    dataset, a master database file, or a directory of per-license files.
//! 2. Select the active policy ([`policy::ActivePolicy::select`]), falling back
//!    to the built-in default when none is configured.
//! 3. Admit every caller-supplied identifier through
//!    [`validate::validate_license_id`] before touching storage.
//! 4. Match each license against the policy rules ([`policy::matcher`]) and
//!    fold the verdicts into one decision ([`policy::aggregate`]).
//! 5. Attach per-license obligations ([`obligations::assemble`]).
//!
//! Pairwise compatibility ([`compat`]) is independent of the policy and only
//! reads the license records.

pub mod compat;
pub mod config;
pub mod engine;
pub mod error;
pub mod license;
pub mod models;
pub mod obligations;
pub mod policy;
pub mod validate;

pub use engine::{EvaluationRequest, EvaluationResult, PolicyEngine};
pub use error::{DataError, EngineError, PolicyError, ValidationError};
