//! Pairwise license compatibility under a linking mode.
//!
//! Resolution order, first match wins:
//!
//! 1. same license → compatible
//! 2. `incompatible_with` in either record → incompatible
//! 3. `compatible_with` in either record → compatible
//! 4. `requires_review` in either record → review required
//! 5. category defaults
//! 6. otherwise → review required
//!
//! Records are not assumed to be symmetric, so every explicit list is checked
//! in both directions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::license::store::LicenseStore;
use crate::models::{Category, ContaminationEffect, License, LinkingMode, LinkingRules, Target};
use crate::validate::LicenseId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityVerdict {
    Compatible,
    Incompatible,
    ReviewRequired,
}

impl fmt::Display for CompatibilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityVerdict::Compatible => write!(f, "compatible"),
            CompatibilityVerdict::Incompatible => write!(f, "incompatible"),
            CompatibilityVerdict::ReviewRequired => write!(f, "review required"),
        }
    }
}

/// Which resolution step decided a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Basis {
    SameLicense,
    ExplicitIncompatible { declared_by: String },
    ExplicitCompatible { declared_by: String },
    ExplicitReview { declared_by: String },
    CategoryDefault,
    NoRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub license_a: String,
    pub license_b: String,
    pub linking: LinkingMode,
    pub verdict: CompatibilityVerdict,
    pub basis: Basis,
    pub reason: String,
    pub contamination_a: ContaminationEffect,
    pub contamination_b: ContaminationEffect,
}

/// Resolve two identifiers held by `store`.
///
/// An identifier missing from the store fails the whole query.
pub fn resolve_pair(
    store: &LicenseStore,
    a: &LicenseId,
    b: &LicenseId,
    mode: LinkingMode,
) -> Result<CompatibilityReport, EngineError> {
    let a = store.get(a)?;
    let b = store.get(b)?;
    Ok(resolve(a, b, mode))
}

/// Resolve two license records.
pub fn resolve(a: &License, b: &License, mode: LinkingMode) -> CompatibilityReport {
    let (verdict, basis) = decide(a, b, mode);
    let reason = explain(a, b, mode, verdict, &basis);

    tracing::debug!(
        license_a = %a.id,
        license_b = %b.id,
        %mode,
        %verdict,
        ?basis,
        "resolved compatibility"
    );

    CompatibilityReport {
        license_a: a.id.clone(),
        license_b: b.id.clone(),
        linking: mode,
        verdict,
        basis,
        reason,
        contamination_a: a.compatibility.contamination_effect,
        contamination_b: b.compatibility.contamination_effect,
    }
}

fn decide(a: &License, b: &License, mode: LinkingMode) -> (CompatibilityVerdict, Basis) {
    if a.id == b.id {
        return (CompatibilityVerdict::Compatible, Basis::SameLicense);
    }

    if let Some(declared_by) = declared(a, b, mode, |r| &r.incompatible_with) {
        return (
            CompatibilityVerdict::Incompatible,
            Basis::ExplicitIncompatible { declared_by },
        );
    }
    if let Some(declared_by) = declared(a, b, mode, |r| &r.compatible_with) {
        return (
            CompatibilityVerdict::Compatible,
            Basis::ExplicitCompatible { declared_by },
        );
    }
    if let Some(declared_by) = declared(a, b, mode, |r| &r.requires_review) {
        return (
            CompatibilityVerdict::ReviewRequired,
            Basis::ExplicitReview { declared_by },
        );
    }

    match category_default(a.category, b.category, mode) {
        Some(verdict) => (verdict, Basis::CategoryDefault),
        None => (CompatibilityVerdict::ReviewRequired, Basis::NoRule),
    }
}

/// Identifier of the first record whose list names the other, checking `a` then `b`.
fn declared(
    a: &License,
    b: &License,
    mode: LinkingMode,
    list: impl Fn(&LinkingRules) -> &Vec<Target>,
) -> Option<String> {
    if list(a.rules(mode)).iter().any(|t| t.matches(b)) {
        return Some(a.id.clone());
    }
    if list(b.rules(mode)).iter().any(|t| t.matches(a)) {
        return Some(b.id.clone());
    }
    None
}

fn category_default(a: Category, b: Category, mode: LinkingMode) -> Option<CompatibilityVerdict> {
    use Category::*;

    if a.is_permissive_like() && b.is_permissive_like() {
        return Some(CompatibilityVerdict::Compatible);
    }

    let either = |c: Category| a == c || b == c;
    match (either(StrongCopyleft), either(WeakCopyleft), mode) {
        (true, _, LinkingMode::Static) => Some(CompatibilityVerdict::Incompatible),
        (true, _, LinkingMode::Dynamic) => Some(CompatibilityVerdict::ReviewRequired),
        (false, true, LinkingMode::Static) => Some(CompatibilityVerdict::ReviewRequired),
        (false, true, LinkingMode::Dynamic) => Some(CompatibilityVerdict::Compatible),
        (false, false, _) => None,
    }
}

fn explain(
    a: &License,
    b: &License,
    mode: LinkingMode,
    verdict: CompatibilityVerdict,
    basis: &Basis,
) -> String {
    match basis {
        Basis::SameLicense => format!("{} is always compatible with itself", a.id),
        Basis::ExplicitIncompatible { declared_by }
        | Basis::ExplicitCompatible { declared_by }
        | Basis::ExplicitReview { declared_by } => {
            let other = if declared_by == &a.id { &b.id } else { &a.id };
            format!("{declared_by} declares {other} {verdict} under {mode}")
        }
        Basis::CategoryDefault => format!(
            "{} ({}) with {} ({}) is {verdict} under {mode} by category default",
            a.id,
            a.category.as_str(),
            b.id,
            b.category.as_str()
        ),
        Basis::NoRule => format!(
            "no compatibility rule covers {} with {} under {mode}; legal review required",
            a.id, b.id
        ),
    }
}
