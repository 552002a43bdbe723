//! Declarative policy rules and their evaluation.
//!
//! - [`Policy`] is an ordered, immutable rule set loaded from YAML (or JSON).
//! - [`matcher`] picks the first rule that fully matches one license.
//! - [`aggregate`] folds per-license verdicts into one decision.

pub mod aggregate;
pub mod matcher;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DataError, PolicyError};
use crate::models::{Category, License, LinkContext};
use crate::validate::LicenseId;

const EMBEDDED_DEFAULT_POLICY: &str = include_str!("default_policy.yaml");

/// Priority given to rules that do not declare one.
const DEFAULT_PRIORITY: u32 = 1000;

/// Policy outcome. Ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Approve,
    Review,
    Deny,
}

impl Action {
    /// Severity used when a rule does not set one.
    pub fn default_severity(&self) -> Severity {
        match self {
            Action::Approve => Severity::Info,
            Action::Review => Severity::Warning,
            Action::Deny => Severity::Error,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Approve => write!(f, "approve"),
            Action::Review => write!(f, "review"),
            Action::Deny => write!(f, "deny"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Everything a rule predicate may look at. Built fresh per evaluation call.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub licenses: Vec<LicenseId>,
    pub distribution: String,
    pub linking: LinkContext,
    pub project_type: Option<String>,
}

/// One conjunct of a rule predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Category(Category),
    /// The license under evaluation is one of these.
    LicenseAny(Vec<String>),
    /// Every license in the request is one of these.
    LicenseAll(Vec<String>),
    Distribution(String),
    Linking(LinkContext),
    ProjectType(String),
    /// A `when` entry that could not be compiled. Evaluating it is a [`PolicyError`].
    Unsupported {
        field: String,
        reason: Option<String>,
    },
}

impl Clause {
    fn compile(field: &str, value: &serde_yaml::Value) -> Clause {
        let unsupported = |reason: String| Clause::Unsupported {
            field: field.to_string(),
            reason: Some(reason),
        };

        match field {
            "license_type" | "category" => match value.as_str().map(str::parse::<Category>) {
                Some(Ok(category)) => Clause::Category(category),
                Some(Err(e)) => unsupported(e),
                None => unsupported("expected a category name".to_string()),
            },
            "license" | "licenses" => match string_list(value) {
                Some(ids) => Clause::LicenseAny(ids),
                None => unsupported("expected a license id or a list of ids".to_string()),
            },
            "all_licenses" => match string_list(value) {
                Some(ids) => Clause::LicenseAll(ids),
                None => unsupported("expected a list of license ids".to_string()),
            },
            "distribution" => match value.as_str() {
                Some(d) => Clause::Distribution(d.to_string()),
                None => unsupported("expected a distribution type".to_string()),
            },
            "context" | "link_type" => match value.as_str().map(str::parse::<LinkContext>) {
                Some(Ok(linking)) => Clause::Linking(linking),
                Some(Err(e)) => unsupported(e),
                None => unsupported("expected a linking context".to_string()),
            },
            "project_type" => match value.as_str() {
                Some(p) => Clause::ProjectType(p.to_string()),
                None => unsupported("expected a project type".to_string()),
            },
            other => Clause::Unsupported {
                field: other.to_string(),
                reason: None,
            },
        }
    }

    fn holds(
        &self,
        rule: &str,
        license: &License,
        ctx: &EvaluationContext,
    ) -> Result<bool, PolicyError> {
        match self {
            Clause::Category(category) => Ok(license.category == *category),
            Clause::LicenseAny(ids) => Ok(ids.iter().any(|id| id == &license.id)),
            Clause::LicenseAll(ids) => Ok(ctx
                .licenses
                .iter()
                .all(|l| ids.iter().any(|id| id == l.as_str()))),
            Clause::Distribution(d) => Ok(d.eq_ignore_ascii_case(&ctx.distribution)),
            Clause::Linking(linking) => Ok(*linking == ctx.linking),
            Clause::ProjectType(p) => Ok(ctx
                .project_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(p))),
            Clause::Unsupported {
                field,
                reason: None,
            } => Err(PolicyError::UndefinedField {
                rule: rule.to_string(),
                field: field.clone(),
            }),
            Clause::Unsupported {
                field,
                reason: Some(reason),
            } => Err(PolicyError::InvalidValue {
                rule: rule.to_string(),
                field: field.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

fn string_list(value: &serde_yaml::Value) -> Option<Vec<String>> {
    match value {
        serde_yaml::Value::String(s) => Some(vec![s.clone()]),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

/// Conjunction of clauses. Empty means "always".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    /// Pure function of `(license, ctx)`.
    pub fn evaluate(
        &self,
        rule: &str,
        license: &License,
        ctx: &EvaluationContext,
    ) -> Result<bool, PolicyError> {
        for clause in &self.clauses {
            if !clause.holds(rule, license, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub action: Action,
    pub severity: Severity,
    pub message: String,
    pub remediation: Option<String>,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule {
    pub id: String,
    pub description: Option<String>,
    pub priority: u32,
    pub predicate: Predicate,
    pub outcome: Outcome,
}

/// Ordered rule set plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Distribution type the policy was written for.
    pub distribution: Option<String>,
    rules: Vec<PolicyRule>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    version: Option<serde_yaml::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    distribution: Option<String>,
    #[serde(default)]
    rules: Vec<RuleFile>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<u32>,
    #[serde(default)]
    when: BTreeMap<String, serde_yaml::Value>,
    then: OutcomeFile,
}

#[derive(Debug, Deserialize)]
struct OutcomeFile {
    action: Action,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    remediation: Option<String>,
    #[serde(default)]
    requirements: Vec<String>,
}

impl RuleFile {
    fn compile(self) -> PolicyRule {
        let clauses: Vec<Clause> = self
            .when
            .iter()
            .map(|(field, value)| Clause::compile(field, value))
            .collect();

        for clause in &clauses {
            if let Clause::Unsupported { field, reason } = clause {
                tracing::warn!(
                    rule = %self.id,
                    %field,
                    reason = reason.as_deref().unwrap_or("undefined field"),
                    "policy rule condition cannot be evaluated"
                );
            }
        }

        let then = self.then;
        let message = then
            .message
            .unwrap_or_else(|| format!("matched policy rule `{}`", self.id));

        PolicyRule {
            id: self.id,
            description: self.description,
            priority: self.priority.unwrap_or(DEFAULT_PRIORITY),
            predicate: Predicate { clauses },
            outcome: Outcome {
                action: then.action,
                severity: then.severity.unwrap_or(then.action.default_severity()),
                message,
                remediation: then.remediation.map(|r| r.trim().to_string()),
                requirements: then.requirements,
            },
        }
    }
}

fn version_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Policy {
    /// Build a policy from rules, ordering them by ascending priority.
    /// Rules with equal priority keep their given order.
    pub fn new(name: impl Into<String>, mut rules: Vec<PolicyRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self {
            name: name.into(),
            version: None,
            description: None,
            distribution: None,
            rules,
        }
    }

    /// The policy compiled into the binary.
    pub fn embedded_default() -> Result<Self, DataError> {
        Self::from_yaml_str(EMBEDDED_DEFAULT_POLICY, "embedded default policy")
    }

    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, DataError> {
        Self::from_sources(&[(origin.to_string(), text.to_string())])
    }

    /// Load a policy file, or every policy file in a directory.
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let sources = read_sources(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_sources(&sources)
    }

    /// Merge `(origin, text)` documents in order. Metadata comes from the first
    /// document that declares it.
    fn from_sources(sources: &[(String, String)]) -> Result<Self, DataError> {
        let mut name = None;
        let mut version = None;
        let mut description = None;
        let mut distribution = None;
        let mut rules = Vec::new();

        for (origin, text) in sources {
            if text.trim().is_empty() {
                continue;
            }
            let file: PolicyFile = serde_yaml::from_str(text).map_err(|e| DataError::Policy {
                origin: origin.clone(),
                reason: e.to_string(),
            })?;

            name = name.or(file.name);
            version = version.or(file.version.and_then(version_string));
            description = description.or(file.description);
            distribution = distribution.or(file.distribution);
            rules.extend(file.rules.into_iter().map(RuleFile::compile));
        }

        let mut policy = Policy::new(
            name.unwrap_or_else(|| {
                sources
                    .first()
                    .map(|(origin, _)| origin.clone())
                    .unwrap_or_else(|| "unnamed policy".to_string())
            }),
            rules,
        );
        policy.version = version;
        policy.description = description;
        policy.distribution = distribution;
        Ok(policy)
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Read a policy file, or the `*.yaml` / `*.yml` / `*.json` files of a
/// directory in file-name order.
fn read_sources(path: &Path) -> std::io::Result<Vec<(String, String)>> {
    if !path.is_dir() {
        let text = fs::read_to_string(path)?;
        return Ok(vec![(path.display().to_string(), text)]);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml" | "yml" | "json")
            )
        })
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|file| {
            let text = fs::read_to_string(&file)?;
            Ok((file.display().to_string(), text))
        })
        .collect()
}

/// The policy governing evaluations, and whether it is the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePolicy {
    pub policy: Policy,
    pub using_default: bool,
}

impl ActivePolicy {
    pub fn new(policy: Policy, default: &Policy) -> Self {
        if policy.is_empty() {
            tracing::warn!(policy = %policy.name, "policy has no rules; using the default policy");
            return Self::fallback(default);
        }
        Self {
            policy,
            using_default: false,
        }
    }

    pub fn fallback(default: &Policy) -> Self {
        Self {
            policy: default.clone(),
            using_default: true,
        }
    }

    /// Pick the policy for `source`, substituting `default` when the source is
    /// absent, missing on disk, unreadable, or has no rules.
    ///
    /// A source that exists but does not parse is a [`DataError`].
    pub fn select(source: Option<&Path>, default: &Policy) -> Result<Self, DataError> {
        let Some(path) = source else {
            tracing::debug!("no policy configured; using the default policy");
            return Ok(Self::fallback(default));
        };

        if !path.exists() {
            tracing::warn!(path = %path.display(), "policy not found; using the default policy");
            return Ok(Self::fallback(default));
        }

        let sources = match read_sources(path) {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "policy unreadable ({e}); using the default policy"
                );
                return Ok(Self::fallback(default));
            }
        };

        let policy = Policy::from_sources(&sources)?;
        tracing::info!(
            path = %path.display(),
            policy = %policy.name,
            rules = policy.rules().len(),
            "loaded policy"
        );
        Ok(Self::new(policy, default))
    }
}
