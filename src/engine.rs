//! Public entry points.
//!
//! Every call that takes a caller-supplied license identifier admits it
//! through [`validate_license_id`] (and [`validate_license_path`] for
//! directory-backed stores) before the store is consulted.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::compat::{self, CompatibilityReport};
use crate::error::{DataError, EngineError, ValidationError};
use crate::license::store::LicenseStore;
use crate::models::{License, LinkContext, LinkingMode};
use crate::obligations::{assemble, ObligationRecord};
use crate::policy::aggregate::{aggregate, Decision, LicenseEvaluation};
use crate::policy::matcher::match_one;
use crate::policy::{ActivePolicy, EvaluationContext, Policy};
use crate::validate::{validate_license_id, validate_license_path, LicenseId};

/// Incoming evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub licenses_found: Vec<String>,
    pub distribution: String,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default)]
    pub project_type: Option<String>,
}

fn default_context() -> String {
    LinkContext::General.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(flatten)]
    pub decision: Decision,
    pub policy_name: String,
    pub using_default_policy: bool,
    pub distribution: String,
    pub context: LinkContext,
    pub project_type: Option<String>,
}

/// License policy engine.
///
/// The record store is shared read-only. The active policy is an immutable
/// snapshot behind a lock that is only held long enough to clone or replace
/// the `Arc`, so a reload never disturbs an evaluation already in flight.
#[derive(Debug)]
pub struct PolicyEngine {
    store: Arc<LicenseStore>,
    default_policy: Arc<Policy>,
    current: RwLock<Arc<ActivePolicy>>,
}

impl PolicyEngine {
    /// Engine governed by `default_policy` until a policy is loaded.
    pub fn new(store: LicenseStore, default_policy: Policy) -> Self {
        let active = ActivePolicy::fallback(&default_policy);
        Self {
            store: Arc::new(store),
            default_policy: Arc::new(default_policy),
            current: RwLock::new(Arc::new(active)),
        }
    }

    /// Engine governed by the policy at `source`, see [`ActivePolicy::select`].
    pub fn with_policy_source(
        store: LicenseStore,
        default_policy: Policy,
        source: Option<&Path>,
    ) -> Result<Self, DataError> {
        let engine = Self::new(store, default_policy);
        engine.reload_policy(source)?;
        Ok(engine)
    }

    pub fn store(&self) -> &LicenseStore {
        &self.store
    }

    /// Snapshot of the policy currently in force.
    pub fn policy(&self) -> Arc<ActivePolicy> {
        Arc::clone(&self.current.read())
    }

    /// Build a new snapshot from `source` and swap it in.
    ///
    /// On error the previous policy stays active.
    pub fn reload_policy(&self, source: Option<&Path>) -> Result<Arc<ActivePolicy>, DataError> {
        let active = Arc::new(ActivePolicy::select(source, &self.default_policy)?);
        *self.current.write() = Arc::clone(&active);
        Ok(active)
    }

    pub fn replace_policy(&self, policy: Policy) -> Arc<ActivePolicy> {
        let active = Arc::new(ActivePolicy::new(policy, &self.default_policy));
        *self.current.write() = Arc::clone(&active);
        active
    }

    fn admit(&self, raw: &str) -> Result<LicenseId, EngineError> {
        let id = validate_license_id(raw)?;
        if let Some(base) = self.store.base_dir() {
            validate_license_path(base, id.as_str(), "json")?;
        }
        Ok(id)
    }

    /// Single-license lookup.
    pub fn license(&self, id: &str) -> Result<&License, EngineError> {
        let id = self.admit(id)?;
        self.store.get(&id)
    }

    pub fn obligations(&self, id: &str) -> Result<ObligationRecord, EngineError> {
        self.license(id).map(assemble)
    }

    /// Evaluate every license in `request` against the active policy.
    ///
    /// All identifiers are validated before any is looked up. Repeated
    /// identifiers are evaluated once.
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EngineError> {
        let linking: LinkContext = request
            .context
            .parse()
            .map_err(|_| ValidationError::UnknownContext(request.context.clone()))?;

        let mut ids: Vec<LicenseId> = Vec::with_capacity(request.licenses_found.len());
        for raw in &request.licenses_found {
            let id = self.admit(raw)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let licenses = ids
            .iter()
            .map(|id| self.store.get(id))
            .collect::<Result<Vec<_>, _>>()?;

        let active = self.policy();
        let ctx = EvaluationContext {
            licenses: ids,
            distribution: request.distribution.clone(),
            linking,
            project_type: request.project_type.clone(),
        };

        let evaluations = licenses
            .into_iter()
            .map(|license| LicenseEvaluation {
                license: license.id.clone(),
                verdict: match_one(license, &ctx, &active.policy),
                obligations: assemble(license),
            })
            .collect();
        let decision = aggregate(evaluations);

        tracing::info!(
            licenses = ctx.licenses.len(),
            distribution = %ctx.distribution,
            context = %ctx.linking,
            action = %decision.action,
            using_default_policy = active.using_default,
            "evaluated licenses"
        );

        Ok(EvaluationResult {
            decision,
            policy_name: active.policy.name.clone(),
            using_default_policy: active.using_default,
            distribution: ctx.distribution,
            context: ctx.linking,
            project_type: ctx.project_type,
        })
    }

    /// Pairwise compatibility of two licenses.
    pub fn check_compatibility(
        &self,
        a: &str,
        b: &str,
        mode: LinkingMode,
    ) -> Result<CompatibilityReport, EngineError> {
        let a = self.admit(a)?;
        let b = self.admit(b)?;
        compat::resolve_pair(&self.store, &a, &b, mode)
    }

    /// Compatibility of every unordered pair of distinct identifiers in `ids`.
    pub fn compatibility_matrix<S: AsRef<str>>(
        &self,
        ids: &[S],
        mode: LinkingMode,
    ) -> Result<Vec<CompatibilityReport>, EngineError> {
        let mut admitted: Vec<LicenseId> = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = self.admit(raw.as_ref())?;
            if !admitted.contains(&id) {
                admitted.push(id);
            }
        }

        let mut reports = Vec::new();
        for (i, a) in admitted.iter().enumerate() {
            for b in &admitted[i + 1..] {
                reports.push(compat::resolve_pair(&self.store, a, b, mode)?);
            }
        }
        Ok(reports)
    }
}
