use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::obligations::ObligationRecord;
use crate::policy::matcher::Verdict;
use crate::policy::{Action, Severity};

/// One license's verdict and obligations, as fed to [`aggregate`].
#[derive(Debug, Clone)]
pub struct LicenseEvaluation {
    pub license: String,
    pub verdict: Verdict,
    pub obligations: ObligationRecord,
}

/// Combined decision over every evaluated license.
///
/// Every field is always present when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub severity: Severity,
    pub message: String,
    /// Requirements of every approved license, de-duplicated.
    pub requirements: Vec<String>,
    /// Remediation of every denied license, in evaluation order.
    pub remediation: Vec<String>,
    pub verdicts: BTreeMap<String, Verdict>,
    /// Obligations of every evaluated license, whatever its verdict.
    pub obligations: BTreeMap<String, ObligationRecord>,
}

/// Fold per-license results into one decision.
///
/// The overall action is the most restrictive one (`deny` > `review` >
/// `approve`). An empty input yields `review`.
pub fn aggregate(evaluations: Vec<LicenseEvaluation>) -> Decision {
    let Some(action) = evaluations.iter().map(|e| e.verdict.action).max() else {
        return Decision {
            action: Action::Review,
            severity: Action::Review.default_severity(),
            message: "No licenses were evaluated".to_string(),
            requirements: Vec::new(),
            remediation: Vec::new(),
            verdicts: BTreeMap::new(),
            obligations: BTreeMap::new(),
        };
    };

    let driving: Vec<&LicenseEvaluation> = evaluations
        .iter()
        .filter(|e| e.verdict.action == action)
        .collect();

    let severity = driving
        .iter()
        .map(|e| e.verdict.severity)
        .max()
        .unwrap_or(action.default_severity());

    let label = match action {
        Action::Deny => "Denied",
        Action::Review => "Review required",
        Action::Approve => "Approved",
    };
    let message = format!(
        "{label}: {}",
        driving
            .iter()
            .map(|e| format!("{} ({})", e.license, e.verdict.message))
            .collect::<Vec<_>>()
            .join("; ")
    );

    let mut requirements: Vec<String> = Vec::new();
    let mut remediation = Vec::new();
    for e in &evaluations {
        match e.verdict.action {
            Action::Approve => {
                for requirement in &e.verdict.requirements {
                    if !requirements.contains(requirement) {
                        requirements.push(requirement.clone());
                    }
                }
            }
            Action::Deny => remediation.extend(e.verdict.remediation.clone()),
            Action::Review => {}
        }
    }

    let mut verdicts = BTreeMap::new();
    let mut obligations = BTreeMap::new();
    for e in evaluations {
        verdicts.insert(e.license.clone(), e.verdict);
        obligations.insert(e.license, e.obligations);
    }

    Decision {
        action,
        severity,
        message,
        requirements,
        remediation,
        verdicts,
        obligations,
    }
}
