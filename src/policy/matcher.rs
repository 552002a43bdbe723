use serde::{Deserialize, Serialize};

use crate::models::License;
use crate::policy::{Action, EvaluationContext, Policy, Severity};

pub const NO_MATCH_MESSAGE: &str = "no matching policy rule";

/// Outcome of evaluating one license against a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub action: Action,
    pub severity: Severity,
    pub message: String,
    /// Only carried by `deny` verdicts.
    pub remediation: Option<String>,
    /// Only carried by `approve` verdicts.
    pub requirements: Vec<String>,
    /// Rule that produced the verdict, if any.
    pub rule: Option<String>,
}

impl Verdict {
    /// Conservative fallback when no rule applies.
    pub fn no_match(message: impl Into<String>) -> Self {
        Verdict {
            action: Action::Review,
            severity: Action::Review.default_severity(),
            message: message.into(),
            remediation: None,
            requirements: Vec::new(),
            rule: None,
        }
    }
}

/// Evaluate `license` against the rules of `policy` in priority order.
///
/// The first rule whose predicate fully holds decides. With no match, or when
/// a rule cannot be evaluated, the verdict is `review`.
pub fn match_one(license: &License, ctx: &EvaluationContext, policy: &Policy) -> Verdict {
    for rule in policy.rules() {
        match rule.predicate.evaluate(&rule.id, license, ctx) {
            Ok(true) => {
                tracing::debug!(license = %license.id, rule = %rule.id, action = %rule.outcome.action, "policy rule matched");
                let outcome = &rule.outcome;
                return Verdict {
                    action: outcome.action,
                    severity: outcome.severity,
                    message: outcome.message.clone(),
                    remediation: match outcome.action {
                        Action::Deny => outcome.remediation.clone(),
                        Action::Approve | Action::Review => None,
                    },
                    requirements: match outcome.action {
                        Action::Approve => outcome.requirements.clone(),
                        Action::Review | Action::Deny => Vec::new(),
                    },
                    rule: Some(rule.id.clone()),
                };
            }
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!(license = %license.id, rule = %rule.id, "policy rule evaluation failed: {e}");
                return Verdict::no_match(format!("{NO_MATCH_MESSAGE} ({e})"));
            }
        }
    }

    tracing::debug!(license = %license.id, policy = %policy.name, "no policy rule matched");
    Verdict::no_match(NO_MATCH_MESSAGE)
}
