//! End-to-end behavior of the engine against the embedded dataset and the
//! built-in default policy.

use std::path::Path;

use license_policy::compat::{Basis, CompatibilityVerdict};
use license_policy::license::store::LicenseStore;
use license_policy::models::LinkingMode;
use license_policy::obligations::assemble;
use license_policy::policy::{Action, Policy};
use license_policy::{EngineError, EvaluationRequest, PolicyEngine, ValidationError};

fn engine() -> PolicyEngine {
    PolicyEngine::new(
        LicenseStore::embedded().unwrap(),
        Policy::embedded_default().unwrap(),
    )
}

fn request(licenses: &[&str], distribution: &str) -> EvaluationRequest {
    EvaluationRequest {
        licenses_found: licenses.iter().map(|l| l.to_string()).collect(),
        distribution: distribution.to_string(),
        context: "general".to_string(),
        project_type: None,
    }
}

#[test]
fn test_mit_commercial_is_approved_with_requirements() {
    let result = engine().evaluate(&request(&["MIT"], "commercial")).unwrap();

    assert_eq!(result.decision.action, Action::Approve);
    assert!(!result.decision.requirements.is_empty());
    assert!(result.decision.remediation.is_empty());
    assert!(result.using_default_policy);
}

#[test]
fn test_gpl3_mobile_is_denied_with_remediation() {
    let result = engine().evaluate(&request(&["GPL-3.0"], "mobile")).unwrap();

    assert_eq!(result.decision.action, Action::Deny);
    assert!(!result.decision.remediation.is_empty());
    assert!(result.decision.message.contains("GPL-3.0"));
}

#[test]
fn test_mixed_set_keeps_every_deny_remediation() {
    let engine = engine();
    let result = engine
        .evaluate(&request(&["MIT", "GPL-3.0", "GPL-2.0", "LGPL-2.1"], "commercial"))
        .unwrap();

    assert_eq!(result.decision.action, Action::Deny);
    assert_eq!(result.decision.verdicts.len(), 4);
    assert_eq!(result.decision.obligations.len(), 4);

    let denied: Vec<_> = result
        .decision
        .verdicts
        .values()
        .filter(|v| v.action == Action::Deny)
        .collect();
    assert_eq!(denied.len(), 2);
    for verdict in denied {
        let text = verdict.remediation.as_ref().unwrap();
        assert!(result.decision.remediation.contains(text));
    }
}

#[test]
fn test_agpl_saas_is_denied_before_generic_copyleft_rule() {
    let result = engine().evaluate(&request(&["AGPL-3.0"], "saas")).unwrap();
    assert_eq!(result.decision.action, Action::Deny);
    assert_eq!(
        result.decision.verdicts["AGPL-3.0"].rule.as_deref(),
        Some("network_copyleft_saas")
    );

    let result = engine().evaluate(&request(&["GPL-3.0"], "saas")).unwrap();
    assert_eq!(result.decision.action, Action::Approve);
}

#[test]
fn test_weak_copyleft_depends_on_linking_context() {
    let engine = engine();

    let mut req = request(&["LGPL-2.1"], "commercial");
    req.context = "static_linking".to_string();
    assert_eq!(engine.evaluate(&req).unwrap().decision.action, Action::Review);

    req.context = "dynamic_linking".to_string();
    assert_eq!(engine.evaluate(&req).unwrap().decision.action, Action::Approve);
}

#[test]
fn test_gpl2_apache_static_is_incompatible() {
    let engine = engine();

    let report = engine
        .check_compatibility("GPL-2.0", "Apache-2.0", LinkingMode::Static)
        .unwrap();
    assert_eq!(report.verdict, CompatibilityVerdict::Incompatible);

    let reversed = engine
        .check_compatibility("Apache-2.0", "GPL-2.0", LinkingMode::Static)
        .unwrap();
    assert_eq!(reversed.verdict, CompatibilityVerdict::Incompatible);
}

#[test]
fn test_gpl3_apache_is_not_incompatible() {
    let report = engine()
        .check_compatibility("GPL-3.0", "Apache-2.0", LinkingMode::Static)
        .unwrap();
    assert_ne!(report.verdict, CompatibilityVerdict::Incompatible);
}

#[test]
fn test_explicit_override_beats_permissive_default() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Alpha-1.0.json",
        r#"{"id": "Alpha-1.0", "name": "Alpha", "category": "permissive",
            "compatibility": {"static_linking": {"incompatible_with": ["Beta-1.0"]}}}"#,
    );
    write(
        dir.path(),
        "Beta-1.0.json",
        r#"{"id": "Beta-1.0", "name": "Beta", "category": "permissive",
            "compatibility": {"static_linking": {"incompatible_with": ["Alpha-1.0"]}}}"#,
    );
    let engine = PolicyEngine::new(
        LicenseStore::from_dir(dir.path()).unwrap(),
        Policy::embedded_default().unwrap(),
    );

    let report = engine
        .check_compatibility("Beta-1.0", "Alpha-1.0", LinkingMode::Static)
        .unwrap();
    assert_eq!(report.verdict, CompatibilityVerdict::Incompatible);

    let dynamic = engine
        .check_compatibility("Beta-1.0", "Alpha-1.0", LinkingMode::Dynamic)
        .unwrap();
    assert_eq!(dynamic.verdict, CompatibilityVerdict::Compatible);
    assert_eq!(dynamic.basis, Basis::CategoryDefault);
}

#[test]
fn test_traversal_rejected_at_every_entry_point() {
    let engine = engine();
    let bad = "../../etc/passwd";

    assert!(matches!(engine.license(bad), Err(EngineError::Validation(_))));
    assert!(matches!(engine.obligations(bad), Err(EngineError::Validation(_))));
    assert!(matches!(
        engine.evaluate(&request(&["MIT", bad], "commercial")),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.check_compatibility("MIT", bad, LinkingMode::Static),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.check_compatibility(bad, "MIT", LinkingMode::Dynamic),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.compatibility_matrix(&["MIT", bad], LinkingMode::Static),
        Err(EngineError::Validation(_))
    ));
}

#[test]
fn test_traversal_never_reaches_files_outside_data_dir() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("licenses");
    std::fs::create_dir(&data).unwrap();
    write(
        &data,
        "MIT.json",
        r#"{"id": "MIT", "name": "MIT License", "category": "permissive"}"#,
    );
    // A record that would be found if the identifier were joined blindly.
    write(
        root.path(),
        "Secret.json",
        r#"{"id": "Secret", "name": "Secret", "category": "proprietary"}"#,
    );

    let engine = PolicyEngine::new(
        LicenseStore::from_dir(&data).unwrap(),
        Policy::embedded_default().unwrap(),
    );

    for bad in ["../Secret", "..\\Secret", "..", ".hidden", "/etc/passwd"] {
        let err = engine.license(bad).unwrap_err();
        assert!(
            matches!(err, EngineError::Validation(_)),
            "{bad:?} produced {err:?}"
        );
    }
    assert!(matches!(
        engine.license("Secret"),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn test_empty_identifier_is_rejected() {
    assert!(matches!(
        engine().license(""),
        Err(EngineError::Validation(ValidationError::Empty))
    ));
}

#[test]
fn test_assemble_is_independent_of_policy() {
    let engine = engine();
    let under_default = engine.evaluate(&request(&["GPL-3.0"], "commercial")).unwrap();

    engine.replace_policy(
        Policy::from_yaml_str(
            "name: lenient\nrules:\n  - id: allow\n    then: {action: approve}\n",
            "inline",
        )
        .unwrap(),
    );
    let under_lenient = engine.evaluate(&request(&["GPL-3.0"], "commercial")).unwrap();

    assert_ne!(under_default.decision.action, under_lenient.decision.action);
    assert_eq!(
        under_default.decision.obligations["GPL-3.0"],
        under_lenient.decision.obligations["GPL-3.0"]
    );
    assert_eq!(
        under_lenient.decision.obligations["GPL-3.0"],
        assemble(engine.license("GPL-3.0").unwrap())
    );
}

#[test]
fn test_policy_file_replaces_default() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "policy.yaml",
        "name: strict\nrules:\n  - id: permissive_only\n    when: {license_type: permissive}\n    then: {action: approve}\n",
    );
    let engine = PolicyEngine::with_policy_source(
        LicenseStore::embedded().unwrap(),
        Policy::embedded_default().unwrap(),
        Some(&dir.path().join("policy.yaml")),
    )
    .unwrap();

    let result = engine.evaluate(&request(&["MIT", "MPL-2.0"], "commercial")).unwrap();
    assert!(!result.using_default_policy);
    assert_eq!(result.policy_name, "strict");
    assert_eq!(result.decision.action, Action::Review);
    assert_eq!(result.decision.verdicts["MPL-2.0"].rule, None);
}

#[test]
fn test_missing_policy_file_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let engine = PolicyEngine::with_policy_source(
        LicenseStore::embedded().unwrap(),
        Policy::embedded_default().unwrap(),
        Some(&dir.path().join("absent.yaml")),
    )
    .unwrap();

    let result = engine.evaluate(&request(&["MIT"], "commercial")).unwrap();
    assert!(result.using_default_policy);
}

#[test]
fn test_result_json_field_set_is_stable() {
    let result = engine().evaluate(&request(&["MIT"], "commercial")).unwrap();
    let value = serde_json::to_value(&result).unwrap();
    let object = value.as_object().unwrap();

    for field in [
        "action",
        "severity",
        "message",
        "requirements",
        "remediation",
        "verdicts",
        "obligations",
        "policy_name",
        "using_default_policy",
        "distribution",
        "context",
        "project_type",
    ] {
        assert!(object.contains_key(field), "missing `{field}`");
    }
    assert_eq!(object["action"], "approve");
    assert_eq!(object["context"], "general");
    assert!(object["project_type"].is_null());
    assert!(object["verdicts"]["MIT"]["remediation"].is_null());

    let obligations = &object["obligations"]["MIT"];
    for field in [
        "permissions",
        "requirements",
        "limitations",
        "obligations",
        "attribution_required",
        "source_disclosure_required",
        "notice_required",
        "contamination_effect",
    ] {
        assert!(obligations.get(field).is_some(), "missing obligations `{field}`");
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}
