use serde::{Deserialize, Serialize};

use crate::models::{Category, ContaminationEffect, License};

/// Caller-facing compliance summary of one license.
///
/// Depends only on the license record, never on the active policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationRecord {
    pub license: String,
    pub name: String,
    pub category: Category,
    /// Granted permissions.
    pub permissions: Vec<String>,
    /// Conditions that apply.
    pub requirements: Vec<String>,
    /// What the license does not provide.
    pub limitations: Vec<String>,
    pub obligations: Vec<String>,
    pub attribution_required: bool,
    pub source_disclosure_required: bool,
    pub notice_required: bool,
    pub contamination_effect: ContaminationEffect,
}

pub fn assemble(license: &License) -> ObligationRecord {
    ObligationRecord {
        license: license.id.clone(),
        name: license.name.clone(),
        category: license.category,
        permissions: set_flags(&license.permissions.flags()),
        requirements: set_flags(&license.conditions.flags()),
        limitations: set_flags(&license.limitations.flags()),
        obligations: license.obligations.clone(),
        attribution_required: license.conditions.include_copyright,
        source_disclosure_required: license.conditions.disclose_source,
        notice_required: license.conditions.include_notice,
        contamination_effect: license.compatibility.contamination_effect,
    }
}

fn set_flags(flags: &[(&'static str, bool)]) -> Vec<String> {
    flags
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::store::LicenseStore;
    use crate::validate::validate_license_id;

    #[test]
    fn test_apache_projection() {
        let store = LicenseStore::embedded().unwrap();
        let apache = store.get(&validate_license_id("Apache-2.0").unwrap()).unwrap();
        let record = assemble(apache);

        assert_eq!(record.license, "Apache-2.0");
        assert_eq!(
            record.permissions,
            vec!["commercial_use", "distribution", "modification", "patent_grant", "private_use"]
        );
        assert!(record.requirements.contains(&"include_notice".to_string()));
        assert!(record.notice_required);
        assert!(record.attribution_required);
        assert!(!record.source_disclosure_required);
        assert_eq!(record.limitations, vec!["liability", "warranty", "trademark_use"]);
        assert_eq!(record.obligations, apache.obligations);
    }

    #[test]
    fn test_copyleft_flags() {
        let store = LicenseStore::embedded().unwrap();
        let agpl = store.get(&validate_license_id("AGPL-3.0").unwrap()).unwrap();
        let record = assemble(agpl);
        assert!(record.source_disclosure_required);
        assert!(record.requirements.contains(&"network_use_disclosure".to_string()));
        assert_eq!(record.contamination_effect, ContaminationEffect::Full);
    }

    #[test]
    fn test_public_domain_has_no_attribution() {
        let store = LicenseStore::embedded().unwrap();
        let cc0 = store.get(&validate_license_id("CC0-1.0").unwrap()).unwrap();
        let record = assemble(cc0);
        assert!(!record.attribution_required);
        assert!(record.requirements.is_empty());
        assert!(record.obligations.is_empty());
    }
}
