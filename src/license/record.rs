//! On-disk license record formats.
//!
//! Two shapes are accepted and both convert into [`License`]:
//!
//! - the structured record (JSON), standalone or inside a master database
//!   `{"version": .., "licenses": {ID: record}}`;
//! - the legacy markup record (YAML) with a top-level `license:` key and
//!   `type` / `properties` / `requirements` field names.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::DataError;
use crate::models::{
    Category, Compatibility, Conditions, ContaminationEffect, License, Limitations,
    LinkingRules, Permissions,
};

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
struct LicenseRecord {
    id: String,
    name: String,
    category: Category,
    #[serde(default, deserialize_with = "null_as_default")]
    permissions: Permissions,
    #[serde(default, deserialize_with = "null_as_default")]
    conditions: Conditions,
    #[serde(default, deserialize_with = "null_as_default")]
    limitations: Limitations,
    #[serde(default, deserialize_with = "null_as_default")]
    obligations: Vec<String>,
    #[serde(
        default,
        alias = "compatibility_rules",
        deserialize_with = "null_as_default"
    )]
    compatibility: CompatibilityRecord,
    #[serde(default)]
    contamination_effect: Option<ContaminationEffect>,
}

#[derive(Debug, Default, Deserialize)]
struct CompatibilityRecord {
    #[serde(default)]
    static_linking: LinkingRules,
    #[serde(default)]
    dynamic_linking: LinkingRules,
    #[serde(default)]
    contamination_effect: Option<ContaminationEffect>,
}

impl CompatibilityRecord {
    fn into_compatibility(self, top_level: Option<ContaminationEffect>) -> Compatibility {
        Compatibility {
            static_linking: self.static_linking,
            dynamic_linking: self.dynamic_linking,
            contamination_effect: top_level
                .or(self.contamination_effect)
                .unwrap_or_default(),
        }
    }
}

impl LicenseRecord {
    fn into_license(self) -> License {
        License {
            compatibility: self.compatibility.into_compatibility(self.contamination_effect),
            id: self.id,
            name: self.name,
            category: self.category,
            permissions: self.permissions,
            conditions: self.conditions,
            limitations: self.limitations,
            obligations: self.obligations,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LicenseDatabase {
    licenses: BTreeMap<String, LicenseRecord>,
}

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    license: LegacyRecord,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", alias = "category")]
    category: Category,
    #[serde(default, alias = "permissions", deserialize_with = "null_as_default")]
    properties: Permissions,
    #[serde(default, alias = "conditions", deserialize_with = "null_as_default")]
    requirements: Conditions,
    #[serde(default, deserialize_with = "null_as_default")]
    limitations: Limitations,
    #[serde(default, deserialize_with = "null_as_default")]
    compatibility: CompatibilityRecord,
    #[serde(default, deserialize_with = "null_as_default")]
    obligations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    key_requirements: Vec<String>,
}

impl LegacyRecord {
    fn into_license(self) -> License {
        let mut obligations = self.obligations;
        for requirement in self.key_requirements {
            if !obligations.contains(&requirement) {
                obligations.push(requirement);
            }
        }

        License {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            category: self.category,
            permissions: self.properties,
            conditions: self.requirements,
            limitations: self.limitations,
            obligations,
            compatibility: self.compatibility.into_compatibility(None),
        }
    }
}

/// Parse a standalone structured (JSON) record.
pub fn parse_structured(text: &str, origin: &str) -> Result<License, DataError> {
    let record: LicenseRecord = serde_json::from_str(text).map_err(|e| DataError::Record {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;
    Ok(record.into_license())
}

/// Parse a legacy markup (YAML) record.
pub fn parse_legacy(text: &str, origin: &str) -> Result<License, DataError> {
    let document: LegacyDocument = serde_yaml::from_str(text).map_err(|e| DataError::Record {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;
    Ok(document.license.into_license())
}

/// Parse a master database. Each map key must equal the record's `id`.
pub fn parse_database(text: &str, origin: &str) -> Result<Vec<License>, DataError> {
    let database: LicenseDatabase = serde_json::from_str(text).map_err(|e| DataError::Record {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;

    database
        .licenses
        .into_iter()
        .map(|(key, record)| {
            if key != record.id {
                return Err(DataError::IdMismatch {
                    origin: origin.to_string(),
                    expected: key,
                    found: record.id,
                });
            }
            Ok(record.into_license())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Target;

    #[test]
    fn test_structured_record_with_generator_layout() {
        let text = r#"{
            "id": "LGPL-2.1",
            "name": "GNU Lesser General Public License v2.1",
            "category": "copyleft_weak",
            "permissions": {"commercial_use": true, "distribution": true},
            "conditions": {"disclose_source": true, "include_license": true},
            "limitations": {"liability": true, "warranty": true},
            "obligations": ["Allow relinking"],
            "compatibility_rules": {
                "static_linking": {
                    "compatible_with": ["category:permissive", "LGPL-2.1"],
                    "requires_review": ["category:copyleft_strong"]
                },
                "dynamic_linking": {"compatible_with": ["category:any"]},
                "contamination_effect": "module",
                "notes": "ignored"
            }
        }"#;

        let license = parse_structured(text, "LGPL-2.1.json").unwrap();
        assert_eq!(license.category, Category::WeakCopyleft);
        assert!(license.conditions.disclose_source);
        assert!(!license.permissions.patent_grant);
        assert_eq!(
            license.compatibility.contamination_effect,
            ContaminationEffect::Module
        );
        assert_eq!(
            license.compatibility.static_linking.requires_review,
            vec![Target::Category(Category::StrongCopyleft)]
        );
        assert_eq!(license.compatibility.dynamic_linking.compatible_with, vec![Target::Any]);
    }

    #[test]
    fn test_top_level_contamination_wins() {
        let text = r#"{
            "id": "GPL-3.0", "name": "GPL", "category": "strong-copyleft",
            "compatibility": {"contamination_effect": "derivative"},
            "contamination_effect": "full"
        }"#;
        let license = parse_structured(text, "GPL-3.0.json").unwrap();
        assert_eq!(license.compatibility.contamination_effect, ContaminationEffect::Full);
    }

    #[test]
    fn test_missing_category_is_data_error() {
        let text = r#"{"id": "MIT", "name": "MIT License"}"#;
        assert!(matches!(
            parse_structured(text, "MIT.json"),
            Err(DataError::Record { .. })
        ));
    }

    #[test]
    fn test_null_sections_default_to_empty() {
        let text = r#"{
            "id": "Zlib", "name": "zlib License", "category": "permissive",
            "permissions": null, "conditions": null, "limitations": null,
            "obligations": null, "compatibility_rules": null
        }"#;
        let license = parse_structured(text, "Zlib.json").unwrap();
        assert_eq!(license.permissions, Permissions::default());
        assert_eq!(license.conditions, Conditions::default());
        assert_eq!(license.limitations, Limitations::default());
        assert!(license.obligations.is_empty());
        assert_eq!(license.compatibility, Compatibility::default());
    }

    #[test]
    fn test_mistyped_flag_is_data_error() {
        let text = r#"{
            "id": "MIT", "name": "MIT License", "category": "permissive",
            "permissions": {"commercial_use": "yes"}
        }"#;
        assert!(parse_structured(text, "MIT.json").is_err());
    }

    #[test]
    fn test_unknown_category_tag_is_data_error() {
        let text = r#"{
            "id": "MIT", "name": "MIT License", "category": "permissive",
            "compatibility": {"static_linking": {"compatible_with": ["category:viral"]}}
        }"#;
        assert!(parse_structured(text, "MIT.json").is_err());
    }

    #[test]
    fn test_legacy_record() {
        let text = r#"
license:
  id: MIT
  type: permissive
  properties:
    commercial_use: true
    distribution: true
  requirements:
    include_license: true
    include_copyright: true
  compatibility:
    static_linking:
      compatible_with: ["category:any"]
  obligations:
    - Include license text
  key_requirements:
    - Include license text
    - Attribution required
"#;
        let license = parse_legacy(text, "MIT.yaml").unwrap();
        assert_eq!(license.name, "MIT");
        assert!(license.conditions.include_copyright);
        assert_eq!(
            license.obligations,
            vec!["Include license text", "Attribution required"]
        );
        assert_eq!(license.compatibility.static_linking.compatible_with, vec![Target::Any]);
    }

    #[test]
    fn test_legacy_empty_sections_default_to_empty() {
        let text = "license:\n  id: ISC\n  type: permissive\n  properties:\n  requirements:\n  key_requirements:\n";
        let license = parse_legacy(text, "ISC.yaml").unwrap();
        assert_eq!(license.permissions, Permissions::default());
        assert_eq!(license.conditions, Conditions::default());
        assert!(license.obligations.is_empty());
    }

    #[test]
    fn test_database_key_must_match_id() {
        let text = r#"{"version": "1.0", "licenses": {
            "MIT": {"id": "ISC", "name": "ISC", "category": "permissive"}
        }}"#;
        assert!(matches!(
            parse_database(text, "db.json"),
            Err(DataError::IdMismatch { .. })
        ));
    }
}
