use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A license record as held by the [`LicenseStore`](crate::license::store::LicenseStore).
///
/// Built once from a dataset and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub permissions: Permissions,
    pub conditions: Conditions,
    pub limitations: Limitations,
    pub obligations: Vec<String>,
    pub compatibility: Compatibility,
}

impl License {
    /// Compatibility rules for one linking mode.
    pub fn rules(&self, mode: LinkingMode) -> &LinkingRules {
        match mode {
            LinkingMode::Static => &self.compatibility.static_linking,
            LinkingMode::Dynamic => &self.compatibility.dynamic_linking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Permissive,
    #[serde(alias = "copyleft_weak", alias = "weak_copyleft")]
    WeakCopyleft,
    #[serde(alias = "copyleft_strong", alias = "strong_copyleft")]
    StrongCopyleft,
    Proprietary,
    #[serde(alias = "public_domain")]
    PublicDomain,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Permissive,
        Category::WeakCopyleft,
        Category::StrongCopyleft,
        Category::Proprietary,
        Category::PublicDomain,
    ];

    /// Canonical tag, as written in datasets and policies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Permissive => "permissive",
            Category::WeakCopyleft => "weak-copyleft",
            Category::StrongCopyleft => "strong-copyleft",
            Category::Proprietary => "proprietary",
            Category::PublicDomain => "public-domain",
        }
    }

    /// Permissive and public-domain licenses impose no copyleft.
    pub fn is_permissive_like(&self) -> bool {
        matches!(self, Category::Permissive | Category::PublicDomain)
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the canonical kebab-case tags and the generator's snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "permissive" => Ok(Category::Permissive),
            "weak-copyleft" | "copyleft-weak" => Ok(Category::WeakCopyleft),
            "strong-copyleft" | "copyleft-strong" => Ok(Category::StrongCopyleft),
            "proprietary" => Ok(Category::Proprietary),
            "public-domain" => Ok(Category::PublicDomain),
            other => Err(format!("unknown license category `{other}`")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Permissive => write!(f, "Permissive"),
            Category::WeakCopyleft => write!(f, "Weak Copyleft"),
            Category::StrongCopyleft => write!(f, "Strong Copyleft"),
            Category::Proprietary => write!(f, "Proprietary"),
            Category::PublicDomain => write!(f, "Public Domain"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub commercial_use: bool,
    pub distribution: bool,
    pub modification: bool,
    pub patent_grant: bool,
    pub private_use: bool,
}

impl Permissions {
    /// `(name, granted)` pairs in canonical order.
    pub fn flags(&self) -> [(&'static str, bool); 5] {
        [
            ("commercial_use", self.commercial_use),
            ("distribution", self.distribution),
            ("modification", self.modification),
            ("patent_grant", self.patent_grant),
            ("private_use", self.private_use),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    pub disclose_source: bool,
    pub include_license: bool,
    pub include_copyright: bool,
    pub include_notice: bool,
    pub state_changes: bool,
    pub same_license: bool,
    pub network_use_disclosure: bool,
}

impl Conditions {
    pub fn flags(&self) -> [(&'static str, bool); 7] {
        [
            ("disclose_source", self.disclose_source),
            ("include_license", self.include_license),
            ("include_copyright", self.include_copyright),
            ("include_notice", self.include_notice),
            ("state_changes", self.state_changes),
            ("same_license", self.same_license),
            ("network_use_disclosure", self.network_use_disclosure),
        ]
    }
}

/// `true` means the license does NOT provide the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limitations {
    pub liability: bool,
    pub warranty: bool,
    pub trademark_use: bool,
}

impl Limitations {
    pub fn flags(&self) -> [(&'static str, bool); 3] {
        [
            ("liability", self.liability),
            ("warranty", self.warranty),
            ("trademark_use", self.trademark_use),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compatibility {
    pub static_linking: LinkingRules,
    pub dynamic_linking: LinkingRules,
    pub contamination_effect: ContaminationEffect,
}

/// Explicit compatibility entries for one linking mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingRules {
    pub compatible_with: Vec<Target>,
    pub incompatible_with: Vec<Target>,
    pub requires_review: Vec<Target>,
}

/// One entry of a compatibility list: a license identifier or a category tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    License(String),
    Category(Category),
    Any,
}

impl Target {
    /// Whether this entry names `license`, either directly or by category.
    pub fn matches(&self, license: &License) -> bool {
        match self {
            Target::License(id) => id == &license.id,
            Target::Category(category) => *category == license.category,
            Target::Any => true,
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("category:") {
            Some("any") => Ok(Target::Any),
            Some(tag) => tag.parse().map(Target::Category),
            None => Ok(Target::License(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::License(id) => write!(f, "{id}"),
            Target::Category(category) => write!(f, "category:{}", category.as_str()),
            Target::Any => write!(f, "category:any"),
        }
    }
}

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Scope over which a copyleft license's terms propagate to combined code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContaminationEffect {
    #[default]
    None,
    Module,
    Derivative,
    Full,
}

impl fmt::Display for ContaminationEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContaminationEffect::None => write!(f, "none"),
            ContaminationEffect::Module => write!(f, "module"),
            ContaminationEffect::Derivative => write!(f, "derivative"),
            ContaminationEffect::Full => write!(f, "full"),
        }
    }
}

/// Linking mode used for pairwise compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkingMode {
    #[serde(rename = "static_linking")]
    Static,
    #[serde(rename = "dynamic_linking")]
    Dynamic,
}

impl FromStr for LinkingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "static_linking" | "static" => Ok(LinkingMode::Static),
            "dynamic_linking" | "dynamic" => Ok(LinkingMode::Dynamic),
            other => Err(format!("unknown linking mode `{other}`")),
        }
    }
}

impl fmt::Display for LinkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkingMode::Static => write!(f, "static_linking"),
            LinkingMode::Dynamic => write!(f, "dynamic_linking"),
        }
    }
}

/// Linking context of an evaluation request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkContext {
    #[serde(rename = "static_linking")]
    Static,
    #[serde(rename = "dynamic_linking")]
    Dynamic,
    #[default]
    #[serde(rename = "general")]
    General,
}

impl LinkContext {
    /// `general` falls back to static linking, the more conservative mode.
    pub fn linking_mode(&self) -> LinkingMode {
        match self {
            LinkContext::Static | LinkContext::General => LinkingMode::Static,
            LinkContext::Dynamic => LinkingMode::Dynamic,
        }
    }
}

impl FromStr for LinkContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "general" => Ok(LinkContext::General),
            other => other.parse::<LinkingMode>().map(|mode| match mode {
                LinkingMode::Static => LinkContext::Static,
                LinkingMode::Dynamic => LinkContext::Dynamic,
            }),
        }
    }
}

impl fmt::Display for LinkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkContext::Static => write!(f, "static_linking"),
            LinkContext::Dynamic => write!(f, "dynamic_linking"),
            LinkContext::General => write!(f, "general"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_accepts_generator_spellings() {
        assert_eq!("copyleft_strong".parse(), Ok(Category::StrongCopyleft));
        assert_eq!("copyleft_weak".parse(), Ok(Category::WeakCopyleft));
        assert_eq!("public_domain".parse(), Ok(Category::PublicDomain));
        assert_eq!("weak-copyleft".parse(), Ok(Category::WeakCopyleft));
        assert!("viral".parse::<Category>().is_err());
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("category:any".parse(), Ok(Target::Any));
        assert_eq!(
            "category:permissive".parse(),
            Ok(Target::Category(Category::Permissive))
        );
        assert_eq!(
            "Apache-2.0".parse(),
            Ok(Target::License("Apache-2.0".to_string()))
        );
        assert!("category:unheard-of".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_serializes_as_tag() {
        let json = serde_json::to_string(&Target::Category(Category::StrongCopyleft)).unwrap();
        assert_eq!(json, "\"category:strong-copyleft\"");
    }

    #[test]
    fn test_general_context_maps_to_static() {
        assert_eq!(LinkContext::General.linking_mode(), LinkingMode::Static);
        assert_eq!(LinkContext::Dynamic.linking_mode(), LinkingMode::Dynamic);
        assert_eq!("general".parse(), Ok(LinkContext::General));
        assert_eq!("static".parse(), Ok(LinkContext::Static));
    }
}
