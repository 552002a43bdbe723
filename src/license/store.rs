use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DataError, EngineError};
use crate::license::record::{parse_database, parse_legacy, parse_structured};
use crate::models::{License, LinkingMode, Target};
use crate::validate::{validate_license_id, validate_license_path, LicenseId};

/// Dataset compiled into the binary, used when no data source is configured.
const EMBEDDED_DATABASE: &str = include_str!("../../data/licenses.json");

/// Extensions tried for a record file, primary structured format first.
const STRUCTURED_EXT: &str = "json";
const LEGACY_EXTS: [&str; 2] = ["yaml", "yml"];

/// Where license records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Embedded,
    /// A master database file.
    Database(PathBuf),
    /// A directory of `<ID>.json` records with `<ID>.yaml` fallbacks.
    Directory(PathBuf),
}

/// A data-quality finding. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataWarning {
    /// `license` lists `target` as incompatible but `target` does not reciprocate.
    AsymmetricIncompatibility {
        license: String,
        target: String,
        mode: LinkingMode,
    },
    /// `license` lists its own identifier as incompatible.
    SelfIncompatibility { license: String, mode: LinkingMode },
    /// `license` names an identifier that is not in the dataset.
    UnknownReference {
        license: String,
        target: String,
        mode: LinkingMode,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::AsymmetricIncompatibility {
                license,
                target,
                mode,
            } => write!(
                f,
                "{license} lists {target} as incompatible under {mode}, but {target} has no reciprocal entry"
            ),
            DataWarning::SelfIncompatibility { license, mode } => write!(
                f,
                "{license} lists itself as incompatible under {mode}"
            ),
            DataWarning::UnknownReference {
                license,
                target,
                mode,
            } => write!(
                f,
                "{license} references unknown license {target} under {mode}"
            ),
        }
    }
}

/// Immutable in-memory index of license records.
///
/// Read-only after construction, so a shared reference can be used from any
/// number of threads without locking.
#[derive(Debug)]
pub struct LicenseStore {
    licenses: BTreeMap<String, License>,
    base_dir: Option<PathBuf>,
    warnings: Vec<DataWarning>,
}

impl LicenseStore {
    /// Build a store from already-parsed records.
    ///
    /// Fails on duplicate or malformed identifiers.
    pub fn from_licenses(licenses: impl IntoIterator<Item = License>) -> Result<Self, DataError> {
        let mut index = BTreeMap::new();
        for license in licenses {
            validate_license_id(&license.id).map_err(|e| DataError::Record {
                origin: license.id.clone(),
                reason: e.to_string(),
            })?;
            if index.contains_key(&license.id) {
                return Err(DataError::Duplicate(license.id));
            }
            index.insert(license.id.clone(), license);
        }

        let warnings = audit(&index);
        for warning in &warnings {
            tracing::warn!(target: "license_policy::data", "{warning}");
        }

        Ok(Self {
            licenses: index,
            base_dir: None,
            warnings,
        })
    }

    pub fn load(source: &DataSource) -> Result<Self, DataError> {
        match source {
            DataSource::Embedded => Self::embedded(),
            DataSource::Database(path) => Self::from_database(path),
            DataSource::Directory(path) => Self::from_dir(path),
        }
    }

    pub fn embedded() -> Result<Self, DataError> {
        let licenses = parse_database(EMBEDDED_DATABASE, "embedded dataset")?;
        Self::from_licenses(licenses)
    }

    pub fn from_database(path: &Path) -> Result<Self, DataError> {
        let text = read(path)?;
        let licenses = parse_database(&text, &path.display().to_string())?;
        let store = Self::from_licenses(licenses)?;
        tracing::info!(path = %path.display(), licenses = store.len(), "loaded license database");
        Ok(store)
    }

    /// Load every record in `dir`.
    ///
    /// Each identifier is read from `<ID>.json` when present, otherwise from
    /// `<ID>.yaml` or `<ID>.yml`. Files whose stem is not a valid identifier are
    /// skipped with a warning.
    pub fn from_dir(dir: &Path) -> Result<Self, DataError> {
        let entries = fs::read_dir(dir).map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut ids = BTreeSet::new();
        for entry in entries {
            let path = entry
                .map_err(|source| DataError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();

            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if ext != STRUCTURED_EXT && !LEGACY_EXTS.contains(&ext) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match validate_license_id(stem) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), "skipping license record: {e}");
                }
            }
        }

        let mut licenses = Vec::with_capacity(ids.len());
        for id in &ids {
            licenses.push(load_record_file(dir, id)?);
        }

        let mut store = Self::from_licenses(licenses)?;
        store.base_dir = Some(dir.to_path_buf());
        tracing::info!(dir = %dir.display(), licenses = store.len(), "loaded license records");
        Ok(store)
    }

    /// Look up a validated identifier.
    pub fn get(&self, id: &LicenseId) -> Result<&License, EngineError> {
        self.licenses
            .get(id.as_str())
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// All records, ordered by identifier.
    pub fn list(&self) -> impl Iterator<Item = &License> {
        self.licenses.values()
    }

    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    /// Directory the records were read from, for directory-backed stores.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }
}

fn read(path: &Path) -> Result<String, DataError> {
    fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_record_file(dir: &Path, id: &LicenseId) -> Result<License, DataError> {
    let structured = validate_license_path(dir, id.as_str(), STRUCTURED_EXT)?;
    let license = if structured.is_file() {
        let text = read(&structured)?;
        parse_structured(&text, &structured.display().to_string())?
    } else {
        let mut found = None;
        for ext in LEGACY_EXTS {
            let legacy = validate_license_path(dir, id.as_str(), ext)?;
            if legacy.is_file() {
                tracing::debug!(license = %id, file = %legacy.display(), "using legacy record");
                let text = read(&legacy)?;
                found = Some(parse_legacy(&text, &legacy.display().to_string())?);
                break;
            }
        }
        found.ok_or_else(|| DataError::Record {
            origin: dir.display().to_string(),
            reason: format!("no readable record file for `{id}`"),
        })?
    };

    if license.id != id.as_str() {
        return Err(DataError::IdMismatch {
            origin: dir.display().to_string(),
            expected: id.to_string(),
            found: license.id,
        });
    }
    Ok(license)
}

/// Find non-reciprocal incompatibility entries and dangling references.
fn audit(licenses: &BTreeMap<String, License>) -> Vec<DataWarning> {
    let mut warnings = Vec::new();

    for license in licenses.values() {
        for mode in [LinkingMode::Static, LinkingMode::Dynamic] {
            let rules = license.rules(mode);
            let lists = [
                &rules.compatible_with,
                &rules.incompatible_with,
                &rules.requires_review,
            ];
            for target in lists.into_iter().flatten() {
                let Target::License(target_id) = target else {
                    continue;
                };
                if !licenses.contains_key(target_id) {
                    warnings.push(DataWarning::UnknownReference {
                        license: license.id.clone(),
                        target: target_id.clone(),
                        mode,
                    });
                }
            }

            for target in &rules.incompatible_with {
                let Target::License(target_id) = target else {
                    continue;
                };
                if target_id == &license.id {
                    warnings.push(DataWarning::SelfIncompatibility {
                        license: license.id.clone(),
                        mode,
                    });
                    continue;
                }
                let Some(other) = licenses.get(target_id) else {
                    continue;
                };
                let reciprocal = other
                    .rules(mode)
                    .incompatible_with
                    .iter()
                    .any(|t| t.matches(license));
                if !reciprocal {
                    warnings.push(DataWarning::AsymmetricIncompatibility {
                        license: license.id.clone(),
                        target: target_id.clone(),
                        mode,
                    });
                }
            }
        }
    }

    warnings
}
