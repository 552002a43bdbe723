use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::license::store::DataSource;

/// Root configuration structure, deserialized from `.license-policy/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where license records are read from. `dir` wins when both are set.
#[derive(Debug, Default, Deserialize)]
pub struct DataConfig {
    /// Directory of `<ID>.json` / `<ID>.yaml` records.
    pub dir: Option<PathBuf>,
    /// Master database file.
    pub database: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PolicyConfig {
    /// Policy file or directory of policy files.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter, e.g. `"info"` or `"license_policy=debug"`.
    pub level: Option<String>,
}

impl Config {
    pub fn data_source(&self) -> DataSource {
        match (&self.data.dir, &self.data.database) {
            (Some(dir), database) => {
                if database.is_some() {
                    tracing::warn!("both data.dir and data.database are set; using data.dir");
                }
                DataSource::Directory(dir.clone())
            }
            (None, Some(database)) => DataSource::Database(database.clone()),
            (None, None) => DataSource::Embedded,
        }
    }

    /// Make relative paths relative to the directory holding the config file.
    fn anchor(mut self, config_dir: &Path) -> Self {
        let anchor = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = config_dir.join(&*path);
                }
            }
        };
        anchor(&mut self.data.dir);
        anchor(&mut self.data.database);
        anchor(&mut self.policy.path);
        self
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.anchor(dir))
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_path>/.license-policy/config.toml`
/// 3. `~/.config/license-policy/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".license-policy").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("license-policy")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_embedded_data() {
        let config = Config::default();
        assert_eq!(config.data_source(), DataSource::Embedded);
        assert!(config.policy.path.is_none());
    }

    #[test]
    fn test_project_config_is_found_and_anchored() {
        let project = tempfile::tempdir().unwrap();
        let dir = project.path().join(".license-policy");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            "[data]\ndir = \"licenses\"\n\n[policy]\npath = \"/etc/policy.yaml\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = load_config(project.path(), None).unwrap();
        assert_eq!(config.data_source(), DataSource::Directory(dir.join("licenses")));
        assert_eq!(config.policy.path, Some(PathBuf::from("/etc/policy.yaml")));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_override_wins() {
        let project = tempfile::tempdir().unwrap();
        let path = project.path().join("custom.toml");
        std::fs::write(&path, "[data]\ndatabase = \"db.json\"\n").unwrap();

        let config = load_config(project.path(), Some(&path)).unwrap();
        assert_eq!(
            config.data_source(),
            DataSource::Database(project.path().join("db.json"))
        );
    }

    #[test]
    fn test_dir_wins_over_database() {
        let config: Config =
            toml::from_str("[data]\ndir = \"/data\"\ndatabase = \"/db.json\"\n").unwrap();
        assert_eq!(config.data_source(), DataSource::Directory(PathBuf::from("/data")));
    }

    #[test]
    fn test_invalid_override_is_error() {
        let project = tempfile::tempdir().unwrap();
        let path = project.path().join("bad.toml");
        std::fs::write(&path, "[data\n").unwrap();
        assert!(load_config(project.path(), Some(&path)).is_err());
    }
}
