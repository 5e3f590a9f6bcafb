//! Configuration loading.
//!
//! Settings come from a YAML file declaring provider mappings and run
//! options:
//!
//! ```yaml
//! providers:
//!   - name: secrets
//!     type: file
//!     config:
//!       base_path: /run/secrets
//! options:
//!   strict: true
//!   call_timeout_secs: 10
//! ```
//!
//! The file is discovered across standard locations (closest first) unless
//! an explicit path is given. A missing file is not an error; the defaults
//! apply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::resolver::RunPolicy;

/// Candidate config file names relative to the working directory, checked
/// in order. Home-directory fallbacks follow.
const LOCAL_CANDIDATES: &[&str] = &[
    ".envault.yaml",
    ".envault.yml",
    "envault.yaml",
    "envault.yml",
];

/// One provider declaration from the `providers:` list.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Registry name the provider is bound under
    pub name: String,
    /// Built-in provider type to instantiate (`env`, `file`)
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Provider-specific configuration, handed to the factory as-is
    #[serde(default)]
    pub config: serde_yaml::Value,
}

fn default_enabled() -> bool {
    true
}

/// Run options from the `options:` mapping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

impl RunOptions {
    /// Translate into the orchestrator's policy. The CLI `--strict` flag
    /// can still force strict on top of this.
    pub fn to_policy(&self) -> RunPolicy {
        RunPolicy {
            strict: self.strict,
            call_timeout: self.call_timeout_secs.map(Duration::from_secs),
            run_timeout: self.run_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
    #[serde(default)]
    pub options: RunOptions,
}

impl AppConfig {
    /// Load from an explicit path.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] when the file cannot be read, [`Error::Config`] when
    /// it is not valid YAML for this schema.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, format!("reading config file {}", path.display())))?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            Error::config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), providers = config.providers.len(), "loaded configuration");
        Ok(config)
    }

    /// Discover and load the config file, or fall back to defaults.
    ///
    /// An explicit path must exist; discovered candidates are optional.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match discover_path() {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// First existing candidate: working directory first, then
/// `~/.config/envault.yaml`, then `~/.envault.yaml`.
fn discover_path() -> Option<PathBuf> {
    for name in LOCAL_CANDIDATES {
        let path = PathBuf::from(name);
        if path.is_file() {
            return Some(path);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("envault.yaml");
        if path.is_file() {
            return Some(path);
        }
    }
    if let Some(home) = dirs::home_dir() {
        let path = home.join(".envault.yaml");
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.providers.is_empty());
        assert!(!config.options.strict);

        let policy = config.options.to_policy();
        assert!(!policy.strict);
        assert!(policy.call_timeout.is_none());
        assert!(policy.run_timeout.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("envault.yaml");
        std::fs::write(
            &path,
            concat!(
                "providers:\n",
                "  - name: secrets\n",
                "    type: file\n",
                "    config:\n",
                "      base_path: /run/secrets\n",
                "  - name: legacy\n",
                "    type: env\n",
                "    enabled: false\n",
                "options:\n",
                "  strict: true\n",
                "  call_timeout_secs: 10\n",
            ),
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].name, "secrets");
        assert_eq!(config.providers[0].provider_type, "file");
        assert!(config.providers[0].enabled);
        assert!(!config.providers[1].enabled);

        let policy = config.options.to_policy();
        assert!(policy.strict);
        assert_eq!(policy.call_timeout, Some(Duration::from_secs(10)));
        assert_eq!(policy.run_timeout, None);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("envault.yaml");
        std::fs::write(&path, "providers: not-a-list\n").unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_explicit_missing_path_is_io_error() {
        let err = AppConfig::discover(Some(Path::new("/nonexistent/envault.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
