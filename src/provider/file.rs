//! File-based provider.
//!
//! Reads secret values from files on the filesystem. Useful for Docker
//! secrets, mounted Kubernetes secrets, or local development files:
//!
//! ```text
//! DATABASE_PASSWORD=${file:/run/secrets/db_password}
//! API_KEY=${file:./secrets/api_key.txt}
//! ```
//!
//! Relative references are resolved against the configured `base_path`
//! (current directory by default). A `file://` prefix on the reference is
//! accepted and stripped. File contents are trimmed of surrounding
//! whitespace, matching the usual trailing newline in secret files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;

use super::registry::{FactoryFn, ProviderFactory};
use super::{ProgressCallback, Provider, ProviderInfo, SecretString};
use crate::errors::{Error, Result};

/// Configuration block for a file provider, from the `config:` mapping of
/// a provider declaration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileProviderConfig {
    /// Base directory for relative references
    #[serde(default)]
    pub base_path: Option<PathBuf>,
}

/// File-based secret provider.
pub struct FileProvider {
    info: ProviderInfo,
    base_path: Option<PathBuf>,
    cache: Mutex<HashMap<String, SecretString>>,
}

impl FileProvider {
    /// Create a file provider under the default name `file`.
    pub fn new() -> Self {
        Self::with_config("file", FileProviderConfig::default())
    }

    /// Create a file provider with explicit configuration.
    pub fn with_config(name: &str, config: FileProviderConfig) -> Self {
        Self {
            info: Self::build_info(name),
            base_path: config.base_path,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn build_info(name: &str) -> ProviderInfo {
        ProviderInfo::new(name, "File-based secret provider")
            .with_author("envault contributors")
            .with_pattern("^.+$")
    }

    /// Factory for the default `file` registration.
    pub fn factory() -> Arc<dyn ProviderFactory> {
        let info = Self::build_info("file");
        FactoryFn::new(info, || Ok(Arc::new(FileProvider::new()) as Arc<dyn Provider>))
    }

    /// Factory built from a configuration-declared provider entry.
    pub fn factory_from_config(
        name: &str,
        config: &serde_yaml::Value,
    ) -> Result<Arc<dyn ProviderFactory>> {
        let parsed: FileProviderConfig = match config {
            serde_yaml::Value::Null => FileProviderConfig::default(),
            other => serde_yaml::from_value(other.clone()).map_err(|e| {
                Error::config(format!("invalid config for file provider '{}': {}", name, e))
            })?,
        };
        let name = name.to_string();
        Ok(FactoryFn::new(Self::build_info(&name), move || {
            Ok(Arc::new(FileProvider::with_config(&name, parsed.clone())) as Arc<dyn Provider>)
        }))
    }

    fn resolve_path(&self, reference: &str) -> PathBuf {
        let reference = reference.strip_prefix("file://").unwrap_or(reference);
        let path = Path::new(reference);
        match (&self.base_path, path.is_absolute()) {
            (Some(base), false) => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for FileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FileProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn resolve(&self, body: &str) -> Result<SecretString> {
        if let Some(cached) = self
            .cache
            .lock()
            .expect("file provider cache poisoned")
            .get(body)
        {
            return Ok(cached.clone());
        }

        let path = self.resolve_path(body);
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            let message = match e.kind() {
                std::io::ErrorKind::NotFound => {
                    format!("secret file not found: {}", path.display())
                }
                std::io::ErrorKind::PermissionDenied => {
                    format!("permission denied reading secret file: {}", path.display())
                }
                _ => format!("error reading secret file {}: {}", path.display(), e),
            };
            Error::resolution(&self.info.name, body, message)
        })?;

        let secret = SecretString::new(contents.trim().to_string());
        self.cache
            .lock()
            .expect("file provider cache poisoned")
            .insert(body.to_string(), secret.clone());
        Ok(secret)
    }

    // Files are local, so the batch is just the sequential loop; the
    // override exists to report progress per file rather than per batch.
    async fn resolve_batch(
        &self,
        bodies: &[String],
        progress: Option<ProgressCallback<'_>>,
    ) -> HashMap<String, Result<SecretString>> {
        let mut results = HashMap::with_capacity(bodies.len());
        for (index, body) in bodies.iter().enumerate() {
            if let Some(callback) = progress {
                callback(body, index, bodies.len());
            }
            results.insert(body.clone(), self.resolve(body).await);
        }
        results
    }

    async fn close(&self) {
        self.cache
            .lock()
            .expect("file provider cache poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_secret(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_resolve_absolute_path() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(&dir, "token", "s3cr3t\n");

        let provider = FileProvider::new();
        let value = provider.resolve(path.to_str().unwrap()).await.unwrap();
        assert_eq!(value.expose_secret(), "s3cr3t");
    }

    #[tokio::test]
    async fn test_resolve_relative_to_base_path() {
        let dir = TempDir::new().unwrap();
        write_secret(&dir, "api_key", "key-value");

        let provider = FileProvider::with_config(
            "file",
            FileProviderConfig {
                base_path: Some(dir.path().to_path_buf()),
            },
        );
        let value = provider.resolve("api_key").await.unwrap();
        assert_eq!(value.expose_secret(), "key-value");
    }

    #[tokio::test]
    async fn test_file_scheme_prefix_stripped() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(&dir, "token", "prefixed");

        let provider = FileProvider::new();
        let reference = format!("file://{}", path.display());
        let value = provider.resolve(&reference).await.unwrap();
        assert_eq!(value.expose_secret(), "prefixed");
    }

    #[tokio::test]
    async fn test_missing_file_is_resolution_error() {
        let provider = FileProvider::new();
        let err = provider.resolve("/nonexistent/envault/secret").await.unwrap_err();

        assert!(matches!(err, Error::ProviderResolution { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_batch_reports_per_file_outcomes() {
        let dir = TempDir::new().unwrap();
        let good = write_secret(&dir, "good", "value");

        let provider = FileProvider::new();
        let bodies = vec![
            good.to_str().unwrap().to_string(),
            "/nonexistent/envault/secret".to_string(),
        ];
        let results = provider.resolve_batch(&bodies, None).await;

        assert!(results.get(&bodies[0]).unwrap().is_ok());
        assert!(results.get(&bodies[1]).unwrap().is_err());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_filesystem() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(&dir, "cached", "first");
        let reference = path.to_str().unwrap().to_string();

        let provider = FileProvider::new();
        provider.resolve(&reference).await.unwrap();

        std::fs::write(&path, "second").unwrap();
        let value = provider.resolve(&reference).await.unwrap();
        assert_eq!(value.expose_secret(), "first");
    }

    #[test]
    fn test_factory_from_config_rejects_bad_config() {
        let config: serde_yaml::Value = serde_yaml::from_str("base_path: [not, a, path]").unwrap();
        let err = FileProvider::factory_from_config("file", &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
