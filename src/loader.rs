//! File-level pipeline: read, parse, resolve, write.
//!
//! [`EnvLoader`] ties the parser, registry, and orchestrator together for
//! one input file. It owns the I/O boundary; everything below it works on
//! in-memory content.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::envfile::EnvFile;
use crate::errors::{Error, Result};
use crate::provider::ProviderRegistry;
use crate::resolver::{resolve_file, ResolutionFailure, RunPolicy};

/// Where the resolved content should go.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Write to this path
    Path(PathBuf),
    /// Derive `.env` next to the input file
    Default,
    /// Hand the content back to the caller (stdout piping)
    Content,
}

/// Outcome of one load run.
#[derive(Debug)]
pub struct LoadResult {
    /// Input path, `None` when content came from stdin
    pub input_path: Option<PathBuf>,
    /// Output path, `None` when the content was returned instead of written
    pub output_path: Option<PathBuf>,
    /// Resolved file content, always populated
    pub resolved_content: String,
    pub variables_count: usize,
    pub secrets_resolved: usize,
    pub failures: Vec<ResolutionFailure>,
}

/// Drives one file through parse, resolution, and output.
pub struct EnvLoader {
    registry: ProviderRegistry,
    policy: RunPolicy,
}

impl EnvLoader {
    pub fn new(registry: ProviderRegistry, policy: RunPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve a file from disk.
    pub async fn load(&self, input: &Path, output: Output) -> Result<LoadResult> {
        let content = tokio::fs::read_to_string(input)
            .await
            .map_err(|e| Error::io(e, format!("reading input file {}", input.display())))?;

        let destination = match output {
            Output::Default => Output::Path(default_output_path(input)),
            other => other,
        };

        let mut result = self.load_content(&content, destination).await?;
        result.input_path = Some(input.to_path_buf());
        Ok(result)
    }

    /// Resolve content that is already in memory (stdin piping).
    ///
    /// `Output::Default` is meaningless without an input path and falls back
    /// to returning the content.
    pub async fn load_content(&self, content: &str, output: Output) -> Result<LoadResult> {
        let mut file = EnvFile::parse(content)?;
        debug!(entries = file.entry_count(), "parsed environment file");

        let report = resolve_file(&mut file, &self.registry, &self.policy).await?;
        let resolved_content = file.render();

        let output_path = match output {
            Output::Path(path) => {
                tokio::fs::write(&path, &resolved_content)
                    .await
                    .map_err(|e| Error::io(e, format!("writing output file {}", path.display())))?;
                info!(path = %path.display(), "wrote resolved file");
                Some(path)
            }
            Output::Default | Output::Content => None,
        };

        Ok(LoadResult {
            input_path: None,
            output_path,
            resolved_content,
            variables_count: file.entry_count(),
            secrets_resolved: report.resolved,
            failures: report.failures,
        })
    }
}

/// `.env` beside the input file, matching the common `.env.dev` -> `.env`
/// workflow.
fn default_output_path(input: &Path) -> PathBuf {
    input.with_file_name(".env")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderRegistry;
    use std::env;
    use tempfile::TempDir;

    fn loader() -> EnvLoader {
        EnvLoader::new(ProviderRegistry::with_builtins(), RunPolicy::lenient())
    }

    #[test]
    fn test_default_output_is_dot_env_beside_input() {
        assert_eq!(
            default_output_path(Path::new("/proj/.env.dev")),
            Path::new("/proj/.env")
        );
        assert_eq!(default_output_path(Path::new(".env.dev")), Path::new(".env"));
    }

    #[tokio::test]
    async fn test_load_writes_default_output() {
        env::set_var("ENVAULT_LOADER_VAR", "resolved");
        let dir = TempDir::new().unwrap();
        let input = dir.path().join(".env.dev");
        std::fs::write(&input, "KEY=${env:ENVAULT_LOADER_VAR}\nPLAIN=1\n").unwrap();

        let result = loader().load(&input, Output::Default).await.unwrap();

        assert_eq!(result.variables_count, 2);
        assert_eq!(result.secrets_resolved, 1);
        assert!(result.failures.is_empty());
        assert_eq!(result.output_path, Some(dir.path().join(".env")));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".env")).unwrap(),
            "KEY=resolved\nPLAIN=1\n"
        );
        env::remove_var("ENVAULT_LOADER_VAR");
    }

    #[tokio::test]
    async fn test_missing_input_is_io_error_with_context() {
        let err = loader()
            .load(Path::new("/nonexistent/envault/.env.dev"), Output::Content)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/envault/.env.dev"));
    }

    #[tokio::test]
    async fn test_load_content_returns_without_writing() {
        let result = loader()
            .load_content("A=1\nB=2\n", Output::Content)
            .await
            .unwrap();

        assert!(result.output_path.is_none());
        assert_eq!(result.resolved_content, "A=1\nB=2\n");
        assert_eq!(result.variables_count, 2);
        assert_eq!(result.secrets_resolved, 0);
    }
}
