//! Pluggable secret providers.
//!
//! This module defines the capability contract every secret backend
//! implements, plus the registry that maps provider names to live instances.
//!
//! # Architecture
//!
//! A provider is identified by a unique name (the `provider` half of a
//! `${provider:body}` reference) and turns an opaque reference body into a
//! secret value. The contract is a single trait with one required operation:
//!
//! - **resolve**: turn a reference body into a value (required)
//! - **validate_reference**: pre-flight pattern check, default regex match
//! - **resolve_batch**: resolve many bodies in one logical call, default
//!   sequential
//! - **close**: idempotent teardown, default no-op
//!
//! Concrete backends override the defaults where their API supports
//! multi-secret fetch or needs connection teardown.
//!
//! # Built-in providers
//!
//! - [`EnvProvider`] — resolves process environment variables
//! - [`FileProvider`] — reads secret values from files on disk
//!
//! Cloud backends (Vault, AWS, GCP, Azure, 1Password) plug in through the
//! same contract from their own crates or feature-gated modules; the engine
//! never special-cases them.

pub mod env;
pub mod file;
pub mod registry;
pub mod types;

pub use env::EnvProvider;
pub use file::FileProvider;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use types::SecretString;

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Static metadata describing a provider.
///
/// `reference_pattern` is a regular expression a reference body must match
/// before resolution is attempted; an empty pattern accepts everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Unique provider name, case-sensitive
    pub name: String,
    /// Human-readable description for `--list-providers`
    pub description: String,
    /// Provider version
    pub version: String,
    /// Author or maintainer
    pub author: String,
    /// Regex the reference body must match, empty to accept all
    pub reference_pattern: String,
}

impl ProviderInfo {
    /// Create provider metadata with the given name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: "1.0.0".to_string(),
            author: String::new(),
            reference_pattern: String::new(),
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the reference validation pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.reference_pattern = pattern.into();
        self
    }
}

/// Progress callback for batch resolution: `(body, index, total)`.
///
/// Invoked by [`Provider::resolve_batch`] implementations before each
/// sub-batch (for the sequential default, before each body).
pub type ProgressCallback<'a> = &'a (dyn Fn(&str, usize, usize) + Send + Sync);

/// Capability contract for secret providers.
///
/// Implementations must be `Send + Sync`: the orchestrator hands one
/// instance per provider to a single partition, but the `Arc` crosses task
/// boundaries. The registry guarantees one instance per name, and the
/// orchestrator serializes resolution calls against it (one partition per
/// provider), so implementations do not need internal call ordering.
///
/// # Security
///
/// Implementations must not log secret values. Resolved values are returned
/// as [`SecretString`] so accidental Debug/Display output stays redacted.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Static metadata for this provider.
    fn info(&self) -> &ProviderInfo;

    /// Resolve a reference body to its secret value.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderResolution`] on any backend failure. This is the
    /// only required operation.
    async fn resolve(&self, body: &str) -> Result<SecretString>;

    /// Check that a reference body is well-formed for this provider.
    ///
    /// The default implementation matches the body against
    /// `info().reference_pattern` (an empty pattern accepts everything).
    /// Override for validation the pattern cannot express; implementations
    /// may return an error to short-circuit before any network call.
    async fn validate_reference(&self, body: &str) -> Result<bool> {
        let pattern = &self.info().reference_pattern;
        if pattern.is_empty() {
            return Ok(true);
        }
        let regex = Regex::new(pattern).map_err(|e| {
            Error::config(format!(
                "invalid reference pattern for provider '{}': {}",
                self.info().name,
                e
            ))
        })?;
        Ok(regex.is_match(body))
    }

    /// Resolve multiple reference bodies, returning a per-body outcome.
    ///
    /// The default implementation calls [`Provider::resolve`] sequentially
    /// and never aborts early, so one failing body does not poison the
    /// rest of the batch. Backends with multi-secret fetch APIs override
    /// this for efficiency; overrides must still report an outcome for
    /// every requested body.
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

    /// Release any resources held by this provider.
    ///
    /// Must be idempotent. The registry calls this exactly once per
    /// constructed instance at the end of a run, success or failure.
    async fn close(&self) {}
}
