//! Process-environment provider.
//!
//! Resolves references to variables already present in the process
//! environment. Useful for passing values from the current environment
//! through to the resolved file:
//!
//! ```text
//! DATABASE_HOST=${env:DATABASE_HOST}
//! APP_ENV=${env:APP_ENV}
//! ```

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::registry::{FactoryFn, ProviderFactory};
use super::{Provider, ProviderInfo, SecretString};
use crate::errors::{Error, Result};

/// Variable names accepted by this provider.
const REFERENCE_PATTERN: &str = "^[A-Za-z_][A-Za-z0-9_]*$";

/// Environment variable provider.
///
/// Values are cached per run so a variable referenced from several entries
/// is read once. The cache is cleared on [`Provider::close`].
pub struct EnvProvider {
    info: ProviderInfo,
    cache: Mutex<HashMap<String, SecretString>>,
}

impl EnvProvider {
    /// Create an environment provider under the default name `env`.
    pub fn new() -> Self {
        Self::named("env")
    }

    /// Create an environment provider under a configuration-declared name.
    pub fn named(name: &str) -> Self {
        Self {
            info: Self::build_info(name),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn build_info(name: &str) -> ProviderInfo {
        ProviderInfo::new(name, "Process environment variable provider")
            .with_author("envault contributors")
            .with_pattern(REFERENCE_PATTERN)
    }

    /// Factory for the default `env` registration.
    pub fn factory() -> Arc<dyn ProviderFactory> {
        Self::factory_named("env")
    }

    /// Factory registering this provider type under a custom name.
    pub fn factory_named(name: &str) -> Arc<dyn ProviderFactory> {
        let name = name.to_string();
        FactoryFn::new(Self::build_info(&name), move || {
            Ok(Arc::new(EnvProvider::named(&name)) as Arc<dyn Provider>)
        })
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for EnvProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn resolve(&self, body: &str) -> Result<SecretString> {
        if let Some(cached) = self
            .cache
            .lock()
            .expect("env provider cache poisoned")
            .get(body)
        {
            return Ok(cached.clone());
        }

        let value = env::var(body).map_err(|_| {
            Error::resolution(
                &self.info.name,
                body,
                format!("environment variable '{}' is not set", body),
            )
        })?;

        let secret = SecretString::new(value);
        self.cache
            .lock()
            .expect("env provider cache poisoned")
            .insert(body.to_string(), secret.clone());
        Ok(secret)
    }

    async fn close(&self) {
        self.cache
            .lock()
            .expect("env provider cache poisoned")
            .clear();
    }
}
