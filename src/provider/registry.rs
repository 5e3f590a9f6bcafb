//! Provider registry
//!
//! Maps provider names to factories and memoized live instances. The
//! registry is an explicitly constructed value with a documented
//! single-owner-per-run lifecycle: one orchestration pass owns it for the
//! duration of a run and tears it down once at the end. It is not safe for
//! concurrent mutation; the internal instance map is the only shared
//! mutable structure and is protected for concurrent `get` calls during
//! partition resolution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::{EnvProvider, FileProvider, Provider, ProviderInfo};
use crate::config::ProviderSettings;
use crate::errors::{Error, Result};

/// Factory for constructing a provider instance on first lookup.
///
/// Enumeration (`--list-providers`) reads metadata from the factory, so
/// listing never constructs instances or opens connections.
pub trait ProviderFactory: Send + Sync {
    /// Metadata for the provider this factory builds.
    fn info(&self) -> &ProviderInfo;

    /// Construct a fresh provider instance.
    fn create(&self) -> Result<Arc<dyn Provider>>;
}

impl std::fmt::Debug for dyn ProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("info", self.info())
            .finish()
    }
}

/// A [`ProviderFactory`] built from a closure.
pub struct FactoryFn {
    info: ProviderInfo,
    make: Box<dyn Fn() -> Result<Arc<dyn Provider>> + Send + Sync>,
}

impl FactoryFn {
    /// Wrap a closure and its metadata into a factory.
    pub fn new<F>(info: ProviderInfo, make: F) -> Arc<dyn ProviderFactory>
    where
        F: Fn() -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            info,
            make: Box::new(make),
        })
    }
}

impl ProviderFactory for FactoryFn {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn create(&self) -> Result<Arc<dyn Provider>> {
        (self.make)()
    }
}

/// Registry of secret providers.
///
/// Names are case-sensitive and unique: registering a second factory under
/// an existing name replaces the previous binding (last write wins), and
/// later `get` calls observe the replacement. Instances are constructed
/// lazily on first `get`, memoized for the rest of the run, and closed
/// exactly once by [`ProviderRegistry::close_all`].
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
    /// Registration order, for stable listing
    order: Vec<String>,
    instances: Mutex<HashMap<String, Arc<dyn Provider>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.order)
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            order: Vec::new(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in providers registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Register a provider factory under its metadata name.
    ///
    /// Replaces any existing binding for the same name; a memoized instance
    /// from the old binding is discarded so the next `get` constructs from
    /// the new factory.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        let name = factory.info().name.clone();
        if self.factories.insert(name.clone(), factory).is_some() {
            debug!(provider = %name, "replacing existing provider registration");
            self.instances
                .lock()
                .expect("provider instance map poisoned")
                .remove(&name);
        } else {
            self.order.push(name.clone());
        }
        info!(provider = %name, "registered secret provider");
    }

    /// Register the built-in `env` and `file` providers.
    pub fn register_builtins(&mut self) {
        self.register(EnvProvider::factory());
        self.register(FileProvider::factory());
    }

    /// Apply configuration-declared provider mappings.
    ///
    /// Only names not already bound are registered, so programmatic
    /// registrations and plugin entries take precedence over configuration.
    /// Disabled entries are skipped. An unknown provider type is a
    /// configuration error.
    pub fn apply_config(&mut self, settings: &[ProviderSettings]) -> Result<()> {
        for setting in settings {
            if !setting.enabled {
                debug!(provider = %setting.name, "skipping disabled provider");
                continue;
            }
            if self.is_registered(&setting.name) {
                debug!(provider = %setting.name, "provider already bound, keeping existing registration");
                continue;
            }
            let factory = match setting.provider_type.as_str() {
                "env" => EnvProvider::factory_named(&setting.name),
                "file" => FileProvider::factory_from_config(&setting.name, &setting.config)?,
                other => {
                    return Err(Error::config(format!(
                        "unknown provider type '{}' for provider '{}'",
                        other, setting.name
                    )))
                }
            };
            self.register(factory);
        }
        Ok(())
    }

    /// Check if a provider name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Get a provider instance by name, constructing it on first call.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderNotFound`] for an unregistered name. A missing
    /// provider is always a failure, never a silent no-op.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::ProviderNotFound {
                name: name.to_string(),
            })?;

        let mut instances = self
            .instances
            .lock()
            .expect("provider instance map poisoned");
        if let Some(instance) = instances.get(name) {
            return Ok(instance.clone());
        }

        debug!(provider = %name, "constructing provider instance");
        let instance = factory.create()?;
        instances.insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    /// List metadata for all registered providers, in registration order.
    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.order
            .iter()
            .filter_map(|name| self.factories.get(name))
            .map(|factory| factory.info().clone())
            .collect()
    }

    /// Close every provider instance constructed during this run.
    ///
    /// Teardown is unconditional: the orchestrator calls this on success,
    /// strict abort, and timeout alike. Idempotent — instances are drained
    /// on the first call.
    pub async fn close_all(&self) {
        let drained: Vec<(String, Arc<dyn Provider>)> = {
            let mut instances = self
                .instances
                .lock()
                .expect("provider instance map poisoned");
            instances.drain().collect()
        };
        for (name, instance) in drained {
            debug!(provider = %name, "closing provider");
            instance.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SecretString;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider {
        info: ProviderInfo,
        value: String,
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn info(&self) -> &ProviderInfo {
            &self.info
        }
        async fn resolve(&self, _body: &str) -> Result<SecretString> {
            Ok(SecretString::new(self.value.clone()))
        }
    }

    fn static_factory(name: &str, value: &str) -> Arc<dyn ProviderFactory> {
        let info = ProviderInfo::new(name, "static test provider");
        let value = value.to_string();
        FactoryFn::new(info.clone(), move || {
            Ok(Arc::new(StaticProvider {
                info: info.clone(),
                value: value.clone(),
            }) as Arc<dyn Provider>)
        })
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(!registry.is_registered("env"));
        assert!(registry.list_providers().is_empty());
        assert!(matches!(
            registry.get("env"),
            Err(Error::ProviderNotFound { name }) if name == "env"
        ));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ProviderRegistry::with_builtins();
        assert!(registry.is_registered("env"));
        assert!(registry.is_registered("file"));
        let names: Vec<String> = registry
            .list_providers()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["env", "file"]);
    }

    #[tokio::test]
    async fn test_get_memoizes_instance() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let info = ProviderInfo::new("counted", "counts constructions");
        let info_clone = info.clone();

        let mut registry = ProviderRegistry::new();
        registry.register(FactoryFn::new(info, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StaticProvider {
                info: info_clone.clone(),
                value: "v".into(),
            }) as Arc<dyn Provider>)
        }));

        registry.get("counted").unwrap();
        registry.get("counted").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = ProviderRegistry::new();
        registry.register(static_factory("env", "first"));

        // A memoized instance from the first binding must not survive
        let first = registry.get("env").unwrap();
        assert_eq!(first.resolve("x").await.unwrap().expose_secret(), "first");

        registry.register(static_factory("env", "second"));
        let second = registry.get("env").unwrap();
        assert_eq!(second.resolve("x").await.unwrap().expose_secret(), "second");

        // Listing still shows one entry
        assert_eq!(registry.list_providers().len(), 1);
    }

    #[tokio::test]
    async fn test_close_all_is_idempotent() {
        let mut registry = ProviderRegistry::new();
        registry.register(static_factory("a", "v"));
        registry.get("a").unwrap();

        registry.close_all().await;
        registry.close_all().await;

        // Instances were drained; a later get reconstructs
        assert!(registry.get("a").is_ok());
    }

    #[test]
    fn test_apply_config_respects_existing_bindings() {
        let mut registry = ProviderRegistry::with_builtins();
        let settings = vec![
            ProviderSettings {
                name: "env".into(),
                provider_type: "env".into(),
                enabled: true,
                config: serde_yaml::Value::Null,
            },
            ProviderSettings {
                name: "local-env".into(),
                provider_type: "env".into(),
                enabled: true,
                config: serde_yaml::Value::Null,
            },
            ProviderSettings {
                name: "disabled".into(),
                provider_type: "file".into(),
                enabled: false,
                config: serde_yaml::Value::Null,
            },
        ];

        registry.apply_config(&settings).unwrap();
        assert!(registry.is_registered("local-env"));
        assert!(!registry.is_registered("disabled"));
    }

    #[test]
    fn test_apply_config_unknown_type() {
        let mut registry = ProviderRegistry::new();
        let settings = vec![ProviderSettings {
            name: "mystery".into(),
            provider_type: "carrier-pigeon".into(),
            enabled: true,
            config: serde_yaml::Value::Null,
        }];

        let err = registry.apply_config(&settings).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
