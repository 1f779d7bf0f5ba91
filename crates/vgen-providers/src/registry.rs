//! Provider registry.
//!
//! Factories are registered by key at startup. The first `get` for a key
//! builds the provider; every later call returns the same instance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info};
use vgen_models::GenerationKind;

use crate::config::ProvidersConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::GenerationProvider;
use crate::vendors::{FalProvider, OpenAiTtsProvider, ReplicateProvider};

/// Builds a provider instance.
pub type ProviderFactory =
    Arc<dyn Fn() -> ProviderResult<Arc<dyn GenerationProvider>> + Send + Sync>;

/// Registered provider, listed without instantiating it.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub key: String,
    pub kind: GenerationKind,
}

struct Registration {
    kind: GenerationKind,
    factory: ProviderFactory,
}

#[derive(Default)]
pub struct ProviderRegistry {
    registrations: BTreeMap<String, Registration>,
    instances: Mutex<HashMap<String, Arc<dyn GenerationProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the shipped vendor adapters.
    ///
    /// Credentials are checked when a provider is first used, so a missing
    /// key only affects that provider.
    pub fn with_defaults(config: ProvidersConfig) -> ProviderResult<Self> {
        let client = config.http_client()?;
        let mut registry = Self::new();

        {
            let config = config.fal.clone();
            let client = client.clone();
            registry.register(FalProvider::KEY, GenerationKind::ImageToVideo, move || {
                Ok(Arc::new(FalProvider::new(config.clone(), client.clone())?)
                    as Arc<dyn GenerationProvider>)
            });
        }
        {
            let config = config.replicate.clone();
            let client = client.clone();
            registry.register(
                ReplicateProvider::KEY,
                GenerationKind::ImageToVideo,
                move || {
                    Ok(Arc::new(ReplicateProvider::new(config.clone(), client.clone())?)
                        as Arc<dyn GenerationProvider>)
                },
            );
        }
        {
            let config = config.openai_tts.clone();
            registry.register(
                OpenAiTtsProvider::KEY,
                GenerationKind::TextToSpeech,
                move || {
                    Ok(Arc::new(OpenAiTtsProvider::new(config.clone(), client.clone())?)
                        as Arc<dyn GenerationProvider>)
                },
            );
        }

        info!(providers = ?registry.keys(), "Provider registry initialized");
        Ok(registry)
    }

    /// Register a factory under `key`, replacing any earlier registration.
    pub fn register<F>(&mut self, key: impl Into<String>, kind: GenerationKind, factory: F)
    where
        F: Fn() -> ProviderResult<Arc<dyn GenerationProvider>> + Send + Sync + 'static,
    {
        let key = key.into();
        self.lock_instances().remove(&key);
        self.registrations.insert(
            key,
            Registration {
                kind,
                factory: Arc::new(factory),
            },
        );
    }

    /// Register an already built provider under its own key.
    pub fn register_instance(&mut self, provider: Arc<dyn GenerationProvider>) {
        let key = provider.key().to_string();
        let kind = provider.kind();
        let instance = Arc::clone(&provider);
        self.register(key.clone(), kind, move || Ok(Arc::clone(&instance)));
        self.lock_instances().insert(key, provider);
    }

    /// Look up (creating on first use) the provider for `key`.
    pub fn get(&self, key: &str) -> ProviderResult<Arc<dyn GenerationProvider>> {
        let registration = self
            .registrations
            .get(key)
            .ok_or_else(|| ProviderError::unsupported(key))?;

        // Held across construction so two callers never build the same provider.
        let mut instances = self.lock_instances();
        if let Some(provider) = instances.get(key) {
            return Ok(Arc::clone(provider));
        }

        debug!(provider = key, "Instantiating provider");
        let provider = (registration.factory)()?;
        instances.insert(key.to_string(), Arc::clone(&provider));
        Ok(provider)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registrations.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.registrations.keys().cloned().collect()
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.registrations
            .iter()
            .map(|(key, r)| ProviderDescriptor {
                key: key.clone(),
                kind: r.kind,
            })
            .collect()
    }

    fn lock_instances(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn GenerationProvider>>> {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.keys())
            .finish()
    }
}
