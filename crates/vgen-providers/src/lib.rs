//! Generation providers for the vgen backend.
//!
//! This crate provides:
//! - The provider contract ([`GenerationProvider`]) and per-provider [`PollPolicy`]
//! - A registry that lazily builds one provider instance per key
//! - Vendor adapters: fal queue (video), Replicate predictions (video),
//!   OpenAI speech (TTS)

pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod vendors;

pub use config::{FalConfig, OpenAiTtsConfig, ProvidersConfig, ReplicateConfig};
pub use error::{ProviderError, ProviderResult};
pub use provider::{GenerationProvider, PollPolicy};
pub use registry::{ProviderDescriptor, ProviderFactory, ProviderRegistry};
pub use vendors::{FalProvider, OpenAiTtsProvider, ReplicateProvider};
