// Strategy registry
//
// Maps each ProviderKind to the constructor that builds it. The process picks
// exactly one strategy from its configuration; nothing is auto-detected.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{AuthHeadersProvider, ClusterProvider, InClusterProvider, KubeconfigProvider, ProviderError};
use crate::config::{BaseConfig, ProviderKind};

/// Builds a provider from the static configuration
pub type ProviderConstructor = fn(&BaseConfig) -> Result<Arc<dyn ClusterProvider>, ProviderError>;

/// Registered strategy constructors, keyed by kind
#[derive(Clone)]
pub struct ProviderRegistry {
	constructors: HashMap<ProviderKind, ProviderConstructor>,
}

impl ProviderRegistry {
	/// An empty registry
	pub fn new() -> Self {
		Self {
			constructors: HashMap::new(),
		}
	}

	/// A registry with every built-in strategy
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(ProviderKind::Kubeconfig, |config| {
			Ok(Arc::new(KubeconfigProvider::new(config)?))
		});
		registry.register(ProviderKind::Disabled, |config| {
			Ok(Arc::new(KubeconfigProvider::pinned(config)?))
		});
		registry.register(ProviderKind::InCluster, |config| {
			Ok(Arc::new(InClusterProvider::new(config)?))
		});
		registry.register(ProviderKind::AuthHeaders, |config| {
			Ok(Arc::new(AuthHeadersProvider::new(config)?))
		});
		registry
	}

	/// Register `constructor` for `kind`, replacing any previous one
	pub fn register(&mut self, kind: ProviderKind, constructor: ProviderConstructor) {
		self.constructors.insert(kind, constructor);
	}

	pub fn is_registered(&self, kind: ProviderKind) -> bool {
		self.constructors.contains_key(&kind)
	}

	/// Registered kinds, in declaration order
	pub fn kinds(&self) -> Vec<ProviderKind> {
		ProviderKind::ALL
			.into_iter()
			.filter(|kind| self.is_registered(*kind))
			.collect()
	}

	/// Construct the provider selected by `config`
	pub fn create(&self, config: &BaseConfig) -> Result<Arc<dyn ClusterProvider>, ProviderError> {
		let kind = config.strategy()?;
		let constructor = self
			.constructors
			.get(&kind)
			.ok_or(ProviderError::UnregisteredStrategy(kind))?;
		let provider = constructor(config)?;
		info!(target: "cluster_provider", "Using cluster provider strategy: {kind}");
		Ok(provider)
	}
}

impl Default for ProviderRegistry {
	fn default() -> Self {
		Self::with_defaults()
	}
}

/// Construct the configured provider from the built-in strategies
pub fn new_provider(config: &BaseConfig) -> Result<Arc<dyn ClusterProvider>, ProviderError> {
	ProviderRegistry::with_defaults().create(config)
}
