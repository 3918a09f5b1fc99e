// Static process configuration for cluster providers

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while loading or interpreting the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("failed to read config file: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to parse config: {0}")]
	Parse(#[from] serde_yaml::Error),

	#[error(
		"cluster provider strategy must be set explicitly (one of: {valid})",
		valid = ProviderKind::names().join(", ")
	)]
	StrategyRequired,

	#[error(
		"invalid cluster provider strategy '{0}', valid values are: {valid}",
		valid = ProviderKind::names().join(", ")
	)]
	UnknownStrategy(String),
}

/// The cluster-access strategies a process can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
	/// Contexts of a kubeconfig file, selectable per request
	Kubeconfig,
	/// The pod's own service account
	InCluster,
	/// The kubeconfig's current context only
	Disabled,
	/// Per-request credentials carried in the request headers
	AuthHeaders,
}

impl ProviderKind {
	pub const ALL: [ProviderKind; 4] = [
		ProviderKind::Kubeconfig,
		ProviderKind::InCluster,
		ProviderKind::Disabled,
		ProviderKind::AuthHeaders,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderKind::Kubeconfig => "kubeconfig",
			ProviderKind::InCluster => "in-cluster",
			ProviderKind::Disabled => "disabled",
			ProviderKind::AuthHeaders => "auth-headers",
		}
	}

	pub fn names() -> Vec<&'static str> {
		Self::ALL.iter().map(ProviderKind::as_str).collect()
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProviderKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
	}
}

/// Configuration shared by every cluster provider.
///
/// ```yaml
/// cluster-provider-strategy: auth-headers
/// kubeconfig: /etc/cluster-provider/kubeconfig
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BaseConfig {
	/// Which strategy to construct. There is no auto-detection.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cluster_provider_strategy: Option<ProviderKind>,
	/// Kubeconfig for the kubeconfig-backed strategies; the standard lookup is used when unset
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kubeconfig: Option<PathBuf>,
}

impl BaseConfig {
	pub fn with_strategy(kind: ProviderKind) -> Self {
		Self {
			cluster_provider_strategy: Some(kind),
			..Default::default()
		}
	}

	pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
		self.kubeconfig = Some(path.into());
		self
	}

	pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
		Ok(serde_yaml::from_str(content)?)
	}

	/// Load the configuration from a YAML file
	pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = fs_err::read_to_string(path)?;
		let config = Self::from_yaml(&content)?;
		info!(
			target: "cluster_provider",
			"Loaded configuration from {} (strategy: {})",
			path.display(),
			config
				.cluster_provider_strategy
				.map(|k| k.as_str())
				.unwrap_or("<unset>")
		);
		Ok(config)
	}

	/// The configured strategy; unset is an error rather than a guess.
	pub fn strategy(&self) -> Result<ProviderKind, ConfigError> {
		self
			.cluster_provider_strategy
			.ok_or(ConfigError::StrategyRequired)
	}
}
