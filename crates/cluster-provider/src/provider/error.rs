// Cluster provider error types

use thiserror::Error;

use crate::config::{ConfigError, ProviderKind};
use crate::credentials::{BuildError, DecodeError};

/// Errors returned by cluster provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
	#[error("missing credential payload")]
	MissingPayload,

	#[error("failed to parse credential payload: {0}")]
	Decode(#[from] DecodeError),

	#[error("{capability} is not supported by the {provider} cluster provider")]
	Unsupported {
		capability: &'static str,
		provider: ProviderKind,
	},

	#[error("invalid client configuration: {0}")]
	InvalidClientConfig(#[from] BuildError),

	#[error("failed to construct cluster client: {0}")]
	ClientConstruction(#[source] kube::Error),

	#[error("unknown target '{0}'")]
	UnknownTarget(String),

	#[error("no kubeconfig configured and no default location could be determined")]
	KubeconfigNotFound,

	#[error("failed to load kubeconfig: {0}")]
	Kubeconfig(#[from] kube::config::KubeconfigError),

	#[error("failed to load in-cluster configuration: {0}")]
	InCluster(#[from] kube::config::InClusterError),

	#[error("cluster API request failed: {0}")]
	Api(#[source] kube::Error),

	#[error("token is not authenticated: {0}")]
	Unauthenticated(String),

	#[error("request was cancelled")]
	Cancelled,

	#[error("no constructor registered for cluster provider strategy '{0}'")]
	UnregisteredStrategy(ProviderKind),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl ProviderError {
	pub fn unsupported(capability: &'static str, provider: ProviderKind) -> Self {
		Self::Unsupported {
			capability,
			provider,
		}
	}

	/// A capability the strategy does not offer, as opposed to a failure.
	///
	/// Callers may treat this as "skip".
	pub fn is_unsupported(&self) -> bool {
		matches!(self, Self::Unsupported { .. })
	}
}
