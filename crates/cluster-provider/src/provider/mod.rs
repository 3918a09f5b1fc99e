// Cluster Provider Module
//
// Every way of reaching a cluster (a kubeconfig file, the pod's service account,
// credentials carried by the request itself) sits behind the ClusterProvider
// trait, so the rest of the server never needs to know which one is active.
//
// Strategies are registered against a ProviderKind once at startup; see
// ProviderRegistry.

mod auth_headers;
mod cluster;
mod error;
mod in_cluster;
mod kubeconfig;
mod registry;

use std::sync::Arc;

use async_trait::async_trait;
pub use auth_headers::AuthHeadersProvider;
pub use error::ProviderError;
pub use in_cluster::InClusterProvider;
use k8s_openapi::api::authentication::v1::UserInfo;
pub use kubeconfig::{CONTEXT_PARAMETER, KubeconfigProvider};
use kube::Client;
pub use registry::{ProviderConstructor, ProviderRegistry, new_provider};

use crate::config::ProviderKind;
use crate::context::RequestContext;

/// Callback invoked when the set of available targets changes
pub type TargetsChanged = Arc<dyn Fn() + Send + Sync>;

/// Capability contract shared by every cluster-access strategy.
///
/// Providers are long-lived and shared across concurrent requests. Anything
/// request-specific arrives through the [`RequestContext`]. Every strategy
/// implements every method; capabilities that don't apply are no-ops or return
/// [`ProviderError::Unsupported`].
#[async_trait]
pub trait ClusterProvider: Send + Sync {
	/// The strategy this provider implements
	fn kind(&self) -> ProviderKind;

	/// Produce a ready client for one logical request against `target`.
	///
	/// An empty `target` selects the default target.
	async fn resolve_client(&self, ctx: &RequestContext, target: &str) -> Result<Client, ProviderError>;

	/// Whether callers may choose between several targets
	fn supports_multi_target(&self) -> bool;

	/// The targets a caller may choose from.
	///
	/// Single-target strategies return one entry, possibly the empty placeholder.
	async fn list_targets(&self, ctx: &RequestContext) -> Result<Vec<String>, ProviderError>;

	/// Target used when the caller doesn't pick one; empty when not applicable
	fn default_target(&self) -> String;

	/// Name of the parameter a caller-facing layer should use to select a target;
	/// empty when not applicable
	fn target_parameter_name(&self) -> String;

	/// Best-effort detection of a managed (OpenShift) platform. Never fails.
	async fn is_managed_platform(&self, ctx: &RequestContext) -> bool;

	/// Introspect `token` against `target`, returning the user it belongs to and
	/// the audiences it was accepted for.
	async fn verify_identity(
		&self,
		ctx: &RequestContext,
		target: &str,
		token: &str,
		audience: &str,
	) -> Result<(UserInfo, Vec<String>), ProviderError>;

	/// Register a callback for target set changes
	fn watch_targets(&self, on_change: TargetsChanged);

	/// Re-read any configuration the strategy depends on
	async fn reload(&self) -> Result<(), ProviderError>;

	/// Release background resources
	fn close(&self);
}
