// In-cluster strategy: the pod's own service account

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::UserInfo;
use kube::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::cluster::{cancellable, client_from_config, serves_openshift, verify_token};
use super::{ClusterProvider, ProviderError, TargetsChanged};
use crate::config::{BaseConfig, ProviderKind};
use crate::context::RequestContext;

/// Cluster provider backed by the service account mounted into the pod.
///
/// The client is built on first use and shared afterwards.
pub struct InClusterProvider {
	config: kube::Config,
	client: OnceCell<Client>,
}

impl InClusterProvider {
	pub fn new(_config: &BaseConfig) -> Result<Self, ProviderError> {
		let config = kube::Config::incluster()?;
		info!(target: "cluster_provider", "Using in-cluster configuration for {}", config.cluster_url);
		Ok(Self::from_kube_config(config))
	}

	/// Use an already loaded configuration instead of the pod environment
	pub fn from_kube_config(config: kube::Config) -> Self {
		Self {
			config,
			client: OnceCell::new(),
		}
	}

	async fn client(&self) -> Result<Client, ProviderError> {
		self
			.client
			.get_or_try_init(|| async { client_from_config(self.config.clone()) })
			.await
			.cloned()
	}
}

#[async_trait]
impl ClusterProvider for InClusterProvider {
	fn kind(&self) -> ProviderKind {
		ProviderKind::InCluster
	}

	async fn resolve_client(&self, _ctx: &RequestContext, _target: &str) -> Result<Client, ProviderError> {
		self.client().await
	}

	fn supports_multi_target(&self) -> bool {
		false
	}

	async fn list_targets(&self, _ctx: &RequestContext) -> Result<Vec<String>, ProviderError> {
		Ok(vec![String::new()])
	}

	fn default_target(&self) -> String {
		String::new()
	}

	fn target_parameter_name(&self) -> String {
		String::new()
	}

	async fn is_managed_platform(&self, ctx: &RequestContext) -> bool {
		let detected = cancellable(ctx, async { serves_openshift(&self.client().await?).await }).await;
		detected.unwrap_or_else(|e| {
			debug!(target: "cluster_provider", "Managed platform detection failed: {e}");
			false
		})
	}

	async fn verify_identity(
		&self,
		ctx: &RequestContext,
		_target: &str,
		token: &str,
		audience: &str,
	) -> Result<(UserInfo, Vec<String>), ProviderError> {
		cancellable(ctx, async { verify_token(self.client().await?, token, audience).await }).await
	}

	fn watch_targets(&self, _on_change: TargetsChanged) {}

	async fn reload(&self) -> Result<(), ProviderError> {
		Ok(())
	}

	fn close(&self) {}
}
