// Per-request credentials strategy
//
// The provider owns no cluster identity. Every call decodes the payload the
// caller sent with the request and builds a fresh client from it, so nothing is
// shared between requests and nothing is cached.

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::UserInfo;
use kube::Client;
use tracing::{debug, warn};

use super::cluster::client_from_config;
use super::{ClusterProvider, ProviderError, TargetsChanged};
use crate::config::{BaseConfig, ProviderKind};
use crate::context::{AUTHORIZATION_KEY, RequestContext};
use crate::credentials::{ClientConfiguration, CredentialRecord};

/// Cluster provider that reads the target cluster and credentials from each
/// request's [`AUTHORIZATION_KEY`] context value.
#[derive(Debug, Default)]
pub struct AuthHeadersProvider {}

impl AuthHeadersProvider {
	/// The static configuration carries nothing this strategy needs.
	pub fn new(_config: &BaseConfig) -> Result<Self, ProviderError> {
		debug!(target: "cluster_provider", "Using per-request credentials from the request context");
		Ok(Self {})
	}

	/// Decode the request's payload into a client configuration
	pub fn client_configuration(
		&self,
		ctx: &RequestContext,
	) -> Result<ClientConfiguration, ProviderError> {
		let raw = ctx
			.get(AUTHORIZATION_KEY)
			.ok_or(ProviderError::MissingPayload)?;
		let record = CredentialRecord::decode(raw).inspect_err(|e| {
			warn!(target: "cluster_provider", "Rejected credential payload: {e}");
		})?;
		Ok(ClientConfiguration::build(record))
	}
}

#[async_trait]
impl ClusterProvider for AuthHeadersProvider {
	fn kind(&self) -> ProviderKind {
		ProviderKind::AuthHeaders
	}

	async fn resolve_client(&self, ctx: &RequestContext, _target: &str) -> Result<Client, ProviderError> {
		let config = self.client_configuration(ctx)?;
		debug!(
			target: "cluster_provider",
			"Building client for {} ({:?})",
			config.host,
			config.auth_method()
		);
		client_from_config(config.to_kube_config()?)
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

	async fn is_managed_platform(&self, _ctx: &RequestContext) -> bool {
		debug!(target: "cluster_provider", "Managed platform detection is not available with per-request credentials");
		false
	}

	async fn verify_identity(
		&self,
		_ctx: &RequestContext,
		_target: &str,
		_token: &str,
		_audience: &str,
	) -> Result<(UserInfo, Vec<String>), ProviderError> {
		Err(ProviderError::unsupported("token verification", self.kind()))
	}

	fn watch_targets(&self, _on_change: TargetsChanged) {
		debug!(target: "cluster_provider", "Target watching is a no-op with per-request credentials");
	}

	async fn reload(&self) -> Result<(), ProviderError> {
		Ok(())
	}

	fn close(&self) {}
}
