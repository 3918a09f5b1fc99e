// Helpers shared by strategies that hold a real cluster identity

use std::future::Future;

use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewSpec, UserInfo};
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::debug;

use super::ProviderError;
use crate::context::RequestContext;

/// API group only served by OpenShift clusters
const OPENSHIFT_API_GROUP: &str = "project.openshift.io";

/// Build a client. Does not contact the cluster.
pub(super) fn client_from_config(config: kube::Config) -> Result<Client, ProviderError> {
	Client::try_from(config).map_err(ProviderError::ClientConstruction)
}

/// Run `fut` unless the request is cancelled first
pub(super) async fn cancellable<T>(
	ctx: &RequestContext,
	fut: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
	tokio::select! {
		biased;
		_ = ctx.cancellation().cancelled() => Err(ProviderError::Cancelled),
		result = fut => result,
	}
}

/// Submit a TokenReview and return the authenticated user and accepted audiences
pub(super) async fn verify_token(
	client: Client,
	token: &str,
	audience: &str,
) -> Result<(UserInfo, Vec<String>), ProviderError> {
	let review = TokenReview {
		spec: TokenReviewSpec {
			token: Some(token.to_string()),
			audiences: (!audience.is_empty()).then(|| vec![audience.to_string()]),
		},
		..Default::default()
	};

	let api: Api<TokenReview> = Api::all(client);
	let review = api
		.create(&PostParams::default(), &review)
		.await
		.map_err(ProviderError::Api)?;

	let status = review.status.unwrap_or_default();
	if !status.authenticated.unwrap_or(false) {
		return Err(ProviderError::Unauthenticated(
			status
				.error
				.unwrap_or_else(|| "token review rejected the token".to_string()),
		));
	}

	let user = status.user.unwrap_or_default();
	debug!(target: "cluster_provider", "Token review authenticated user {:?}", user.username);
	Ok((user, status.audiences.unwrap_or_default()))
}

/// Whether the cluster behind `client` serves the OpenShift project API
pub(super) async fn serves_openshift(client: &Client) -> Result<bool, ProviderError> {
	let groups = client.list_api_groups().await.map_err(ProviderError::Api)?;
	Ok(groups.groups.iter().any(|g| g.name == OPENSHIFT_API_GROUP))
}
