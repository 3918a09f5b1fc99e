// Integration tests for per-request credentials, from HTTP headers to client

use assert_matches::assert_matches;
use cluster_provider::credentials::testing::{PayloadBuilder, TEST_CLIENT_CERT, encode};
use cluster_provider::credentials::{
	AuthMethod, CLIENT_CERTIFICATE_DATA_KEY, CredentialRecord, DecodeError, SERVER_KEY,
};
use cluster_provider::provider::{AuthHeadersProvider, ProviderError};
use cluster_provider::{BaseConfig, ClusterProvider, ProviderKind, RequestContext, new_provider};
use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderValue};

fn headers(payload: &str) -> anyhow::Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	headers.insert(AUTHORIZATION, HeaderValue::from_str(payload)?);
	Ok(headers)
}

/// A token payload sent as base64 resolves to a client for the named server
#[tokio::test]
async fn test_header_to_client_with_token() -> anyhow::Result<()> {
	let provider = new_provider(&BaseConfig::with_strategy(ProviderKind::AuthHeaders))?;
	assert_eq!(provider.kind(), ProviderKind::AuthHeaders);

	let payload = PayloadBuilder::new("https://cluster.example.com:6443")
		.token("Bearer abc")
		.base64();
	let ctx = RequestContext::from_headers(&headers(&payload)?);

	let client = provider.resolve_client(&ctx, "").await;
	assert!(client.is_ok());
	Ok(())
}

/// A client certificate payload sent as raw JSON resolves too
#[tokio::test]
async fn test_header_to_client_with_client_certificate() -> anyhow::Result<()> {
	let provider = AuthHeadersProvider::new(&BaseConfig::default())?;
	let payload = PayloadBuilder::new("https://10.0.0.1:6443")
		.client_certificate()
		.insecure("true")
		.json();
	let ctx = RequestContext::from_headers(&headers(&payload)?);

	let config = provider.client_configuration(&ctx)?;
	assert_eq!(config.host, "https://10.0.0.1:6443");
	assert!(config.insecure_skip_tls_verify);
	assert_eq!(config.auth_method(), Some(AuthMethod::ClientCertificate));

	let kube_config = config.to_kube_config()?;
	assert!(kube_config.accept_invalid_certs);
	assert_eq!(kube_config.cluster_url.host(), Some("10.0.0.1"));

	assert!(provider.resolve_client(&ctx, "").await.is_ok());
	Ok(())
}

/// Requests never share credentials
#[tokio::test]
async fn test_requests_are_independent() -> anyhow::Result<()> {
	let provider = new_provider(&BaseConfig::with_strategy(ProviderKind::AuthHeaders))?;

	let first = PayloadBuilder::new("https://first.example.com").token("one").json();
	let first_ctx = RequestContext::from_headers(&headers(&first)?);
	assert!(provider.resolve_client(&first_ctx, "").await.is_ok());

	// The next request forgot its header; nothing from the first one leaks in
	let second_ctx = RequestContext::from_headers(&HeaderMap::new());
	assert_matches!(
		provider.resolve_client(&second_ctx, "").await.err(),
		Some(ProviderError::MissingPayload)
	);
	Ok(())
}

/// Keys differing only in case collapse onto the same field
#[tokio::test]
async fn test_mixed_case_keys() -> anyhow::Result<()> {
	let payload = PayloadBuilder::new("https://lower.example.com")
		.without(SERVER_KEY)
		.field("X-Target-K8S-Server", "https://upper.example.com")
		.token("t")
		.json();
	let record = CredentialRecord::decode(&payload)?;
	assert_eq!(record.server(), "https://upper.example.com");
	assert!(record.is_valid());
	Ok(())
}

/// Validation failures surface with the codec's reason
#[tokio::test]
async fn test_invalid_payloads() -> anyhow::Result<()> {
	let provider = new_provider(&BaseConfig::with_strategy(ProviderKind::AuthHeaders))?;

	let cases = [
		(
			PayloadBuilder::new("https://a").token("t").without(SERVER_KEY).json(),
			"failed to parse credential payload: server required",
		),
		(
			"not-base64!".to_string(),
			"failed to parse credential payload: malformed payload",
		),
	];
	for (payload, expected) in cases {
		let ctx = RequestContext::from_headers(&headers(&payload)?);
		let err = provider.resolve_client(&ctx, "").await.err().unwrap();
		assert_eq!(err.to_string(), expected);
	}

	let half_pair = PayloadBuilder::new("https://a")
		.field(CLIENT_CERTIFICATE_DATA_KEY, encode(TEST_CLIENT_CERT))
		.json();
	let ctx = RequestContext::from_headers(&headers(&half_pair)?);
	assert_matches!(
		provider.resolve_client(&ctx, "").await.err(),
		Some(ProviderError::Decode(DecodeError::NoAuthenticationMethod))
	);
	Ok(())
}

/// Capabilities the strategy can't offer are reported as such
#[tokio::test]
async fn test_unsupported_verification() -> anyhow::Result<()> {
	let provider = new_provider(&BaseConfig::with_strategy(ProviderKind::AuthHeaders))?;
	let ctx = RequestContext::new();

	assert!(!provider.is_managed_platform(&ctx).await);
	let err = provider
		.verify_identity(&ctx, "", "token", "audience")
		.await
		.unwrap_err();
	assert!(err.is_unsupported());
	Ok(())
}
