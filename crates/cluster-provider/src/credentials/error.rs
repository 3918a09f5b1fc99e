// Credential payload error types

use thiserror::Error;

use super::{AUTHORIZATION_TOKEN_KEY, CLIENT_CERTIFICATE_DATA_KEY, CLIENT_KEY_DATA_KEY};

/// Errors produced while decoding a request-scoped credential payload.
///
/// Messages never echo payload content: the payload carries tokens and private keys.
#[derive(Error, Debug)]
pub enum DecodeError {
	#[error("malformed payload")]
	Malformed(#[source] serde_json::Error),

	#[error("field '{field}' must be a string")]
	InvalidType { field: &'static str },

	#[error("server required")]
	ServerRequired,

	#[error("certificate authority required")]
	CertificateAuthorityRequired,

	#[error("invalid certificate authority data")]
	InvalidCertificateAuthority(#[source] base64::DecodeError),

	#[error("invalid client certificate data")]
	InvalidClientCertificate(#[source] base64::DecodeError),

	#[error("invalid client key data")]
	InvalidClientKey(#[source] base64::DecodeError),

	#[error(
		"no valid authentication method provided: either '{token}' or both '{cert}' and '{key}' are required",
		token = AUTHORIZATION_TOKEN_KEY,
		cert = CLIENT_CERTIFICATE_DATA_KEY,
		key = CLIENT_KEY_DATA_KEY
	)]
	NoAuthenticationMethod,
}

/// Errors produced while turning a client configuration into a `kube::Config`.
#[derive(Error, Debug)]
pub enum BuildError {
	#[error("invalid cluster endpoint '{host}': {reason}")]
	InvalidEndpoint { host: String, reason: String },

	#[error("invalid certificate authority bundle: {0}")]
	InvalidCertificateAuthority(String),
}

impl BuildError {
	pub fn invalid_endpoint(host: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidEndpoint {
			host: host.into(),
			reason: reason.into(),
		}
	}
}
