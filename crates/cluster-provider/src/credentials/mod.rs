// Header-encoded cluster credentials
//
// A caller that wants to reach an arbitrary cluster sends one opaque payload
// describing the target server and its identity. The payload is either a JSON
// object or the base64 encoding of one:
//
//   {
//     "x-target-k8s-server": "https://api.example:6443",
//     "x-target-k8s-certificate-authority-data": "<base64 PEM bundle>",
//     "x-target-k8s-authorization": "<bearer token>",
//     "x-target-k8s-client-certificate-data": "<base64 PEM certificate>",
//     "x-target-k8s-client-key-data": "<base64 PEM key>",
//     "x-target-k8s-insecure-skip-tls-verify": "false"
//   }
//
// Keys are matched case-insensitively. Unknown keys are ignored.

mod client_config;
mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
pub use client_config::{AuthMethod, ClientConfiguration, ClientIdentity};
pub use error::{BuildError, DecodeError};
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use serde_json::{Map, Value};

/// Target cluster API endpoint URL
pub const SERVER_KEY: &str = "x-target-k8s-server";
/// Base64-encoded CA bundle of the target cluster
pub const CERTIFICATE_AUTHORITY_DATA_KEY: &str = "x-target-k8s-certificate-authority-data";
/// Bearer token
pub const AUTHORIZATION_TOKEN_KEY: &str = "x-target-k8s-authorization";
/// Base64-encoded client certificate
pub const CLIENT_CERTIFICATE_DATA_KEY: &str = "x-target-k8s-client-certificate-data";
/// Base64-encoded client private key
pub const CLIENT_KEY_DATA_KEY: &str = "x-target-k8s-client-key-data";
/// `"true"` (any case) disables server certificate verification
pub const INSECURE_SKIP_TLS_VERIFY_KEY: &str = "x-target-k8s-insecure-skip-tls-verify";

/// Validated target cluster and identity for a single request.
///
/// Only [`CredentialRecord::decode`] creates records, so every record upholds the
/// authentication-shape invariant: a non-empty bearer token, or a complete client
/// certificate/key pair (or both).
#[derive(Debug)]
pub struct CredentialRecord {
	server: String,
	certificate_authority_data: Vec<u8>,
	authorization_token: Option<SecretString>,
	client_certificate_data: Option<Vec<u8>>,
	client_key_data: Option<SecretSlice<u8>>,
	insecure_skip_tls_verify: bool,
}

impl CredentialRecord {
	/// Decode and validate a raw payload as received from the transport.
	pub fn decode(raw: &str) -> Result<Self, DecodeError> {
		// Callers may pre-encode the JSON object; anything that isn't valid base64 is taken as-is.
		let payload = decode_base64(raw).unwrap_or_else(|_| raw.as_bytes().to_vec());

		let fields: Map<String, Value> =
			serde_json::from_slice(&payload).map_err(DecodeError::Malformed)?;
		let fields = PayloadFields::new(fields);

		let server = fields
			.string(SERVER_KEY)?
			.filter(|s| !s.trim().is_empty())
			.ok_or(DecodeError::ServerRequired)?
			.to_string();

		let certificate_authority_data = fields
			.string(CERTIFICATE_AUTHORITY_DATA_KEY)?
			.filter(|s| !s.is_empty())
			.ok_or(DecodeError::CertificateAuthorityRequired)?;
		let certificate_authority_data = decode_base64(certificate_authority_data)
			.map_err(DecodeError::InvalidCertificateAuthority)?;
		if certificate_authority_data.is_empty() {
			return Err(DecodeError::CertificateAuthorityRequired);
		}

		let insecure_skip_tls_verify = fields
			.string(INSECURE_SKIP_TLS_VERIFY_KEY)?
			.is_some_and(|v| v.eq_ignore_ascii_case("true"));

		let authorization_token = fields
			.string(AUTHORIZATION_TOKEN_KEY)?
			.filter(|s| !s.is_empty())
			.map(|s| SecretString::from(s.to_string()));

		let client_certificate_data = fields
			.base64(CLIENT_CERTIFICATE_DATA_KEY)?
			.map(|data| data.map_err(DecodeError::InvalidClientCertificate))
			.transpose()?;
		let client_key_data = fields
			.base64(CLIENT_KEY_DATA_KEY)?
			.map(|data| data.map_err(DecodeError::InvalidClientKey))
			.transpose()?
			.map(SecretSlice::from);

		let record = Self {
			server,
			certificate_authority_data,
			authorization_token,
			client_certificate_data,
			client_key_data,
			insecure_skip_tls_verify,
		};
		if !record.is_valid() {
			return Err(DecodeError::NoAuthenticationMethod);
		}
		Ok(record)
	}

	/// True when a usable authentication shape is present.
	pub fn is_valid(&self) -> bool {
		self.has_token() || self.has_client_certificate()
	}

	pub fn has_token(&self) -> bool {
		self.authorization_token().is_some_and(|t| !t.is_empty())
	}

	pub fn has_client_certificate(&self) -> bool {
		self.client_certificate_data().is_some_and(|c| !c.is_empty())
			&& self.client_key_data().is_some_and(|k| !k.is_empty())
	}

	pub fn server(&self) -> &str {
		&self.server
	}

	pub fn certificate_authority_data(&self) -> &[u8] {
		&self.certificate_authority_data
	}

	pub fn authorization_token(&self) -> Option<&str> {
		self.authorization_token.as_ref().map(|t| t.expose_secret())
	}

	pub fn client_certificate_data(&self) -> Option<&[u8]> {
		self.client_certificate_data.as_deref()
	}

	pub fn client_key_data(&self) -> Option<&[u8]> {
		self.client_key_data.as_ref().map(|k| k.expose_secret())
	}

	pub fn insecure_skip_tls_verify(&self) -> bool {
		self.insecure_skip_tls_verify
	}
}

impl PartialEq for CredentialRecord {
	fn eq(&self, other: &Self) -> bool {
		self.server == other.server
			&& self.certificate_authority_data == other.certificate_authority_data
			&& self.authorization_token() == other.authorization_token()
			&& self.client_certificate_data == other.client_certificate_data
			&& self.client_key_data() == other.client_key_data()
			&& self.insecure_skip_tls_verify == other.insecure_skip_tls_verify
	}
}

impl Eq for CredentialRecord {}

/// Standard base64, tolerating the line breaks `base64` and similar tools wrap output with.
fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
	if !data.contains(['\r', '\n']) {
		return STANDARD.decode(data);
	}
	let unwrapped: String = data.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
	STANDARD.decode(unwrapped)
}

/// Top-level payload fields with lower-cased keys.
struct PayloadFields(Map<String, Value>);

impl PayloadFields {
	fn new(fields: Map<String, Value>) -> Self {
		// On a case-only collision the later key in the document wins.
		Self(
			fields
				.into_iter()
				.map(|(k, v)| (k.to_lowercase(), v))
				.collect(),
		)
	}

	/// Look up a known string field. Absent and `null` are both treated as missing.
	fn string(&self, key: &'static str) -> Result<Option<&str>, DecodeError> {
		match self.0.get(key) {
			None | Some(Value::Null) => Ok(None),
			Some(Value::String(s)) => Ok(Some(s.as_str())),
			Some(_) => Err(DecodeError::InvalidType { field: key }),
		}
	}

	/// Look up a known base64 field; empty strings count as missing.
	fn base64(
		&self,
		key: &'static str,
	) -> Result<Option<Result<Vec<u8>, base64::DecodeError>>, DecodeError> {
		Ok(
			self
				.string(key)?
				.filter(|s| !s.is_empty())
				.map(decode_base64),
		)
	}
}
