// Client configuration projected from a validated credential record

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kube::config::AuthInfo;
use secrecy::{ExposeSecret, SecretSlice, SecretString};

use super::CredentialRecord;
use super::error::BuildError;

/// Which credential is presented to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
	BearerToken,
	ClientCertificate,
}

/// Client certificate and key presented during the TLS handshake
#[derive(Debug)]
pub struct ClientIdentity {
	pub certificate_data: Vec<u8>,
	pub key_data: SecretSlice<u8>,
}

/// Transport-level settings for talking to one cluster.
///
/// A one-way projection of a [`CredentialRecord`]. Both authentication shapes are
/// carried through untouched; [`ClientConfiguration::auth_method`] decides which one
/// is used when the configuration is materialized.
#[derive(Debug)]
pub struct ClientConfiguration {
	pub host: String,
	pub certificate_authority_data: Vec<u8>,
	pub client_identity: Option<ClientIdentity>,
	pub bearer_token: Option<SecretString>,
	/// When set, server certificate verification is skipped even though a CA bundle is present.
	pub insecure_skip_tls_verify: bool,
}

impl ClientConfiguration {
	/// Shape a validated record into a client configuration. Performs no validation or I/O.
	pub fn build(record: CredentialRecord) -> Self {
		let CredentialRecord {
			server,
			certificate_authority_data,
			authorization_token,
			client_certificate_data,
			client_key_data,
			insecure_skip_tls_verify,
		} = record;

		let client_identity = match (client_certificate_data, client_key_data) {
			(Some(certificate_data), Some(key_data))
				if !certificate_data.is_empty() && !key_data.expose_secret().is_empty() =>
			{
				Some(ClientIdentity {
					certificate_data,
					key_data,
				})
			},
			_ => None,
		};

		Self {
			host: server,
			certificate_authority_data,
			client_identity,
			bearer_token: authorization_token,
			insecure_skip_tls_verify,
		}
	}

	/// The bearer token wins whenever it is non-empty; otherwise the client certificate is used.
	pub fn auth_method(&self) -> Option<AuthMethod> {
		let has_token = self
			.bearer_token
			.as_ref()
			.is_some_and(|t| !t.expose_secret().is_empty());
		if has_token {
			Some(AuthMethod::BearerToken)
		} else if self.client_identity.is_some() {
			Some(AuthMethod::ClientCertificate)
		} else {
			None
		}
	}

	/// Materialize the configuration for the Kubernetes client.
	pub fn to_kube_config(&self) -> Result<kube::Config, BuildError> {
		let cluster_url = self
			.host
			.parse::<http::Uri>()
			.map_err(|e| BuildError::invalid_endpoint(&self.host, e.to_string()))?;
		if cluster_url.scheme().is_none() || cluster_url.host().is_none() {
			return Err(BuildError::invalid_endpoint(
				&self.host,
				"expected an absolute URL such as https://host:6443",
			));
		}

		let mut config = kube::Config::new(cluster_url);
		config.root_cert = Some(pem_certificates(&self.certificate_authority_data)?);
		config.accept_invalid_certs = self.insecure_skip_tls_verify;
		config.auth_info = self.auth_info();
		Ok(config)
	}

	fn auth_info(&self) -> AuthInfo {
		let mut auth_info = AuthInfo::default();
		match self.auth_method() {
			Some(AuthMethod::BearerToken) => {
				auth_info.token = self
					.bearer_token
					.as_ref()
					.map(|t| SecretString::from(t.expose_secret().to_string()));
			},
			Some(AuthMethod::ClientCertificate) => {
				if let Some(identity) = &self.client_identity {
					// kube expects the kubeconfig representation: base64 of the PEM data
					auth_info.client_certificate_data =
						Some(STANDARD.encode(&identity.certificate_data));
					auth_info.client_key_data = Some(SecretString::from(
						STANDARD.encode(identity.key_data.expose_secret()),
					));
				}
			},
			None => {},
		}
		auth_info
	}
}

/// Convert a PEM bundle into the DER certificates it contains.
fn pem_certificates(data: &[u8]) -> Result<Vec<Vec<u8>>, BuildError> {
	let certs = rustls_pemfile::certs(&mut &data[..])
		.map(|cert| cert.map(|der| der.as_ref().to_vec()))
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| BuildError::InvalidCertificateAuthority(e.to_string()))?;
	if certs.is_empty() {
		return Err(BuildError::InvalidCertificateAuthority(
			"no PEM certificates found".into(),
		));
	}
	Ok(certs)
}
