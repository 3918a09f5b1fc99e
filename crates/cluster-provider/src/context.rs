// Per-request execution context
//
// The transport layer fills a RequestContext for every call and passes it down
// explicitly. Cluster providers read from it but never keep anything from it.

use std::collections::HashMap;
use std::fmt;

use http::HeaderMap;
use tokio_util::sync::CancellationToken;

/// Context key holding the raw credential payload, exactly as received.
///
/// HTTP transports take it from the `Authorization` header.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Request-scoped values plus the caller's cancellation signal.
///
/// Keys are case-insensitive.
#[derive(Clone, Default)]
pub struct RequestContext {
	values: HashMap<String, String>,
	cancellation: CancellationToken,
}

impl RequestContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a context from incoming HTTP headers.
	///
	/// Only the credential payload header is carried over.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let mut ctx = Self::new();
		if let Some(payload) = headers
			.get(http::header::AUTHORIZATION)
			.and_then(|v| v.to_str().ok())
		{
			ctx.insert(AUTHORIZATION_KEY, payload);
		}
		ctx
	}

	pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
		self.insert(key, value);
		self
	}

	/// Tie this context to the caller's cancellation token
	pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
		self.cancellation = cancellation;
		self
	}

	pub fn insert(&mut self, key: &str, value: impl Into<String>) {
		self.values.insert(key.to_ascii_lowercase(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
	}

	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancellation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancellation.is_cancelled()
	}
}

// Values may be credentials, so only keys are printed.
impl fmt::Debug for RequestContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestContext")
			.field("keys", &self.values.keys().collect::<Vec<_>>())
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}
