//! Client-level error types shared across the request pipeline, flows, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); never retried by the client.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request or response payload could not be encoded or decoded.
	#[error(transparent)]
	Payload(#[from] PayloadError),

	/// Backend answered with a non-success status that the client does not recover from.
	#[error("Request failed with HTTP status {status}.")]
	RequestFailed {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Decoded response body (local casing), or the raw text as a JSON string.
		body: Value,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The session cannot be recovered; the stored credential has been cleared and the caller
	/// must authenticate again.
	#[error("Authentication expired: {reason}.")]
	AuthExpired {
		/// Why the session could not be recovered.
		reason: String,
		/// Failure that caused the refresh to fail, when there was one.
		#[source]
		source: Option<Box<Error>>,
	},
	/// Caller-supplied arguments were rejected before any network I/O.
	#[error("Invalid input: {reason}.")]
	InvalidInput {
		/// Human-readable validation failure.
		reason: String,
	},
}
impl Error {
	/// Builds an [`Error::AuthExpired`] without an underlying cause.
	pub fn auth_expired(reason: impl Into<String>) -> Self {
		Self::AuthExpired { reason: reason.into(), source: None }
	}

	/// Returns `true` when the caller must authenticate again.
	pub fn is_auth_expired(&self) -> bool {
		matches!(self, Self::AuthExpired { .. })
	}

	/// HTTP status attached to the error, if the backend produced one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::RequestFailed { status, .. } => Some(*status),
			Self::Payload(PayloadError::Decode { status, .. }) => *status,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Rejected input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http/https.
	#[error("Base URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Rejected scheme.
		scheme: String,
	},
	/// Endpoint path joined onto the base URL produced an invalid URL.
	#[error("Endpoint `{path}` cannot be joined onto the base URL.")]
	InvalidEndpoint {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header produced by a pipeline stage is not valid on the wire.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Encode/decode failures at the JSON boundary.
#[derive(Debug, ThisError)]
pub enum PayloadError {
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Encode(#[source] serde_json::Error),
	/// Response body did not match the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure carrying the failing JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// A token field decoded fine but carried an empty string.
	#[error("Response field `{field}` is empty.")]
	EmptyToken {
		/// Name of the empty field.
		field: &'static str,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within the configured timeout.
	#[error("Request to the backend timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_expired_exposes_its_cause() {
		let cause = Error::RequestFailed { status: 401, body: Value::Null, retry_after: None };
		let err = Error::AuthExpired {
			reason: "refresh token was rejected".into(),
			source: Some(Box::new(cause)),
		};

		assert!(err.is_auth_expired());
		assert_eq!(err.to_string(), "Authentication expired: refresh token was rejected.");

		let source = StdError::source(&err).expect("AuthExpired should expose its cause.");

		assert_eq!(source.to_string(), "Request failed with HTTP status 401.");
	}

	#[test]
	fn status_is_reported_for_request_failures_only() {
		let failed =
			Error::RequestFailed { status: 404, body: Value::Null, retry_after: None };

		assert_eq!(failed.status(), Some(404));
		assert_eq!(Error::auth_expired("gone").status(), None);
	}
}
