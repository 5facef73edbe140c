//! Client-level error types shared across the session manager, typed API, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::credential::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded, or a request body could not be encoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// The session expired and the refresh endpoint refused to rotate it.
	///
	/// Callers are expected to send the user back to the login route.
	#[error("Authentication failed; the session could not be refreshed.")]
	AuthenticationFailed,
	/// A typed API call received a status it does not know how to interpret.
	#[error("Server responded with unexpected status {status}: {body}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the server.
		status: u16,
		/// Truncated body preview.
		body: String,
	},
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
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Endpoint path does not start with `/`.
	#[error("The {endpoint} path must start with '/': {path}.")]
	InvalidPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// A configured interval was zero or negative.
	#[error("The {field} interval must be positive.")]
	NonPositiveInterval {
		/// Which interval failed validation.
		field: &'static str,
	},
	/// Request target cannot be resolved against the base URL.
	#[error("Request target `{target}` cannot be resolved.")]
	InvalidTarget {
		/// Target supplied by the caller.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Caller attached credentials that the session manager owns.
	#[error("Request already carries a `{header}` header; credentials are attached automatically.")]
	ExplicitCredentials {
		/// Header name that was rejected.
		header: &'static str,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
	/// Project payload is missing a required field.
	#[error("Project is invalid: {reason}.")]
	InvalidProject {
		/// Human-readable validation failure.
		reason: &'static str,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration document is malformed.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Body encoding and decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body is not the JSON document the caller expected.
	#[error("Response body from {target} is malformed JSON.")]
	ResponseJson {
		/// Request target that produced the body.
		target: String,
		/// HTTP status code of the response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Request payload could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestJson(#[from] serde_json::Error),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// URL that was being requested.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for a response.
	#[error("Request to {target} timed out.")]
	Timeout {
		/// URL that was being requested.
		target: String,
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(target: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(target: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { target: target.into(), source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		let target = e.url().map(ToString::to_string).unwrap_or_default();

		if e.is_timeout() { Self::timeout(target, e) } else { Self::network(target, e) }
	}
}
