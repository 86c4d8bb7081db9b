//! Client-level error types shared across the pipeline, refresh coordinator, and stores.

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
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The session could not be recovered; stored tokens have been cleared.
	#[error(transparent)]
	Session(#[from] SessionError),

	/// Backend answered with a status the pipeline does not recover from.
	#[error("Request to {url} failed with status {status}: {message}.")]
	Api {
		/// HTTP status code returned by the backend.
		status: u16,
		/// URL of the originating request.
		url: String,
		/// Backend-supplied message, or the raw body when none was provided.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Login endpoint rejected the supplied credentials.
	#[error("Login was rejected: {reason}.")]
	InvalidCredentials {
		/// Backend-supplied reason string.
		reason: String,
	},
	/// Response body did not match the expected JSON shape.
	#[error("Response from {url} could not be decoded.")]
	Decode {
		/// URL of the originating request.
		url: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns the HTTP status carried by the error, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api { status, .. } => Some(*status),
			Self::Session(SessionError::RefreshRejected { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the error ended the session (tokens were cleared).
	pub fn is_session_terminal(&self) -> bool {
		matches!(self, Self::Session(e) if *e != SessionError::RefreshSuperseded)
	}
}

/// Terminal session failures produced by the refresh coordinator.
///
/// Values are cloneable so one refresh outcome can be handed to every request that queued
/// behind it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// A refresh was required but no refresh token is stored.
	#[error("No refresh token is available.")]
	NoRefreshToken,
	/// Refresh endpoint rejected the exchange.
	#[error("Refresh endpoint rejected the exchange with status {status}: {message}.")]
	RefreshRejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
		/// Backend-supplied message.
		message: String,
	},
	/// Refresh exchange could not be completed (network failure or malformed response).
	#[error("Refresh exchange could not be completed: {message}.")]
	RefreshUnavailable {
		/// Description of the underlying failure.
		message: String,
	},
	/// The refresh attempt ceiling has been reached.
	#[error("Refresh attempts are exhausted after {ceiling} tries.")]
	RefreshCeilingExceeded {
		/// Configured attempt ceiling.
		ceiling: u32,
	},
	/// The task leading a refresh was dropped before the refresh settled.
	#[error("Refresh was abandoned before it completed.")]
	RefreshAbandoned,
	/// A new credential pair was stored while the refresh was in flight; its token was
	/// discarded and the newer pair was left untouched.
	#[error("Session changed while the refresh was in flight.")]
	RefreshSuperseded,
	/// Token store failed while refreshing.
	#[error("Token store failed during refresh: {message}.")]
	TokenStore {
		/// Store-supplied message.
		message: String,
	},
}
impl From<crate::store::StoreError> for SessionError {
	fn from(e: crate::store::StoreError) -> Self {
		Self::TokenStore { message: e.to_string() }
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
	/// A configured URL or path cannot be parsed.
	#[error("The {endpoint} URL is invalid.")]
	InvalidUrl {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL cannot carry relative paths (e.g. `mailto:`).
	#[error("Base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Endpoint does not use HTTPS and is not a loopback address.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Refresh ceiling must allow at least one attempt.
	#[error("Refresh ceiling must be greater than zero.")]
	ZeroRefreshCeiling,
	/// Check interval must be positive.
	#[error("Session check interval must be greater than zero.")]
	ZeroCheckInterval,
	/// Token cannot be encoded as an HTTP header value.
	#[error("Token contains characters that are not valid in an HTTP header.")]
	InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	InvalidBody(#[source] serde_json::Error),
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

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
