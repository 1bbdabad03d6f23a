//! Client-level error types shared across flows, transports, and stores.

// self
use crate::{_prelude::*, api::ResponseFailure, store::StoreError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Only [`Error::SessionExpired`] on a first attempt is ever recovered locally (renewal plus
/// replay); every variant here is what remains after that recovery has been tried or skipped.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration or request-construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); never triggers renewal.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded into the requested type.
	#[error("Response body (HTTP {status}) could not be decoded.")]
	Decode {
		/// Path-aware decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},

	/// Server rejected the request for a reason unrelated to the session.
	#[error("Request failed with HTTP {}: {}.", .0.status, .0.summary())]
	Api(Box<ResponseFailure>),
	/// The access credential expired again on the single permitted replay.
	#[error("Session expired again after renewal: {}.", .0.summary())]
	SessionExpired(Box<ResponseFailure>),
	/// Server rejected the access credential for a reason other than expiry.
	#[error("Session was rejected: {}.", .0.summary())]
	SessionInvalid(Box<ResponseFailure>),
	/// Session renewal failed; the session has been terminated.
	#[error("Session renewal failed: {0}")]
	RenewalFailed(#[source] RenewalError),
	/// Renewal was needed but no refresh credential is stored.
	#[error("No refresh credential is stored, so the session cannot be renewed.")]
	NoRefreshCredential,
}
impl Error {
	/// Returns `true` when the error means the local session is gone.
	///
	/// An abandoned renewal is not terminal: the session is still stored and can be renewed.
	pub fn is_session_terminal(&self) -> bool {
		match self {
			Self::RenewalFailed(RenewalError::Abandoned) => false,
			Self::SessionInvalid(_) | Self::RenewalFailed(_) | Self::NoRefreshCredential => true,
			_ => false,
		}
	}
}
impl From<RenewalError> for Error {
	fn from(e: RenewalError) -> Self {
		match e {
			RenewalError::MissingRefreshCredential => Self::NoRefreshCredential,
			other => Self::RenewalFailed(other),
		}
	}
}

/// Failure of a single renewal attempt, shared verbatim with every request waiting on it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RenewalError {
	/// No complete session (access + refresh credential) is stored.
	#[error("No refresh credential is stored.")]
	MissingRefreshCredential,
	/// Refresh endpoint refused the refresh credential.
	#[error("Refresh endpoint rejected the session (HTTP {status}): {reason}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
		/// Server-supplied reason, or the status line when none was given.
		reason: String,
	},
	/// Refresh endpoint could not be reached.
	#[error("Refresh endpoint could not be reached: {message}.")]
	Unreachable {
		/// Transport failure summary.
		message: String,
	},
	/// Refresh call did not settle within the configured bound.
	#[error("Refresh call exceeded the configured timeout.")]
	TimedOut,
	/// Refresh endpoint answered with a body that is not a renewal grant.
	#[error("Refresh endpoint returned a malformed body: {message}.")]
	Malformed {
		/// Decoding failure summary.
		message: String,
	},
	/// Refresh request could not be constructed.
	#[error("Refresh request could not be built: {message}.")]
	InvalidRequest {
		/// Construction failure summary.
		message: String,
	},
	/// Renewed session could not be persisted.
	#[error("Renewed session could not be persisted: {0}")]
	Storage(StoreError),
	/// The session was terminated or replaced while the renewal was in flight; the grant was
	/// discarded.
	#[error("Session ended while the renewal was in flight.")]
	Terminated,
	/// The renewing task was dropped before the renewal settled.
	#[error("Renewal was abandoned before it settled.")]
	Abandoned,
}
impl From<TransportError> for RenewalError {
	fn from(e: TransportError) -> Self {
		match e {
			TransportError::Timeout => Self::TimedOut,
			other => Self::Unreachable { message: other.to_string() },
		}
	}
}
impl From<ConfigError> for RenewalError {
	fn from(e: ConfigError) -> Self {
		Self::InvalidRequest { message: e.to_string() }
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Request path cannot be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodyEncode(#[from] serde_json::Error),
	/// Credential contains bytes that are not valid in a header value.
	#[error("Credential cannot be encoded as an HTTP header value.")]
	InvalidCredentialHeader(#[from] ::http::header::InvalidHeaderValue),
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

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout.
	#[error("Request timed out while calling the API.")]
	Timeout,
	/// The transport could not convert the request into its own representation.
	#[error("Request could not be prepared by the transport.")]
	Request {
		/// Transport-specific conversion error.
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
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_builder() {
			Self::Request { source: Box::new(e) }
		} else {
			Self::network(e)
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn missing_refresh_credential_maps_to_dedicated_variant() {
		let err = Error::from(RenewalError::MissingRefreshCredential);

		assert!(matches!(err, Error::NoRefreshCredential));
		assert!(err.is_session_terminal());

		let err = Error::from(RenewalError::TimedOut);

		assert!(matches!(err, Error::RenewalFailed(RenewalError::TimedOut)));
	}

	#[test]
	fn abandoned_renewal_is_not_terminal() {
		assert!(!Error::from(RenewalError::Abandoned).is_session_terminal());
		assert!(Error::from(RenewalError::Terminated).is_session_terminal());
		assert!(Error::from(RenewalError::TimedOut).is_session_terminal());
	}

	#[test]
	fn transport_timeout_becomes_renewal_timeout() {
		assert_eq!(RenewalError::from(TransportError::Timeout), RenewalError::TimedOut);

		let io = TransportError::Io(std::io::Error::other("connection reset"));

		assert!(matches!(RenewalError::from(io), RenewalError::Unreachable { .. }));
	}

	#[test]
	fn storage_error_is_exposed_as_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let err = Error::from(store_error.clone());
		let source = StdError::source(&err)
			.expect("Client error should expose the original store error as its source.");

		assert!(err.to_string().contains("disk full"));
		assert_eq!(source.to_string(), store_error.to_string());
	}
}
