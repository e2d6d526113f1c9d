//! Broker-level error types shared across the coordinator, fetch service, and configuration.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout) while talking to the upstream site.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The challenge solver could not produce credentials.
	#[error("Clearance credentials could not be acquired: {reason}.")]
	AcquisitionFailed {
		/// Solver- or broker-supplied reason string.
		reason: String,
	},
	/// The upstream site rejected the request even after a forced refresh.
	#[error("Upstream kept blocking {url} after a forced credential refresh (status {status}).")]
	UpstreamBlocked {
		/// URL that was being fetched.
		url: Url,
		/// HTTP status of the last blocked response, or `0` when the retry never ran.
		status: u16,
	},
	/// No usable credentials could be produced when they were needed.
	#[error("Clearance credentials are unavailable; retry shortly.")]
	CredentialsUnavailable,
}
impl Error {
	/// Returns `true` for failures callers should surface as "service temporarily unavailable".
	pub fn is_unavailable(&self) -> bool {
		matches!(self, Self::AcquisitionFailed { .. } | Self::CredentialsUnavailable)
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A URL could not be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Raw input that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A duration setting is zero or negative.
	#[error("The {field} setting must be a positive duration.")]
	NonPositiveDuration {
		/// Name of the offending setting.
		field: &'static str,
	},
	/// A JSON configuration document could not be parsed.
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

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while fetching the upstream page.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while fetching the upstream page.")]
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
