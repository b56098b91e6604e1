//! Session-core error types shared across the HTTP, refresh, and access layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical session-core error exposed by public APIs.
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
	/// Transport failure (DNS, TCP, TLS); the backend produced no HTTP response.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Typed HTTP error envelope returned by the backend.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// Backend response did not match the endpoint's canonical schema.
	#[error("Backend returned a response that does not match the expected schema.")]
	ResponseParse {
		/// Structured parsing failure with the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the malformed response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status associated with this error.
	///
	/// Transport failures report `0`, matching the "no HTTP response" convention
	/// consumed by the UI layers embedding this crate.
	pub fn status(&self) -> u16 {
		match self {
			Self::Api(api) => api.status,
			Self::ResponseParse { status, .. } => *status,
			Self::Transport(_) | Self::Storage(_) | Self::Config(_) => 0,
		}
	}
}

/// Configuration and validation failures raised while building requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint path could not be joined onto the backend base URL.
	#[error("Endpoint path `{path}` is not valid against the backend base URL.")]
	InvalidEndpoint {
		/// Path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
	/// Refresh response carried no usable expiry information.
	#[error("Refresh response carried neither a decodable exp claim nor expiresIn.")]
	MissingExpiry,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO); these map to status `0`.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
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
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Typed error envelope extracted from backend HTTP error responses.
#[derive(Clone, Debug, Serialize, Deserialize, ThisError)]
#[error("Backend returned {status}: {message}.")]
pub struct ApiError {
	/// Human-readable message from the error body, or a status-derived fallback.
	pub message: String,
	/// HTTP status code of the error response.
	pub status: u16,
	/// Optional structured payload carried alongside the error.
	pub data: Option<serde_json::Value>,
}
impl ApiError {
	/// Extracts the canonical `{message, status, data}` envelope from an error body.
	///
	/// Backends occasionally return plain text or empty bodies for errors, so the
	/// envelope parse is lenient: a mismatch falls back to a status-derived message
	/// instead of failing the caller twice.
	pub fn from_response(status: u16, body: &[u8]) -> Self {
		#[derive(Deserialize)]
		struct Envelope {
			message: Option<String>,
			status: Option<u16>,
			data: Option<serde_json::Value>,
		}

		match serde_json::from_slice::<Envelope>(body) {
			Ok(envelope) => Self {
				message: envelope
					.message
					.unwrap_or_else(|| format!("Request failed with status {status}")),
				status: envelope.status.unwrap_or(status),
				data: envelope.data,
			},
			Err(_) =>
				Self { message: format!("Request failed with status {status}"), status, data: None },
		}
	}

	/// Returns `true` for HTTP 401.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Returns `true` for HTTP 403.
	pub fn is_forbidden(&self) -> bool {
		self.status == 403
	}

	/// Whether this error should trigger the refresh-and-retry protocol.
	///
	/// 401 always qualifies; 403 only when the backend is known to return it for
	/// expired tokens (`forbidden_triggers_refresh` on the descriptor).
	pub fn triggers_refresh(&self, forbidden_triggers_refresh: bool) -> bool {
		self.is_unauthorized() || (forbidden_triggers_refresh && self.is_forbidden())
	}
}
