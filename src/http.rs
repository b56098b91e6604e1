//! Transport primitives for authenticated backend calls.
//!
//! The module exposes [`HttpTransport`] as the crate's only dependency on an HTTP
//! stack. The session manager prepares full requests (URL, headers, body) and the
//! transport executes them, reporting HTTP responses of any status as `Ok` and
//! reserving `Err` for transport-level failures where no response exists at all
//! (the "status 0" class surfaced to callers as [`TransportError`]).

// self
use crate::{_prelude::*, error::TransportError};

/// HTTP methods used by the backend surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl HttpMethod {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Patch => "PATCH",
			HttpMethod::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Logical API request addressed by endpoint path, before URL/auth resolution.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Endpoint path relative to the descriptor base (must start with `/`).
	pub path: String,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
	/// Extra headers beyond the auth headers the manager attaches.
	pub headers: Vec<(String, String)>,
}
impl ApiRequest {
	/// Creates a request with the provided method and path.
	pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None, headers: Vec::new() }
	}

	/// Creates a GET request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, path)
	}

	/// Creates a POST request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Post, path)
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Appends an extra header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Fully resolved request handed to the transport.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Absolute request URL.
	pub url: Url,
	/// Complete header list, auth headers included.
	pub headers: Vec<(String, String)>,
	/// Serialized JSON body, if any.
	pub body: Option<Vec<u8>>,
}

/// Raw HTTP response captured by the transport.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports executing prepared backend requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be
/// shared by every session manager clone in the process. An HTTP response of any
/// status is `Ok`; `Err` is reserved for failures where the backend never
/// produced a response.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a prepared request and captures the raw response.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
				HttpMethod::Put => reqwest::Method::PUT,
				HttpMethod::Patch => reqwest::Method::PATCH,
				HttpMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.header("content-type", "application/json").body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(RawResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_builders_compose() {
		let request = ApiRequest::post("/api/v1/auth/refresh")
			.with_body(serde_json::json!({"refreshToken": "r1"}))
			.with_query("tenant", "acme")
			.with_header("x-trace-id", "t-1");

		assert_eq!(request.method, HttpMethod::Post);
		assert_eq!(request.path, "/api/v1/auth/refresh");
		assert_eq!(request.query, vec![("tenant".to_string(), "acme".to_string())]);
		assert_eq!(request.headers.len(), 1);
		assert!(request.body.is_some());
	}

	#[test]
	fn success_covers_the_2xx_range() {
		assert!(RawResponse { status: 200, body: Vec::new() }.is_success());
		assert!(RawResponse { status: 204, body: Vec::new() }.is_success());
		assert!(!RawResponse { status: 301, body: Vec::new() }.is_success());
		assert!(!RawResponse { status: 401, body: Vec::new() }.is_success());
	}
}
