//! Authenticated request dispatch with the 401/403 recovery protocol.
//!
//! Every request resolves the endpoint URL from the descriptor, attaches
//! `Authorization: Bearer <token>` (tenant credentials preferred over platform)
//! and `X-Tenant-Code` when a tenant context is stored, then executes via the
//! transport. A 401 (or 403, per descriptor policy) on a non-refresh path defers
//! to the refresh coordinator and retries the original request exactly once with
//! the rotated token; transport failures (status 0) are never retried.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ApiError, ConfigError},
	http::{ApiRequest, HttpTransport, PreparedRequest, RawResponse},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionManager,
	store::StoreScope,
};

impl<T> SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Issues an authenticated request and parses the canonical response schema.
	pub async fn request<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(async move { self.request_inner(request).await }).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Issues a request without credentials, e.g. the liveness probe.
	pub async fn request_unauthenticated<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let raw = self.send_raw(&request, None, None).await?;

		if raw.is_success() {
			parse_json(&raw)
		} else {
			Err(ApiError::from_response(raw.status, &raw.body).into())
		}
	}

	async fn request_inner<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let raw = self.send_authenticated(&request, None).await?;

		if raw.is_success() {
			return parse_json(&raw);
		}

		let error = ApiError::from_response(raw.status, &raw.body);

		if error.triggers_refresh(self.descriptor.forbidden_triggers_refresh)
			&& !self.descriptor.is_refresh_path(&request.path)
		{
			if let Some(tokens) = self.refresh_session().await {
				let retry = self.send_authenticated(&request, Some(&tokens.access)).await?;

				if retry.is_success() {
					return parse_json(&retry);
				}

				return Err(ApiError::from_response(retry.status, &retry.body).into());
			}
		}

		Err(error.into())
	}

	/// Sends a request with stored credentials attached.
	///
	/// `bearer_override` carries the freshly rotated access token on the single
	/// retry so the new `Authorization` header is used even if storage lags.
	pub(crate) async fn send_authenticated(
		&self,
		request: &ApiRequest,
		bearer_override: Option<&TokenSecret>,
	) -> Result<RawResponse> {
		let credentials = match self.store.load(StoreScope::Tenant).await? {
			Some(credentials) => Some(credentials),
			None => self.store.load(StoreScope::Platform).await?,
		};
		let bearer = bearer_override
			.map(|token| token.expose().to_owned())
			.or_else(|| credentials.as_ref().map(|c| c.tokens.access.expose().to_owned()));
		let tenant_code = credentials
			.as_ref()
			.and_then(|c| c.tenant.as_ref())
			.map(|context| context.code.to_string());

		self.send_raw(request, bearer.as_deref(), tenant_code.as_deref()).await
	}

	pub(crate) async fn send_raw(
		&self,
		request: &ApiRequest,
		bearer: Option<&str>,
		tenant_code: Option<&str>,
	) -> Result<RawResponse> {
		let mut url = self.descriptor.url_for(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut()
				.extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		let mut headers = request.headers.clone();

		if let Some(bearer) = bearer {
			headers.push(("authorization".into(), format!("Bearer {bearer}")));
		}
		if let Some(code) = tenant_code {
			headers.push(("x-tenant-code".into(), code.to_owned()));
		}

		let body = request
			.body
			.as_ref()
			.map(serde_json::to_vec)
			.transpose()
			.map_err(ConfigError::BodySerialize)?;
		let prepared = PreparedRequest { method: request.method, url, headers, body };

		Ok(self.transport.execute(prepared).await?)
	}
}

/// Parses a response body against the endpoint's canonical schema.
pub(crate) fn parse_json<R>(raw: &RawResponse) -> Result<R>
where
	R: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(&raw.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::ResponseParse { source, status: raw.status })
}
