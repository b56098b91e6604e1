//! Token refresh coordination with singleflight guards and rotation broadcast.
//!
//! [`SessionManager::refresh_session`] guarantees at most one refresh network
//! call in flight per manager: callers that arrive while a rotation is
//! outstanding wait on the guard and adopt the stored result instead of issuing
//! their own call. The refresh endpoint is selected from the derived
//! [`SessionKind`], never from a parameter, because refresh may be triggered
//! transparently mid-request. Successful rotations are broadcast on the
//! cross-tab bus; irrecoverable failures clear every credential and broadcast a
//! logout, so `None` is the only failure signal callers see.

// self
use crate::{
	_prelude::*,
	auth::{SessionKind, SessionTokens, TokenSecret, claims},
	bus::SessionEvent,
	error::{ApiError, ConfigError},
	http::{ApiRequest, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{SessionManager, request::parse_json},
	store::{RotationOutcome, StoreScope},
};

/// Canonical schema for all three refresh endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshWire {
	access_token: String,
	refresh_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}

impl<T> SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Refreshes the current session's tokens, rotating the refresh secret.
	///
	/// Returns the new token pair, or `None` when the session is irrecoverable;
	/// this method never surfaces an error. After a `None` the credentials have
	/// been cleared and a logout has been broadcast, so callers only decide
	/// whether to navigate to the login screen.
	pub async fn refresh_session(&self) -> Option<SessionTokens> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(async move { self.refresh_inner().await }).await;

		match &result {
			Some(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			None => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn refresh_inner(&self) -> Option<SessionTokens> {
		self.refresh_metrics.record_attempt();

		let entry_generation = self.refresh_generation().load(Ordering::Acquire);
		let _singleflight = self.refresh_guard().lock().await;

		// A rotation completed while we waited on the guard; adopt its outcome
		// instead of consuming the new refresh token a second time.
		if self.refresh_generation().load(Ordering::Acquire) != entry_generation {
			let adopted = self.stored_tokens().await;

			if adopted.is_some() {
				self.refresh_metrics.record_success();
			} else {
				self.refresh_metrics.record_failure();
			}

			return adopted;
		}

		match self.rotate().await {
			Ok(Some((scope, tokens))) => {
				self.refresh_generation().fetch_add(1, Ordering::AcqRel);
				self.bus
					.publish(SessionEvent::TokenRefreshed { scope, tokens: tokens.clone() })
					.await;
				self.refresh_metrics.record_success();

				Some(tokens)
			},
			Ok(None) | Err(_) => {
				// Irrecoverable: clear credentials atomically before any caller
				// can observe a half-applied session, then tell every tab.
				self.clear_session().await;
				self.bus.publish(SessionEvent::LoggedOut).await;
				self.refresh_metrics.record_failure();

				None
			},
		}
	}

	/// Performs one refresh network call and persists the rotated pair.
	async fn rotate(&self) -> Result<Option<(StoreScope, SessionTokens)>> {
		let Some((scope, kind, refresh_token)) = self.refresh_context().await? else {
			return Ok(None);
		};
		let request = ApiRequest::post(self.descriptor.refresh_path(kind))
			.with_body(serde_json::json!({ "refreshToken": refresh_token.expose() }));
		let raw = self.send_raw(&request, None, None).await?;

		if !raw.is_success() {
			return Err(ApiError::from_response(raw.status, &raw.body).into());
		}

		let wire: RefreshWire = parse_json(&raw)?;
		let expires_at = claims::token_expiry(&wire.access_token)
			.or_else(|| {
				wire.expires_in
					.map(|seconds| OffsetDateTime::now_utc() + Duration::seconds(seconds))
			})
			.ok_or(ConfigError::MissingExpiry)?;
		let tokens = SessionTokens {
			access: TokenSecret::new(wire.access_token),
			refresh: TokenSecret::new(wire.refresh_token),
			expires_at,
		};

		match self.store.update_tokens(scope, tokens.clone()).await? {
			RotationOutcome::Updated => Ok(Some((scope, tokens))),
			// Credentials vanished mid-rotation (logout elsewhere); do not
			// resurrect them from a stale refresh response.
			RotationOutcome::Missing => Ok(None),
		}
	}

	/// Derives the refresh context from stored credentials and the cached user.
	///
	/// Tenant sessions take precedence over platform sessions, mirroring the
	/// bearer preference in request dispatch; the admin/member split follows the
	/// cached user's role list against the descriptor's admin role set.
	async fn refresh_context(
		&self,
	) -> Result<Option<(StoreScope, SessionKind, TokenSecret)>> {
		if let Some(credentials) = self.store.load(StoreScope::Tenant).await? {
			let kind = match self.store.load_user(StoreScope::Tenant).await? {
				Some(user) if user.is_admin(&self.descriptor.admin_roles) =>
					SessionKind::TenantAdmin,
				_ => SessionKind::TenantMember,
			};

			return Ok(Some((StoreScope::Tenant, kind, credentials.tokens.refresh)));
		}
		if let Some(credentials) = self.store.load(StoreScope::Platform).await? {
			return Ok(Some((
				StoreScope::Platform,
				SessionKind::Platform,
				credentials.tokens.refresh,
			)));
		}

		Ok(None)
	}

	async fn stored_tokens(&self) -> Option<SessionTokens> {
		for scope in [StoreScope::Tenant, StoreScope::Platform] {
			if let Ok(Some(credentials)) = self.store.load(scope).await {
				return Some(credentials.tokens);
			}
		}

		None
	}

	/// Terminates the session: best-effort backend logout, local credential
	/// wipe, and a cross-tab logout broadcast.
	///
	/// The backend call is advisory; navigation must win, so its outcome is
	/// ignored and the local wipe always happens.
	pub async fn logout(&self) {
		if let Some(path) = self.descriptor.endpoints.logout.clone() {
			let _ = self.send_authenticated(&ApiRequest::post(path), None).await;
		}

		self.clear_session().await;
		self.bus.publish(SessionEvent::LoggedOut).await;
	}

	pub(crate) async fn clear_session(&self) {
		let _ = self.store.clear_all().await;

		self.invalidate_access();
	}
}
