//! Menu/permission access resolution with TTL caching and degradation.
//!
//! [`SessionManager::access`] resolves the `{menu, permissions, roles}` triple
//! for the current user, serving a tab-scoped cache owned by that user when it
//! is younger than the descriptor TTL. Overlapping callers share one outstanding
//! fetch via a singleflight guard with a post-acquisition cache recheck. A fetch
//! superseded by a user switch is discarded rather than cached, then re-resolved
//! for the new owner, so a stale response can never overwrite another user's
//! state.

// self
use crate::{
	_prelude::*,
	access::{
		AccessCacheEntry, AccessOutcome, AccessSnapshot, CurrentAccessWire, GrantedMenuWire,
		HealthWire, MenuCatalogItemWire, MenuGroupWire, join_catalog, minimal_snapshot,
		normalize_groups,
	},
	auth::{AuthUser, UserId},
	http::{ApiRequest, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionManager,
	store::StoreScope,
};

impl<T> SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Resolves the current user's accessible menu, permissions, and roles.
	///
	/// `force_refresh` bypasses the cache but still participates in request
	/// deduplication. See [`AccessOutcome`] for the non-error terminal states;
	/// `Err` is reserved for storage failures and malformed backend responses.
	pub async fn access(&self, force_refresh: bool) -> Result<AccessOutcome> {
		const KIND: FlowKind = FlowKind::Access;

		let span = FlowSpan::new(KIND, "access");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(async move { self.access_inner(force_refresh).await }).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Drops the cached access snapshot, forcing the next call to refetch.
	pub fn invalidate_access(&self) {
		*self.access_cache().lock() = None;
	}

	async fn access_inner(&self, force_refresh: bool) -> Result<AccessOutcome> {
		self.access_metrics.record_attempt();

		let result = self.resolve_access(force_refresh).await;

		match &result {
			Ok(_) => self.access_metrics.record_success(),
			Err(_) => self.access_metrics.record_failure(),
		}

		result
	}

	async fn resolve_access(&self, force_refresh: bool) -> Result<AccessOutcome> {
		loop {
			let Some(user) = self.current_user().await? else {
				self.invalidate_access();

				return Ok(AccessOutcome::Unauthenticated);
			};

			// A user switch invalidates any previous owner's cache outright.
			{
				let mut cache = self.access_cache().lock();

				if cache.as_ref().is_some_and(|entry| entry.user != user.id) {
					*cache = None;
				}
			}

			if !force_refresh
				&& let Some(snapshot) = self.cached_snapshot(&user.id)
			{
				return Ok(AccessOutcome::Granted(snapshot));
			}

			let _singleflight = self.access_guard().lock().await;

			// Another waiter may have resolved the same user while we queued.
			if !force_refresh
				&& let Some(snapshot) = self.cached_snapshot(&user.id)
			{
				return Ok(AccessOutcome::Granted(snapshot));
			}

			match self.fetch_access(&user).await {
				Ok(snapshot) => match self.current_user().await? {
					Some(current) if current.id == user.id => {
						*self.access_cache().lock() = Some(AccessCacheEntry {
							user: user.id.clone(),
							fetched_at: OffsetDateTime::now_utc(),
							snapshot: snapshot.clone(),
						});

						return Ok(AccessOutcome::Granted(snapshot));
					},
					// Superseded mid-fetch; discard and resolve for the new user.
					Some(_) => continue,
					None => {
						self.invalidate_access();

						return Ok(AccessOutcome::Unauthenticated);
					},
				},
				Err(Error::Api(error)) if error.is_unauthorized() => {
					self.invalidate_access();

					return Ok(AccessOutcome::Unauthenticated);
				},
				Err(Error::Api(error)) if error.is_forbidden() =>
					return Ok(AccessOutcome::Denied),
				Err(Error::Storage(error)) => return Err(error.into()),
				Err(_) =>
					return if self.backend_alive().await {
						// Backend is up; the failure is call-specific (typically
						// subscription/billing), so degrade instead of blocking.
						Ok(AccessOutcome::SubscriptionLimited(minimal_snapshot(user.billing)))
					} else {
						// Backend unreachable: the session cannot be trusted.
						self.logout().await;

						Ok(AccessOutcome::SessionRevoked)
					},
			}
		}
	}

	/// Fetches a fresh snapshot along the admin or member authorization path.
	async fn fetch_access(&self, user: &AuthUser) -> Result<AccessSnapshot> {
		let access: CurrentAccessWire =
			self.request(ApiRequest::get(&self.descriptor.endpoints.current_access)).await?;
		let menu = if user.is_admin(&self.descriptor.admin_roles) {
			let groups: Vec<MenuGroupWire> =
				self.request(ApiRequest::get(&self.descriptor.endpoints.menu_tree)).await?;

			normalize_groups(groups)
		} else if let Some(role_id) = user.role_id {
			let groups: Vec<MenuGroupWire> =
				self.request(ApiRequest::get(self.descriptor.role_menu_path(role_id.0))).await?;

			normalize_groups(groups)
		} else {
			// Legacy fallback for members predating role identifiers.
			let granted: GrantedMenuWire = self
				.request(ApiRequest::get(self.descriptor.user_role_menu_path(&user.id)))
				.await?;
			let catalog: Vec<MenuCatalogItemWire> =
				self.request(ApiRequest::get(&self.descriptor.endpoints.menu_catalog)).await?;

			join_catalog(catalog, &granted.item_codes)
		};

		Ok(AccessSnapshot { menu, permissions: access.permissions, roles: access.roles })
	}

	fn cached_snapshot(&self, user: &UserId) -> Option<AccessSnapshot> {
		let cache = self.access_cache().lock();
		let entry = cache.as_ref()?;

		entry
			.is_fresh(user, OffsetDateTime::now_utc(), self.descriptor.access_ttl)
			.then(|| entry.snapshot.clone())
	}

	async fn current_user(&self) -> Result<Option<AuthUser>> {
		if let Some(user) = self.store.load_user(StoreScope::Tenant).await? {
			return Ok(Some(user));
		}

		Ok(self.store.load_user(StoreScope::Platform).await?)
	}

	async fn backend_alive(&self) -> bool {
		let request = ApiRequest::get(&self.descriptor.endpoints.health);

		match self.request_unauthenticated::<HealthWire>(request).await {
			Ok(health) => health.is_healthy(),
			Err(_) => false,
		}
	}
}
