//! Backend descriptor describing the REST surface the session core talks to.
//!
//! The descriptor is validated at build time so request dispatch never has to
//! guess endpoint shapes: refresh endpoints per session context, the menu and
//! permission endpoints for both authorization paths, the liveness endpoint used
//! during degradation, and the policy knobs (admin role set, 403 handling,
//! access cache TTL).

// self
use crate::{_prelude::*, auth::SessionKind, error::ConfigError};

const DEFAULT_PLATFORM_REFRESH: &str = "/api/v1/platform/auth/refresh";
const DEFAULT_ADMIN_REFRESH: &str = "/api/v1/auth/refresh";
const DEFAULT_MEMBER_REFRESH: &str = "/api/v1/members/auth/refresh";
const DEFAULT_CURRENT_ACCESS: &str = "/api/v1/auth/access";
const DEFAULT_MENU_TREE: &str = "/api/v1/menus";
const DEFAULT_ROLE_MENU_PREFIX: &str = "/api/v1/roles";
const DEFAULT_USER_ROLE_MENU_PREFIX: &str = "/api/v1/users";
const DEFAULT_MENU_CATALOG: &str = "/api/v1/menu-items";
const DEFAULT_HEALTH: &str = "/health";
const DEFAULT_ACCESS_TTL: Duration = Duration::minutes(15);

/// Errors raised while constructing or validating a backend descriptor.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum BackendDescriptorError {
	/// Endpoint paths must be absolute (start with `/`).
	#[error("The {endpoint} path must start with `/`: {path}.")]
	RelativePath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// The admin role set cannot be empty; the member path would be unreachable.
	#[error("At least one admin role code is required.")]
	NoAdminRoles,
	/// The access cache TTL must be positive.
	#[error("Access cache TTL must be positive.")]
	NonPositiveAccessTtl,
}

/// Endpoint paths declared by a backend descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoints {
	/// Platform-admin token refresh.
	pub platform_refresh: String,
	/// Tenant-admin token refresh.
	pub admin_refresh: String,
	/// Tenant-member token refresh.
	pub member_refresh: String,
	/// Current user's permission + role set.
	pub current_access: String,
	/// Complete system menu tree (admin path).
	pub menu_tree: String,
	/// Prefix for role-scoped menu access; `{prefix}/{role_id}/menus`.
	pub role_menu_prefix: String,
	/// Prefix for the legacy per-user role-menu lookup; `{prefix}/{user_id}/role-menus`.
	pub user_role_menu_prefix: String,
	/// Flat menu-item catalog joined against the legacy lookup.
	pub menu_catalog: String,
	/// Liveness probe distinguishing "backend down" from "call failed".
	pub health: String,
	/// Optional best-effort logout endpoint.
	pub logout: Option<String>,
}

/// Immutable backend descriptor consumed by the session manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
	/// Base URL all endpoint paths are joined onto.
	pub base: Url,
	/// Endpoint path set.
	pub endpoints: BackendEndpoints,
	/// Role codes that select the admin (full-access) authorization path.
	pub admin_roles: Vec<String>,
	/// Whether HTTP 403 triggers the refresh-and-retry protocol like 401.
	///
	/// Some backends return 403 for expired tokens, others only for genuine
	/// denials; this makes the policy explicit instead of guessed per call.
	pub forbidden_triggers_refresh: bool,
	/// Maximum age before a cached access snapshot is treated as stale.
	pub access_ttl: Duration,
}
impl BackendDescriptor {
	/// Creates a new builder seeded with the provided base URL.
	pub fn builder(base: Url) -> BackendDescriptorBuilder {
		BackendDescriptorBuilder::new(base)
	}

	/// Joins an endpoint path (plus optional query pairs) onto the base URL.
	pub fn url_for(&self, path: &str) -> Result<Url, ConfigError> {
		self.base
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })
	}

	/// Returns the refresh endpoint path for the derived session kind.
	pub fn refresh_path(&self, kind: SessionKind) -> &str {
		match kind {
			SessionKind::Platform => &self.endpoints.platform_refresh,
			SessionKind::TenantAdmin => &self.endpoints.admin_refresh,
			SessionKind::TenantMember => &self.endpoints.member_refresh,
		}
	}

	/// Whether the path targets one of the refresh endpoints.
	///
	/// Refresh endpoints must never recurse into the refresh-and-retry protocol.
	pub fn is_refresh_path(&self, path: &str) -> bool {
		path == self.endpoints.platform_refresh
			|| path == self.endpoints.admin_refresh
			|| path == self.endpoints.member_refresh
	}

	/// Builds the role-scoped menu access path for a role identifier.
	pub fn role_menu_path(&self, role_id: u64) -> String {
		format!("{}/{role_id}/menus", self.endpoints.role_menu_prefix)
	}

	/// Builds the legacy per-user role-menu lookup path.
	pub fn user_role_menu_path(&self, user_id: &str) -> String {
		format!("{}/{user_id}/role-menus", self.endpoints.user_role_menu_prefix)
	}
}

/// Builder for [`BackendDescriptor`] values.
#[derive(Debug)]
pub struct BackendDescriptorBuilder {
	/// Base URL all endpoint paths are joined onto.
	pub base: Url,
	/// Endpoint path set, pre-seeded with conventional defaults.
	pub endpoints: BackendEndpoints,
	/// Role codes selecting the admin authorization path.
	pub admin_roles: Vec<String>,
	/// 403 refresh policy; defaults to treating 403 like 401.
	pub forbidden_triggers_refresh: bool,
	/// Access cache TTL; defaults to 15 minutes.
	pub access_ttl: Duration,
}
impl BackendDescriptorBuilder {
	/// Creates a new builder seeded with conventional endpoint defaults.
	pub fn new(base: Url) -> Self {
		Self {
			base,
			endpoints: BackendEndpoints {
				platform_refresh: DEFAULT_PLATFORM_REFRESH.into(),
				admin_refresh: DEFAULT_ADMIN_REFRESH.into(),
				member_refresh: DEFAULT_MEMBER_REFRESH.into(),
				current_access: DEFAULT_CURRENT_ACCESS.into(),
				menu_tree: DEFAULT_MENU_TREE.into(),
				role_menu_prefix: DEFAULT_ROLE_MENU_PREFIX.into(),
				user_role_menu_prefix: DEFAULT_USER_ROLE_MENU_PREFIX.into(),
				menu_catalog: DEFAULT_MENU_CATALOG.into(),
				health: DEFAULT_HEALTH.into(),
				logout: None,
			},
			admin_roles: vec!["admin".into(), "owner".into()],
			forbidden_triggers_refresh: true,
			access_ttl: DEFAULT_ACCESS_TTL,
		}
	}

	/// Overrides the platform refresh path.
	pub fn platform_refresh(mut self, path: impl Into<String>) -> Self {
		self.endpoints.platform_refresh = path.into();

		self
	}

	/// Overrides the tenant-admin refresh path.
	pub fn admin_refresh(mut self, path: impl Into<String>) -> Self {
		self.endpoints.admin_refresh = path.into();

		self
	}

	/// Overrides the tenant-member refresh path.
	pub fn member_refresh(mut self, path: impl Into<String>) -> Self {
		self.endpoints.member_refresh = path.into();

		self
	}

	/// Overrides the current-access path.
	pub fn current_access(mut self, path: impl Into<String>) -> Self {
		self.endpoints.current_access = path.into();

		self
	}

	/// Overrides the full menu tree path.
	pub fn menu_tree(mut self, path: impl Into<String>) -> Self {
		self.endpoints.menu_tree = path.into();

		self
	}

	/// Overrides the role-scoped menu access prefix.
	pub fn role_menu_prefix(mut self, path: impl Into<String>) -> Self {
		self.endpoints.role_menu_prefix = path.into();

		self
	}

	/// Overrides the legacy per-user role-menu prefix.
	pub fn user_role_menu_prefix(mut self, path: impl Into<String>) -> Self {
		self.endpoints.user_role_menu_prefix = path.into();

		self
	}

	/// Overrides the menu catalog path.
	pub fn menu_catalog(mut self, path: impl Into<String>) -> Self {
		self.endpoints.menu_catalog = path.into();

		self
	}

	/// Overrides the liveness probe path.
	pub fn health(mut self, path: impl Into<String>) -> Self {
		self.endpoints.health = path.into();

		self
	}

	/// Sets the optional best-effort logout path.
	pub fn logout(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = Some(path.into());

		self
	}

	/// Replaces the admin role code set.
	pub fn admin_roles<I, S>(mut self, roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.admin_roles = roles.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the 403 refresh policy.
	pub fn forbidden_triggers_refresh(mut self, enabled: bool) -> Self {
		self.forbidden_triggers_refresh = enabled;

		self
	}

	/// Overrides the access cache TTL.
	pub fn access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl = ttl;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<BackendDescriptor, BackendDescriptorError> {
		let endpoints = &self.endpoints;
		let paths: [(&'static str, &str); 9] = [
			("platform_refresh", &endpoints.platform_refresh),
			("admin_refresh", &endpoints.admin_refresh),
			("member_refresh", &endpoints.member_refresh),
			("current_access", &endpoints.current_access),
			("menu_tree", &endpoints.menu_tree),
			("role_menu_prefix", &endpoints.role_menu_prefix),
			("user_role_menu_prefix", &endpoints.user_role_menu_prefix),
			("menu_catalog", &endpoints.menu_catalog),
			("health", &endpoints.health),
		];

		for (endpoint, path) in paths {
			validate_path(endpoint, path)?;
		}
		if let Some(logout) = endpoints.logout.as_deref() {
			validate_path("logout", logout)?;
		}
		if self.admin_roles.is_empty() {
			return Err(BackendDescriptorError::NoAdminRoles);
		}
		if !self.access_ttl.is_positive() {
			return Err(BackendDescriptorError::NonPositiveAccessTtl);
		}

		Ok(BackendDescriptor {
			base: self.base,
			endpoints: self.endpoints,
			admin_roles: self.admin_roles,
			forbidden_triggers_refresh: self.forbidden_triggers_refresh,
			access_ttl: self.access_ttl,
		})
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), BackendDescriptorError> {
	if !path.starts_with('/') {
		return Err(BackendDescriptorError::RelativePath { endpoint, path: path.to_owned() });
	}

	Ok(())
}
