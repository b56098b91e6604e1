//! Session credential records and rotation-aware token pairs.

// self
use crate::{
	_prelude::*,
	auth::{TenantCode, secret::TokenSecret},
};

/// Current access/refresh token pair plus the derived expiry instant.
///
/// A refresh rotates both secrets; the previous refresh token must never be
/// reused after a rotation succeeds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
	/// Short-lived bearer token attached to every authenticated request.
	pub access: TokenSecret,
	/// Longer-lived rotating refresh token.
	pub refresh: TokenSecret,
	/// Expiry instant derived from the access token's `exp` claim.
	pub expires_at: OffsetDateTime,
}
impl SessionTokens {
	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Convenience helper checking expiry against the current UTC instant.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for SessionTokens {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTokens")
			.field("access", &"<redacted>")
			.field("refresh", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Tenant context attached to tenant-scoped credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
	/// Tenant code sent as the `X-Tenant-Code` header.
	pub code: TenantCode,
	/// Tenant schema identifier used by the backend's data layer.
	pub schema: String,
}

/// Full credential record persisted per store scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Current token pair.
	pub tokens: SessionTokens,
	/// Tenant context; `None` for platform-scoped credentials.
	pub tenant: Option<TenantContext>,
}
impl Credentials {
	/// Creates platform-scoped credentials without a tenant context.
	pub fn platform(tokens: SessionTokens) -> Self {
		Self { tokens, tenant: None }
	}

	/// Creates tenant-scoped credentials.
	pub fn tenant(tokens: SessionTokens, context: TenantContext) -> Self {
		Self { tokens, tenant: Some(context) }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_check_uses_provided_instant() {
		let tokens = SessionTokens {
			access: TokenSecret::new("access"),
			refresh: TokenSecret::new("refresh"),
			expires_at: macros::datetime!(2025-01-01 00:30 UTC),
		};

		assert!(!tokens.is_expired_at(macros::datetime!(2025-01-01 00:29 UTC)));
		assert!(tokens.is_expired_at(macros::datetime!(2025-01-01 00:30 UTC)));
	}

	#[test]
	fn debug_redacts_token_material() {
		let tokens = SessionTokens {
			access: TokenSecret::new("access-secret"),
			refresh: TokenSecret::new("refresh-secret"),
			expires_at: macros::datetime!(2025-01-01 00:30 UTC),
		};
		let printed = format!("{tokens:?}");

		assert!(!printed.contains("access-secret"));
		assert!(!printed.contains("refresh-secret"));
	}
}
