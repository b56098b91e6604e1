//! Storage contracts and built-in store implementations for session credentials.
//!
//! Credential mutation flows only through the session manager (`begin_session`,
//! `refresh_session`, `logout`) or the cross-tab mirror; stores never mutate
//! themselves. A browser adapter maps each [`StoreScope`] onto the persisted key
//! names (access token, refresh token, user record JSON, tenant code, tenant
//! schema), while [`MemoryCredentialStore`] serves tests and non-browser ports.

pub mod memory;

pub use memory::MemoryCredentialStore;

// self
use crate::{
	_prelude::*,
	auth::{AuthUser, Credentials, SessionTokens},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Role-context partition for persisted credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreScope {
	/// Platform-admin session credentials.
	Platform,
	/// Tenant session credentials (admin or member).
	Tenant,
}
impl StoreScope {
	/// Returns a stable label suitable for storage keys and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreScope::Platform => "platform",
			StoreScope::Tenant => "tenant",
		}
	}
}
impl Display for StoreScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Result of merging rotated tokens into stored credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationOutcome {
	/// Credentials existed and both tokens were replaced.
	Updated,
	/// No credentials were stored for the scope; nothing was written.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend (e.g., localStorage JSON).
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Persistence contract for session credentials and cached user records.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the credentials for a scope.
	fn save(&self, scope: StoreScope, credentials: Credentials) -> StoreFuture<'_, ()>;

	/// Fetches the credentials stored for a scope, if present.
	fn load(&self, scope: StoreScope) -> StoreFuture<'_, Option<Credentials>>;

	/// Merges a rotated token pair into the stored credentials for a scope.
	///
	/// Tenant context is preserved; only the token fields change. Returns
	/// [`RotationOutcome::Missing`] without writing when no credentials exist.
	fn update_tokens(&self, scope: StoreScope, tokens: SessionTokens)
	-> StoreFuture<'_, RotationOutcome>;

	/// Persists or replaces the cached user record for a scope.
	fn save_user(&self, scope: StoreScope, user: AuthUser) -> StoreFuture<'_, ()>;

	/// Fetches the cached user record for a scope, if present.
	fn load_user(&self, scope: StoreScope) -> StoreFuture<'_, Option<AuthUser>>;

	/// Removes the credentials and user record for a scope.
	fn clear(&self, scope: StoreScope) -> StoreFuture<'_, ()>;

	/// Removes every credential and user record across all scopes.
	fn clear_all(&self) -> StoreFuture<'_, ()>;
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_session_error_with_source() {
		let store_error = StoreError::Backend { message: "storage unavailable".into() };
		let session_error: Error = store_error.clone().into();

		assert!(matches!(session_error, Error::Storage(_)));
		assert!(session_error.to_string().contains("storage unavailable"));

		let source = StdError::source(&session_error)
			.expect("Session error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn rotation_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&RotationOutcome::Updated)
			.expect("RotationOutcome should serialize to JSON.");

		assert_eq!(payload, "\"Updated\"");

		let round_trip: RotationOutcome = serde_json::from_str(&payload)
			.expect("Serialized outcome should deserialize from JSON.");

		assert_eq!(round_trip, RotationOutcome::Updated);
	}

	#[test]
	fn scope_labels_are_stable() {
		assert_eq!(StoreScope::Platform.to_string(), "platform");
		assert_eq!(StoreScope::Tenant.to_string(), "tenant");
	}
}
