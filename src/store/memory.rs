//! Thread-safe in-memory [`CredentialStore`] implementation for tests and non-browser ports.

// self
use crate::{
	_prelude::*,
	auth::{AuthUser, Credentials, SessionTokens},
	store::{CredentialStore, RotationOutcome, StoreFuture, StoreScope},
};

#[derive(Debug, Default)]
struct Slots {
	credentials: HashMap<StoreScope, Credentials>,
	users: HashMap<StoreScope, AuthUser>,
}

type SharedSlots = Arc<RwLock<Slots>>;

/// Thread-safe storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore(SharedSlots);
impl MemoryCredentialStore {
	fn update_tokens_now(
		slots: SharedSlots,
		scope: StoreScope,
		tokens: SessionTokens,
	) -> RotationOutcome {
		let mut guard = slots.write();

		match guard.credentials.get_mut(&scope) {
			Some(credentials) => {
				credentials.tokens = tokens;

				RotationOutcome::Updated
			},
			None => RotationOutcome::Missing,
		}
	}
}
impl CredentialStore for MemoryCredentialStore {
	fn save(&self, scope: StoreScope, credentials: Credentials) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().credentials.insert(scope, credentials);

			Ok(())
		})
	}

	fn load(&self, scope: StoreScope) -> StoreFuture<'_, Option<Credentials>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().credentials.get(&scope).cloned()) })
	}

	fn update_tokens(
		&self,
		scope: StoreScope,
		tokens: SessionTokens,
	) -> StoreFuture<'_, RotationOutcome> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(Self::update_tokens_now(slots, scope, tokens)) })
	}

	fn save_user(&self, scope: StoreScope, user: AuthUser) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			slots.write().users.insert(scope, user);

			Ok(())
		})
	}

	fn load_user(&self, scope: StoreScope) -> StoreFuture<'_, Option<AuthUser>> {
		let slots = self.0.clone();

		Box::pin(async move { Ok(slots.read().users.get(&scope).cloned()) })
	}

	fn clear(&self, scope: StoreScope) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			let mut guard = slots.write();

			guard.credentials.remove(&scope);
			guard.users.remove(&scope);

			Ok(())
		})
	}

	fn clear_all(&self) -> StoreFuture<'_, ()> {
		let slots = self.0.clone();

		Box::pin(async move {
			let mut guard = slots.write();

			guard.credentials.clear();
			guard.users.clear();

			Ok(())
		})
	}
}
