//! Cross-tab session synchronization port and the in-process bus implementation.
//!
//! Browser deployments back [`SessionBus`] with a `BroadcastChannel`; [`LocalBus`]
//! provides the same contract in-process for tests, SSR, and desktop ports. The
//! protocol carries exactly two event kinds: token rotations and logouts. No
//! ordering guarantee is required across tabs beyond last-write-wins on token
//! fields, because rotations are serialized by the coordinator's singleflight
//! guard; within a bus, subscribers observe events in delivery order.

// self
use crate::{
	_prelude::*,
	auth::SessionTokens,
	store::{CredentialStore, StoreScope},
};

/// Boxed future returned by bus publication and subscriber handlers.
pub type BusFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Session events broadcast to every tab of the same origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// A refresh rotated the tokens for a scope; receivers adopt them without a
	/// network round-trip.
	TokenRefreshed {
		/// Scope whose credentials rotated.
		scope: StoreScope,
		/// Newly rotated token pair.
		tokens: SessionTokens,
	},
	/// A tab terminated the session; receivers clear credentials and navigate to
	/// the login screen.
	LoggedOut,
}

/// Receiver side of the session bus.
pub trait SessionSubscriber
where
	Self: Send + Sync,
{
	/// Handles a delivered session event.
	fn on_session_event(&self, event: SessionEvent) -> BusFuture<'_>;
}

/// Publish/subscribe port propagating session events between tabs.
pub trait SessionBus
where
	Self: Send + Sync,
{
	/// Delivers an event to every subscriber.
	fn publish(&self, event: SessionEvent) -> BusFuture<'_>;

	/// Registers a subscriber for all future events.
	fn subscribe(&self, subscriber: Arc<dyn SessionSubscriber>);
}

/// In-process [`SessionBus`] delivering events to subscribers in registration order.
#[derive(Clone, Default)]
pub struct LocalBus(Arc<RwLock<Vec<Arc<dyn SessionSubscriber>>>>);
impl LocalBus {
	/// Returns the number of registered subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.0.read().len()
	}
}
impl SessionBus for LocalBus {
	fn publish(&self, event: SessionEvent) -> BusFuture<'_> {
		let subscribers = self.0.read().clone();

		Box::pin(async move {
			for subscriber in subscribers {
				subscriber.on_session_event(event.clone()).await;
			}
		})
	}

	fn subscribe(&self, subscriber: Arc<dyn SessionSubscriber>) {
		self.0.write().push(subscriber);
	}
}
impl Debug for LocalBus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LocalBus").field("subscribers", &self.subscriber_count()).finish()
	}
}

/// Subscriber that mirrors broadcast session events into a tab's local store.
///
/// On [`SessionEvent::TokenRefreshed`] the rotated tokens are written into the
/// owned store with no network call; on [`SessionEvent::LoggedOut`] the store is
/// cleared and a logout flag is raised for the embedding UI to poll and force
/// navigation to the login screen. Store failures are swallowed: mirroring is
/// best-effort and must never break delivery to later subscribers.
pub struct SessionMirror {
	store: Arc<dyn CredentialStore>,
	logout_observed: AtomicBool,
}
impl SessionMirror {
	/// Creates a mirror writing into the provided store.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store, logout_observed: AtomicBool::new(false) }
	}

	/// Returns `true` once a logout event has been observed.
	pub fn logout_observed(&self) -> bool {
		self.logout_observed.load(Ordering::Relaxed)
	}

	/// Clears the logout flag, e.g. after navigating to the login screen.
	pub fn reset(&self) {
		self.logout_observed.store(false, Ordering::Relaxed);
	}
}
impl SessionSubscriber for SessionMirror {
	fn on_session_event(&self, event: SessionEvent) -> BusFuture<'_> {
		Box::pin(async move {
			match event {
				SessionEvent::TokenRefreshed { scope, tokens } => {
					let _ = self.store.update_tokens(scope, tokens).await;
				},
				SessionEvent::LoggedOut => {
					let _ = self.store.clear_all().await;

					self.logout_observed.store(true, Ordering::Relaxed);
				},
			}
		})
	}
}
impl Debug for SessionMirror {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionMirror").field("logout_observed", &self.logout_observed()).finish()
	}
}
