//! Session manager context object coordinating auth, refresh, and access flows.

pub mod access;
pub mod metrics;
pub mod refresh;
pub mod request;

pub use metrics::FlowMetrics;

// self
use crate::{
	_prelude::*,
	access::AccessCacheEntry,
	auth::{AuthUser, Credentials},
	backend::BackendDescriptor,
	bus::SessionBus,
	http::HttpTransport,
	store::{CredentialStore, StoreScope},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Session manager specialized for the crate's default reqwest transport.
pub type ReqwestSessionManager = SessionManager<ReqwestTransport>;

/// Coordinates the auth/session/access core for one console instance.
///
/// The manager owns the HTTP transport, credential store, cross-tab bus, and
/// backend descriptor so the flow implementations can focus on their own logic
/// (refresh-and-retry, singleflight rotation, access resolution). Construct one
/// per application lifetime and share clones; all clones observe the same
/// singleflight guards and caches.
pub struct SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// HTTP transport used for every outbound backend request.
	pub transport: Arc<T>,
	/// Credential store shared with the cross-tab mirror.
	pub store: Arc<dyn CredentialStore>,
	/// Cross-tab session bus receiving rotation and logout events.
	pub bus: Arc<dyn SessionBus>,
	/// Backend descriptor defining endpoints and policy knobs.
	pub descriptor: BackendDescriptor,
	/// Shared counters for refresh flow outcomes.
	pub refresh_metrics: Arc<FlowMetrics>,
	/// Shared counters for access resolution outcomes.
	pub access_metrics: Arc<FlowMetrics>,
	refresh_guard: Arc<AsyncMutex<()>>,
	refresh_generation: Arc<AtomicU64>,
	access_guard: Arc<AsyncMutex<()>>,
	access_cache: Arc<Mutex<Option<AccessCacheEntry>>>,
}
impl<T> SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a manager that reuses a caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn CredentialStore>,
		descriptor: BackendDescriptor,
		bus: Arc<dyn SessionBus>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			bus,
			descriptor,
			refresh_metrics: Default::default(),
			access_metrics: Default::default(),
			refresh_guard: Default::default(),
			refresh_generation: Default::default(),
			access_guard: Default::default(),
			access_cache: Default::default(),
		}
	}

	/// Installs post-login credentials and the user record for a scope.
	///
	/// Any cached access snapshot is dropped: a new session has a new owner.
	pub async fn begin_session(
		&self,
		scope: StoreScope,
		credentials: Credentials,
		user: Option<AuthUser>,
	) -> Result<()> {
		self.store.save(scope, credentials).await?;

		if let Some(user) = user {
			self.store.save_user(scope, user).await?;
		}

		self.invalidate_access();

		Ok(())
	}

	pub(crate) fn refresh_guard(&self) -> &AsyncMutex<()> {
		&self.refresh_guard
	}

	pub(crate) fn refresh_generation(&self) -> &AtomicU64 {
		&self.refresh_generation
	}

	pub(crate) fn access_guard(&self) -> &AsyncMutex<()> {
		&self.access_guard
	}

	pub(crate) fn access_cache(&self) -> &Mutex<Option<AccessCacheEntry>> {
		&self.access_cache
	}
}
#[cfg(feature = "reqwest")]
impl SessionManager<ReqwestTransport> {
	/// Creates a manager with the crate's default reqwest-backed transport.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		descriptor: BackendDescriptor,
		bus: Arc<dyn SessionBus>,
	) -> Self {
		Self::with_transport(store, descriptor, bus, ReqwestTransport::default())
	}
}
impl<T> Clone for SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			bus: Arc::clone(&self.bus),
			descriptor: self.descriptor.clone(),
			refresh_metrics: Arc::clone(&self.refresh_metrics),
			access_metrics: Arc::clone(&self.access_metrics),
			refresh_guard: Arc::clone(&self.refresh_guard),
			refresh_generation: Arc::clone(&self.refresh_generation),
			access_guard: Arc::clone(&self.access_guard),
			access_cache: Arc::clone(&self.access_cache),
		}
	}
}
impl<T> Debug for SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("descriptor", &self.descriptor)
			.field("refresh_generation", &self.refresh_generation.load(Ordering::Relaxed))
			.finish()
	}
}
