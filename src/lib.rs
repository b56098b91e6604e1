//! Client session core for a multi-tenant CRM console: singleflight token refresh,
//! cross-tab session sync, inactivity timers, and menu access caching behind one
//! injectable session manager.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod access;
pub mod auth;
pub mod backend;
pub mod bus;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
pub mod timeout;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by the crate's integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		backend::BackendDescriptor,
		bus::{LocalBus, SessionBus},
		http::ReqwestTransport,
		session::SessionManager,
		store::{CredentialStore, MemoryCredentialStore},
	};

	/// Session manager type alias used by reqwest-backed integration tests.
	pub type ReqwestTestManager = SessionManager<ReqwestTransport>;

	/// Builds the reqwest transport used across integration tests.
	pub fn test_transport() -> ReqwestTransport {
		ReqwestTransport::default()
	}

	/// Constructs a [`SessionManager`] backed by an in-memory store and a local
	/// in-process bus, returning the concrete backends for inspection.
	pub fn build_test_manager(
		descriptor: BackendDescriptor,
	) -> (ReqwestTestManager, Arc<MemoryCredentialStore>, Arc<LocalBus>) {
		let store_backend = Arc::new(MemoryCredentialStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let bus_backend = Arc::new(LocalBus::default());
		let bus: Arc<dyn SessionBus> = bus_backend.clone();
		let manager = SessionManager::with_transport(store, descriptor, bus, test_transport());

		(manager, store_backend, bus_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::{
			Arc,
			atomic::{AtomicBool, AtomicU64, Ordering},
		},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use httpmock as _;
#[cfg(test)] use console_session as _;
