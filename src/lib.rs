//! Session-aware HTTP client for the odot task manager: cookie credentials, single-flight
//! session refresh, typed project APIs, and optional observability.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod hierarchy;
pub mod http;
pub mod obs;
pub mod session;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		api::OdotClient,
		config::ClientConfig,
		credential::{CredentialStore, MemoryCredentialStore},
		http::ReqwestHttpClient,
		session::SessionManager,
	};

	/// Session manager type alias used by reqwest-backed integration tests.
	pub type ReqwestTestSession = SessionManager<ReqwestHttpClient>;

	/// Builds a configuration pointing at a mock server base URL.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder(base_url)
			.build()
			.expect("Failed to build client configuration for tests.")
	}

	/// Constructs a [`SessionManager`] backed by an in-memory cookie jar and the reqwest
	/// transport used across integration tests.
	pub fn build_reqwest_test_session(
		base_url: &str,
	) -> (ReqwestTestSession, Arc<MemoryCredentialStore>) {
		let jar = Arc::new(MemoryCredentialStore::default());
		let store: Arc<dyn CredentialStore> = jar.clone();
		let config = test_config(base_url);
		let http_client = ReqwestHttpClient::from_config(&config)
			.expect("Failed to build reqwest client for tests.");
		let session = SessionManager::with_http_client(config, store, http_client);

		(session, jar)
	}

	/// Same as [`build_reqwest_test_session`] but wrapped in the typed [`OdotClient`].
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (OdotClient<ReqwestHttpClient>, Arc<MemoryCredentialStore>) {
		let (session, jar) = build_reqwest_test_session(base_url);

		(OdotClient::new(session), jar)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

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
#[cfg(test)]
use {color_eyre as _, httpmock as _, tokio as _, tracing_subscriber as _};
