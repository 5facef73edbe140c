//! Credential storage contracts and built-in cookie jars.
//!
//! The odot backend keeps the session in HTTP-only cookies (`auth_token`, `refresh_token`). A
//! browser manages those implicitly; everywhere else a [`CredentialStore`] plays that role. The
//! session manager asks the store for a `Cookie` header before each request and hands back every
//! `Set-Cookie` header it receives, so refresh rotations and logout deletions land in the jar
//! without the manager ever looking at token bytes.

pub mod cookie;
pub mod file;
pub mod memory;

pub use cookie::*;
pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

// self
use crate::_prelude::*;

/// Cookie jar contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Builds the `Cookie` header for a request to `url`, skipping expired cookies.
	fn cookie_header(&self, url: &Url, now: OffsetDateTime) -> Option<String>;

	/// Applies `Set-Cookie` headers received from `url`.
	fn absorb(&self, url: &Url, set_cookies: &[String], now: OffsetDateTime)
	-> Result<(), StoreError>;

	/// Drops every stored cookie.
	fn clear(&self) -> Result<(), StoreError>;

	/// Returns a copy of the stored cookies, including expired ones not yet purged.
	fn snapshot(&self) -> Vec<SessionCookie>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
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
