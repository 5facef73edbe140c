//! Thread-safe in-memory [`CredentialStore`] implementation for short-lived processes and tests.

// self
use crate::{
	_prelude::*,
	credential::{CredentialStore, SessionCookie, StoreError, cookie::CookieJar},
};

/// Cookie jar that keeps credentials in-process; lost when the process exits.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore(Arc<RwLock<CookieJar>>);
impl MemoryCredentialStore {
	/// Creates a store pre-populated with cookies (for example restored from elsewhere).
	pub fn with_cookies(cookies: impl IntoIterator<Item = SessionCookie>) -> Self {
		Self(Arc::new(RwLock::new(CookieJar::from_cookies(cookies))))
	}
}
impl CredentialStore for MemoryCredentialStore {
	fn cookie_header(&self, url: &Url, now: OffsetDateTime) -> Option<String> {
		self.0.read().cookie_header(url, now)
	}

	fn absorb(
		&self,
		url: &Url,
		set_cookies: &[String],
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		self.0.write().absorb(url, set_cookies, now);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().clear();

		Ok(())
	}

	fn snapshot(&self) -> Vec<SessionCookie> {
		self.0.read().cookies()
	}
}
