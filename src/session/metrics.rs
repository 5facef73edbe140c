// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for authenticated requests and session refreshes.
#[derive(Debug, Default)]
pub struct SessionMetrics {
	requests: AtomicU64,
	retries: AtomicU64,
	refresh_attempts: AtomicU64,
	refresh_joins: AtomicU64,
	refresh_successes: AtomicU64,
	refresh_failures: AtomicU64,
	auth_failures: AtomicU64,
}
impl SessionMetrics {
	/// Returns the number of original (non-retry) requests sent.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns the number of requests replayed after a successful refresh.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh network calls issued.
	pub fn refresh_attempts(&self) -> u64 {
		self.refresh_attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that attached to an already pending refresh.
	pub fn refresh_joins(&self) -> u64 {
		self.refresh_joins.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that rotated the session.
	pub fn refresh_successes(&self) -> u64 {
		self.refresh_successes.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that failed (status or transport).
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that ended in
	/// [`Error::AuthenticationFailed`](crate::error::Error::AuthenticationFailed).
	pub fn auth_failures(&self) -> u64 {
		self.auth_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_attempt(&self) {
		self.refresh_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_join(&self) {
		self.refresh_joins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_outcome(&self, succeeded: bool) {
		if succeeded {
			self.refresh_successes.fetch_add(1, Ordering::Relaxed);
		} else {
			self.refresh_failures.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub(crate) fn record_auth_failure(&self) {
		self.auth_failures.fetch_add(1, Ordering::Relaxed);
	}
}
