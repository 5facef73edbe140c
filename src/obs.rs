//! Optional observability helpers for session operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `odot_client.op` with the `op` (operation)
//!   and `stage` (call site) fields, plus debug/warn events for refresh and auth outcomes.
//! - Enable `metrics` to increment the `odot_client_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Authenticated request issued on behalf of a caller.
	Request,
	/// Session refresh call against the refresh endpoint.
	Refresh,
	/// Replay of a request after a successful refresh.
	Retry,
	/// Session bootstrap via the current-user endpoint.
	CheckAuth,
	/// Proactive refresh loop.
	KeepAlive,
	/// Session teardown.
	Logout,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Request => "request",
			OpKind::Refresh => "refresh",
			OpKind::Retry => "retry",
			OpKind::CheckAuth => "check_auth",
			OpKind::KeepAlive => "keep_alive",
			OpKind::Logout => "logout",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Emits a `tracing` event when the feature is enabled; expands to nothing otherwise.
macro_rules! event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	};
}
pub(crate) use event;

/// Logs a recoverable failure at warn level when tracing is enabled.
pub(crate) fn warn_error(message: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		::tracing::warn!(error = %error, "{message}");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (message, error);
	}
}
