//! Signed-in state tracking for applications built on [`OdotClient`].
//!
//! [`AuthContext`] bootstraps the session through the current-user endpoint, keeps it warm with
//! periodic refreshes, and tears it down on logout. It never navigates: callers read
//! [`AuthContext::state`] and use [`AuthContext::login_redirect`] to build their own login target.

// std
use std::time::Duration as StdDuration;
// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	api::{OdotClient, User},
	http::SessionHttpClient,
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::SessionManager,
};

/// Authentication state as last observed by the context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
	/// No check has completed yet.
	#[default]
	Loading,
	/// The session is valid for this user.
	Authenticated(User),
	/// No usable session; the caller should offer a login.
	Unauthenticated,
}
impl AuthState {
	/// Signed-in user, if any.
	pub fn user(&self) -> Option<&User> {
		match self {
			AuthState::Authenticated(user) => Some(user),
			_ => None,
		}
	}

	/// Returns `true` while a user is signed in.
	pub fn is_authenticated(&self) -> bool {
		matches!(self, AuthState::Authenticated(_))
	}
}

/// Shared authentication state bound to one [`OdotClient`].
///
/// Clones observe and update the same state.
pub struct AuthContext<C>
where
	C: ?Sized + SessionHttpClient,
{
	client: OdotClient<C>,
	state: Arc<RwLock<AuthState>>,
}
impl<C> AuthContext<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Creates a context in the [`AuthState::Loading`] state.
	pub fn new(client: OdotClient<C>) -> Self {
		Self { client, state: Default::default() }
	}

	/// Typed client the context issues calls through.
	pub fn client(&self) -> &OdotClient<C> {
		&self.client
	}

	/// Current state snapshot.
	pub fn state(&self) -> AuthState {
		self.state.read().clone()
	}

	/// Asks the server who is signed in and records the answer.
	///
	/// The lookup goes through the session manager, so an expired access cookie is refreshed
	/// first. Any failure, including transport errors, leaves the context unauthenticated.
	pub async fn check_auth(&self) -> AuthState {
		const KIND: OpKind = OpKind::CheckAuth;

		let span = OpSpan::new(KIND, "check_auth");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let state = span
			.instrument(async {
				match self.client.me().await {
					Ok(user) => {
						obs::event!(debug, user_id = user.id, "Session belongs to a signed-in user.");

						AuthState::Authenticated(user)
					},
					Err(e) => {
						obs::warn_error("Session check failed; treating as signed out.", &e);

						AuthState::Unauthenticated
					},
				}
			})
			.await;

		obs::record_op_outcome(
			KIND,
			if state.is_authenticated() { OpOutcome::Success } else { OpOutcome::Failure },
		);

		self.set_state(state.clone());

		state
	}

	/// Builds the login route with `return_to` percent-encoded into the `redirect` parameter.
	pub fn login_redirect(&self, return_to: &str) -> String {
		let encoded = form_urlencoded::byte_serialize(return_to.as_bytes()).collect::<String>();

		format!("{}?redirect={encoded}", self.session().config().endpoints.login)
	}

	/// Refreshes the session every `keep_alive_interval` for as long as a user is signed in.
	///
	/// `sleep` supplies the timer so the loop runs on any executor, e.g.
	/// `ctx.keep_alive(tokio::time::sleep)`. The future completes once the context is no longer
	/// authenticated; a failed refresh marks it [`AuthState::Unauthenticated`] before returning.
	pub async fn keep_alive<S, F>(&self, mut sleep: S)
	where
		S: FnMut(StdDuration) -> F,
		F: Future<Output = ()>,
	{
		const KIND: OpKind = OpKind::KeepAlive;

		let interval = self.session().config().keep_alive_interval.unsigned_abs();

		while self.state.read().is_authenticated() {
			sleep(interval).await;

			// Logged out while sleeping.
			if !self.state.read().is_authenticated() {
				break;
			}

			let span = OpSpan::new(KIND, "keep_alive");

			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			if span.instrument(self.session().refresh()).await {
				obs::record_op_outcome(KIND, OpOutcome::Success);

				continue;
			}

			obs::record_op_outcome(KIND, OpOutcome::Failure);
			obs::event!(warn, "Keep-alive refresh failed; session ended.");

			self.set_state(AuthState::Unauthenticated);
		}
	}

	/// Logs out on the server and marks the context signed out.
	///
	/// On error the state is left untouched so the caller can retry.
	pub async fn logout(&self) -> Result<()> {
		self.client.logout().await?;
		self.set_state(AuthState::Unauthenticated);

		Ok(())
	}

	/// Returns the signed-in user or [`Error::AuthenticationFailed`].
	pub fn require_user(&self) -> Result<User> {
		self.state.read().user().cloned().ok_or(Error::AuthenticationFailed)
	}

	fn session(&self) -> &SessionManager<C> {
		self.client.session()
	}

	fn set_state(&self, state: AuthState) {
		*self.state.write() = state;
	}
}
impl<C> Clone for AuthContext<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn clone(&self) -> Self {
		Self { client: self.client.clone(), state: Arc::clone(&self.state) }
	}
}
impl<C> Debug for AuthContext<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthContext").field("state", &*self.state.read()).finish()
	}
}
