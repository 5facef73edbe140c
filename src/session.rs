//! Authenticated requests with single-flight session refresh and one bounded retry.
//!
//! [`SessionManager::request`] attaches cookies from the configured
//! [`CredentialStore`](crate::credential::CredentialStore), sends the request, and passes every
//! response other than `401 Unauthorized` straight back to the caller. A 401 triggers
//! [`SessionManager::refresh`]; when the refresh succeeds the original request is replayed exactly
//! once, otherwise the call fails with [`Error::AuthenticationFailed`] and the caller decides
//! whether to navigate to a login route.
//!
//! Refreshes are single-flight per manager: while one `POST` to the refresh endpoint is pending,
//! every other caller attaches to the same shared future and observes the same outcome. The
//! pending handle is cleared as soon as the refresh settles, so a later 401 starts a new attempt.
//!
//! The manager only keeps a weak handle to the pending refresh. Without a spawner, a refresh that
//! every waiter abandons is dropped and the next caller starts a new one. With
//! [`SessionManager::with_spawner`], each refresh is also driven by a detached task, so it runs to
//! completion and its `Set-Cookie` rotation lands in the store even if nobody waits for it.

mod metrics;

pub use metrics::SessionMetrics;

// crates.io
use futures::{
	FutureExt,
	future::{BoxFuture, Shared, WeakShared},
};
use http::{
	HeaderMap, HeaderValue, Method,
	header::{AUTHORIZATION, COOKIE},
};
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	credential::CredentialStore,
	error::ConfigError,
	http::{ApiRequest, ApiResponse, HttpCall, SessionHttpClient},
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Session manager specialized for the crate's default reqwest transport.
pub type ReqwestSessionManager = SessionManager<ReqwestHttpClient>;

type RefreshFuture = Shared<BoxFuture<'static, bool>>;
type RefreshSlot = Mutex<Option<WeakShared<BoxFuture<'static, bool>>>>;
type Spawner = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Issues authenticated requests and recovers expired sessions.
///
/// The manager is an explicitly constructed object owned by the application's composition root;
/// clones share the transport, credential store, metrics, and refresh state, so every caller that
/// needs authenticated requests should receive a clone of the same manager.
pub struct SessionManager<C>
where
	C: ?Sized + SessionHttpClient,
{
	config: Arc<ClientConfig>,
	store: Arc<dyn CredentialStore>,
	http_client: Arc<C>,
	metrics: Arc<SessionMetrics>,
	pending: Arc<RefreshSlot>,
	spawner: Option<Spawner>,
}
impl<C> SessionManager<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Creates a manager that reuses the caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			config: Arc::new(config),
			store,
			http_client: http_client.into(),
			metrics: Default::default(),
			pending: Default::default(),
			spawner: None,
		}
	}

	/// Drives every refresh on a detached task created by `spawn`, e.g.
	/// `.with_spawner(|fut| { tokio::spawn(fut); })`.
	///
	/// Without a spawner a refresh only progresses while someone awaits it.
	pub fn with_spawner<S>(mut self, spawn: S) -> Self
	where
		S: 'static + Send + Sync + Fn(BoxFuture<'static, ()>),
	{
		self.spawner = Some(Arc::new(spawn));

		self
	}

	/// Configuration the manager resolves targets against.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store shared by every clone of this manager.
	pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Request and refresh counters.
	pub fn metrics(&self) -> &SessionMetrics {
		&self.metrics
	}

	/// Returns `true` while a refresh call is pending.
	pub fn is_refreshing(&self) -> bool {
		self.pending.lock().as_ref().and_then(WeakShared::upgrade).is_some()
	}

	/// Sends `request` with credentials attached, refreshing and retrying once on 401.
	///
	/// Non-401 responses, including other 4xx/5xx statuses, are returned untouched. Transport
	/// failures surface as [`Error::Transport`] and are never retried.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "request");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.request_with_retry(request)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Refreshes the session, sharing the outcome with every concurrent caller.
	///
	/// Any 2xx from the refresh endpoint counts as success; every other status and any transport
	/// failure yields `false`. This never returns an error.
	pub async fn refresh(&self) -> bool {
		let (pending, started) = {
			let mut slot = self.pending.lock();

			// A handle that no longer upgrades belongs to a settled or abandoned attempt.
			match slot.as_ref().and_then(WeakShared::upgrade) {
				Some(pending) => {
					self.metrics.record_refresh_join();

					(pending, false)
				},
				None => {
					let pending = self.refresh_future();

					*slot = pending.downgrade();

					(pending, true)
				},
			}
		};

		if let Some(spawn) = self.spawner.as_ref().filter(|_| started) {
			let driver = pending.clone();

			spawn(
				async move {
					driver.await;
				}
				.boxed(),
			);
		}

		pending.await
	}

	async fn request_with_retry(&self, request: ApiRequest) -> Result<ApiResponse> {
		ensure_no_credentials(&request.headers)?;

		let url = self.config.resolve(&request.target)?;

		self.metrics.record_request();

		let response = self.send(&request, &url).await?;

		if !response.is_unauthorized() {
			return Ok(response);
		}

		obs::event!(debug, url = %url, "Session rejected; refreshing before retry.");

		if !self.refresh().await {
			self.metrics.record_auth_failure();

			obs::event!(warn, url = %url, "Session refresh failed; authentication required.");

			return Err(Error::AuthenticationFailed);
		}

		const KIND: OpKind = OpKind::Retry;

		let span = OpSpan::new(KIND, "request");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.metrics.record_retry();

		let result = span.instrument(self.send(&request, &url)).await;

		obs::record_result(KIND, &result);

		result
	}

	async fn send(&self, request: &ApiRequest, url: &Url) -> Result<ApiResponse> {
		let call = build_call(
			self.store.as_ref(),
			request.method.clone(),
			url.clone(),
			request.headers.clone(),
			request.body.clone(),
		);
		let response = self.http_client.execute(call).await?;

		absorb_cookies(self.store.as_ref(), url, &response);

		Ok(response)
	}

	fn refresh_future(&self) -> RefreshFuture {
		let attempt = RefreshAttempt {
			config: Arc::clone(&self.config),
			store: Arc::clone(&self.store),
			http_client: Arc::clone(&self.http_client),
			metrics: Arc::clone(&self.metrics),
			slot: Arc::clone(&self.pending),
		};

		attempt.run().boxed().shared()
	}
}
impl<C> Clone for SessionManager<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			config: Arc::clone(&self.config),
			store: Arc::clone(&self.store),
			http_client: Arc::clone(&self.http_client),
			metrics: Arc::clone(&self.metrics),
			pending: Arc::clone(&self.pending),
			spawner: self.spawner.clone(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl SessionManager<ReqwestHttpClient> {
	/// Creates a manager with its own reqwest transport built from `config`.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(config, store, http_client))
	}
}
impl<C> Debug for SessionManager<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.is_refreshing())
			.field("detached_refresh", &self.spawner.is_some())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Everything one refresh call needs, owned so the shared future is `'static`.
struct RefreshAttempt<C>
where
	C: ?Sized + SessionHttpClient,
{
	config: Arc<ClientConfig>,
	store: Arc<dyn CredentialStore>,
	http_client: Arc<C>,
	metrics: Arc<SessionMetrics>,
	slot: Arc<RefreshSlot>,
}
impl<C> RefreshAttempt<C>
where
	C: ?Sized + SessionHttpClient,
{
	async fn run(self) -> bool {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "refresh");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.metrics.record_refresh_attempt();

		let succeeded = span.instrument(self.call()).await;

		self.metrics.record_refresh_outcome(succeeded);
		obs::record_op_outcome(
			KIND,
			if succeeded { OpOutcome::Success } else { OpOutcome::Failure },
		);

		// Back to idle before any waiter observes the outcome.
		*self.slot.lock() = None;

		succeeded
	}

	async fn call(&self) -> bool {
		let url = match self.config.refresh_url() {
			Ok(url) => url,
			Err(e) => {
				obs::warn_error("Refresh endpoint cannot be resolved.", &e);

				return false;
			},
		};
		let call =
			build_call(self.store.as_ref(), Method::POST, url.clone(), HeaderMap::new(), None);

		match self.http_client.execute(call).await {
			Ok(response) => {
				absorb_cookies(self.store.as_ref(), &url, &response);

				obs::event!(debug, status = response.status.as_u16(), "Session refresh settled.");

				response.is_success()
			},
			Err(e) => {
				obs::warn_error("Session refresh transport failure.", &e);

				false
			},
		}
	}
}

fn ensure_no_credentials(headers: &HeaderMap) -> Result<(), ConfigError> {
	if headers.contains_key(COOKIE) {
		return Err(ConfigError::ExplicitCredentials { header: "cookie" });
	}
	if headers.contains_key(AUTHORIZATION) {
		return Err(ConfigError::ExplicitCredentials { header: "authorization" });
	}

	Ok(())
}

fn build_call(
	store: &dyn CredentialStore,
	method: Method,
	url: Url,
	mut headers: HeaderMap,
	body: Option<Vec<u8>>,
) -> HttpCall {
	if let Some(cookie) = store.cookie_header(&url, OffsetDateTime::now_utc()) {
		match HeaderValue::from_str(&cookie) {
			Ok(value) => {
				headers.insert(COOKIE, value);
			},
			Err(_) => {
				obs::event!(warn, url = %url, "Stored cookies are not a valid header value.");
			},
		}
	}

	HttpCall { method, url, headers, body }
}

fn absorb_cookies(store: &dyn CredentialStore, url: &Url, response: &ApiResponse) {
	let set_cookies = response.set_cookies();

	if set_cookies.is_empty() {
		return;
	}
	// The in-memory view is already updated when persistence fails; keep serving the response.
	if let Err(e) = store.absorb(url, &set_cookies, OffsetDateTime::now_utc()) {
		obs::warn_error("Failed to persist session cookies.", &e);
	}
}
