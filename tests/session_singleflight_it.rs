// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use futures::future;
use http::{
	HeaderValue, StatusCode,
	header::{COOKIE, SET_COOKIE},
};
// self
use odot_client::{
	config::ClientConfig,
	credential::{CredentialStore, MemoryCredentialStore},
	error::Error,
	http::{ApiRequest, ApiResponse, HttpCall, SessionHttpClient, TransportFuture},
	session::SessionManager,
};

const REFRESH_LATENCY: Duration = Duration::from_millis(200);
const API_LATENCY: Duration = Duration::from_millis(5);

/// Backend double: API calls succeed only with the rotated cookie, refreshes are slow.
struct SlowBackend {
	refresh_status: StatusCode,
	refresh_calls: AtomicUsize,
	api_calls: AtomicUsize,
}
impl SlowBackend {
	fn new(refresh_status: StatusCode) -> Arc<Self> {
		Arc::new(Self {
			refresh_status,
			refresh_calls: AtomicUsize::new(0),
			api_calls: AtomicUsize::new(0),
		})
	}
}
impl SessionHttpClient for SlowBackend {
	fn execute(&self, call: HttpCall) -> TransportFuture<'_> {
		if call.url.path() == "/api/auth/refresh" {
			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			return Box::pin(async move {
				tokio::time::sleep(REFRESH_LATENCY).await;

				let mut response = ApiResponse::new(self.refresh_status, Vec::new());

				if self.refresh_status.is_success() {
					response
						.headers
						.append(SET_COOKIE, HeaderValue::from_static("auth_token=fresh; Path=/"));
				}

				Ok(response)
			});
		}

		self.api_calls.fetch_add(1, Ordering::SeqCst);

		let authorized = call.headers.get(COOKIE).is_some_and(|value| value == "auth_token=fresh");

		Box::pin(async move {
			tokio::time::sleep(API_LATENCY).await;

			Ok(if authorized {
				ApiResponse::new(StatusCode::OK, br#"{"ok":true}"#.to_vec())
			} else {
				ApiResponse::new(StatusCode::UNAUTHORIZED, Vec::new())
			})
		})
	}
}

fn build_session(backend: &Arc<SlowBackend>) -> SessionManager<SlowBackend> {
	let config = ClientConfig::builder("http://odot.test")
		.build()
		.expect("Test configuration should build.");
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::default());

	SessionManager::with_http_client(config, store, Arc::clone(backend))
}

#[tokio::test]
async fn concurrent_refreshes_share_one_network_call() {
	let backend = SlowBackend::new(StatusCode::OK);
	let session = build_session(&backend);
	let outcomes = future::join_all((0..8).map(|_| session.refresh())).await;

	assert_eq!(outcomes, vec![true; 8]);
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(session.metrics().refresh_attempts(), 1);
	assert_eq!(session.metrics().refresh_joins(), 7);
	assert!(!session.is_refreshing());
}

#[tokio::test]
async fn concurrent_failed_refreshes_share_the_failure() {
	let backend = SlowBackend::new(StatusCode::FORBIDDEN);
	let session = build_session(&backend);
	let clones = (0..4).map(|_| session.clone()).collect::<Vec<_>>();
	let outcomes = future::join_all(clones.iter().map(|session| session.refresh())).await;

	assert_eq!(outcomes, vec![false; 4]);
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(session.metrics().refresh_failures(), 1);
}

#[tokio::test]
async fn concurrent_401s_trigger_a_single_refresh() {
	let backend = SlowBackend::new(StatusCode::OK);
	let session = build_session(&backend);
	let results =
		future::join_all((0..5).map(|_| session.request(ApiRequest::get("/api/projects")))).await;

	for result in results {
		let response = result.expect("Every caller should recover after the shared refresh.");

		assert_eq!(response.status, StatusCode::OK);
	}

	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	// One rejected call plus one replay per caller.
	assert_eq!(backend.api_calls.load(Ordering::SeqCst), 10);
	assert_eq!(session.metrics().retries(), 5);
}

#[tokio::test]
async fn concurrent_401s_all_fail_when_the_shared_refresh_fails() {
	let backend = SlowBackend::new(StatusCode::UNAUTHORIZED);
	let session = build_session(&backend);
	let results =
		future::join_all((0..3).map(|_| session.request(ApiRequest::get("/api/me")))).await;

	for result in results {
		assert!(matches!(result, Err(Error::AuthenticationFailed)));
	}

	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(backend.api_calls.load(Ordering::SeqCst), 3);
	assert_eq!(session.metrics().auth_failures(), 3);
}

#[tokio::test]
async fn abandoned_refresh_is_restarted_by_the_next_caller() {
	let backend = SlowBackend::new(StatusCode::OK);
	let session = build_session(&backend);
	let abandoned = tokio::time::timeout(Duration::from_millis(10), session.refresh()).await;

	assert!(abandoned.is_err());
	assert!(!session.is_refreshing());
	assert!(session.refresh().await);
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 2);
	assert_eq!(session.metrics().refresh_successes(), 1);
	assert!(!session.is_refreshing());
}

#[tokio::test]
async fn spawned_refresh_completes_without_waiters() {
	let backend = SlowBackend::new(StatusCode::OK);
	let session = build_session(&backend).with_spawner(|fut| {
		tokio::spawn(fut);
	});
	let abandoned = tokio::time::timeout(Duration::from_millis(10), session.refresh()).await;

	assert!(abandoned.is_err());
	assert!(session.is_refreshing());

	tokio::time::sleep(REFRESH_LATENCY * 2).await;

	assert!(!session.is_refreshing());
	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(session.metrics().refresh_successes(), 1);
	assert_eq!(
		session.credentials().snapshot().iter().map(|c| c.value.expose()).collect::<Vec<_>>(),
		vec!["fresh"],
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refresh_is_single_flight_across_tasks() {
	let backend = SlowBackend::new(StatusCode::OK);
	let session = build_session(&backend);
	let handles = (0..6)
		.map(|_| {
			let session = session.clone();

			tokio::spawn(async move { session.refresh().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		assert!(handle.await.expect("Refresh task should not panic."));
	}

	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
}
