#![cfg(feature = "reqwest")]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use odot_client::{
	api::Project,
	config::ClientConfig,
	credential::{CookieValue, CredentialStore, MemoryCredentialStore, SessionCookie},
	error::Error,
	http::{ApiRequest, ReqwestHttpClient},
	session::SessionManager,
};

const INBOX: &str =
	r##"[{"id":1,"name":"Inbox","description":null,"color":"#64748b","parent_project_id":null}]"##;

fn build_session(
	server: &MockServer,
	seeded: Option<&str>,
) -> (SessionManager<ReqwestHttpClient>, Arc<MemoryCredentialStore>) {
	let config =
		ClientConfig::builder(server.base_url()).build().expect("Mock server URL should be valid.");
	let host = format!("{}:{}", server.host(), server.port());
	let jar = Arc::new(MemoryCredentialStore::with_cookies(seeded.map(|value| SessionCookie {
		host: host.clone(),
		name: "auth_token".into(),
		value: CookieValue::new(value),
		expires_at: None,
		secure: false,
	})));
	let store: Arc<dyn CredentialStore> = jar.clone();
	let http_client =
		ReqwestHttpClient::from_config(&config).expect("Reqwest transport should build.");

	(SessionManager::with_http_client(config, store, http_client), jar)
}

#[tokio::test]
async fn non_401_responses_are_returned_untouched() {
	let server = MockServer::start_async().await;
	let projects = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/projects");
			then.status(500).body("database unavailable");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200);
		})
		.await;
	let (session, _jar) = build_session(&server, Some("valid"));
	let response = session
		.request(ApiRequest::get("/api/projects"))
		.await
		.expect("A 500 is a response, not an error.");

	assert_eq!(response.status.as_u16(), 500);
	assert_eq!(response.text(), "database unavailable");

	projects.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn projects_recover_after_refresh_and_single_retry() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/projects").header("cookie", "auth_token=stale");
			then.status(401).body("token expired");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh").header("cookie", "auth_token=stale");
			then.status(200)
				.header("set-cookie", "auth_token=fresh; Path=/; Max-Age=900; HttpOnly")
				.body("{}");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/projects").header("cookie", "auth_token=fresh");
			then.status(200).header("content-type", "application/json").body(INBOX);
		})
		.await;
	let (session, jar) = build_session(&server, Some("stale"));
	let response = session
		.request(ApiRequest::get("/api/projects"))
		.await
		.expect("Request should succeed after the refresh.");
	let projects = response.json::<Vec<Project>>("/api/projects").expect("Body should decode.");

	assert_eq!(response.status.as_u16(), 200);
	assert_eq!(projects.len(), 1);
	assert_eq!(projects[0].name, "Inbox");
	assert_eq!(jar.snapshot()[0].value.expose(), "fresh");
	assert_eq!(session.metrics().retries(), 1);
	assert!(!session.is_refreshing());

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refresh_reports_authentication_failure_without_replay() {
	let server = MockServer::start_async().await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/me");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(401).body("refresh token revoked");
		})
		.await;
	let (session, _jar) = build_session(&server, Some("stale"));
	let err = session
		.request(ApiRequest::get("/api/me"))
		.await
		.expect_err("A failed refresh must surface as an error.");

	assert!(matches!(err, Error::AuthenticationFailed));
	assert_eq!(session.metrics().auth_failures(), 1);

	me.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn settled_refresh_does_not_absorb_later_401s() {
	let server = MockServer::start_async().await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/me");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(503);
		})
		.await;
	let (session, _jar) = build_session(&server, None);

	for _ in 0..2 {
		let err = session
			.request(ApiRequest::get("/api/me"))
			.await
			.expect_err("Each 401 should end in an authentication failure.");

		assert!(matches!(err, Error::AuthenticationFailed));
		assert!(!session.is_refreshing());
	}

	me.assert_calls_async(2).await;
	refresh.assert_calls_async(2).await;
	assert_eq!(session.metrics().refresh_attempts(), 2);
	assert_eq!(session.metrics().refresh_joins(), 0);
}

#[tokio::test]
async fn refresh_clears_cookies_the_server_expires() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(401).header("set-cookie", "auth_token=; Path=/; Max-Age=0");
		})
		.await;
	let (session, jar) = build_session(&server, Some("revoked"));

	assert!(!session.refresh().await);
	assert!(jar.snapshot().is_empty());

	refresh.assert_calls_async(1).await;
}

fn build_slow_refresh_session(server: &MockServer) -> SessionManager<ReqwestHttpClient> {
	let config = ClientConfig::builder(server.base_url())
		.timeout(time::Duration::seconds(1))
		.build()
		.expect("Mock server URL should be valid.");
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::default());
	let http_client =
		ReqwestHttpClient::from_config(&config).expect("Reqwest transport should build.");

	SessionManager::with_http_client(config, store, http_client)
}

#[tokio::test]
async fn abandoned_refresh_never_resumes_past_its_timeout() {
	let server = MockServer::start_async().await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("set-cookie", "auth_token=fresh; Path=/")
				.delay(Duration::from_millis(300));
		})
		.await;
	let session = build_slow_refresh_session(&server);

	assert!(tokio::time::timeout(Duration::from_millis(50), session.refresh()).await.is_err());

	tokio::time::sleep(Duration::from_millis(1_500)).await;

	assert!(!session.is_refreshing());
	assert!(session.refresh().await);
	assert_eq!(session.metrics().refresh_successes(), 1);
}

#[tokio::test]
async fn spawned_refresh_keeps_the_rotated_cookie_when_abandoned() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("set-cookie", "auth_token=fresh; Path=/")
				.delay(Duration::from_millis(300));
		})
		.await;
	let session = build_slow_refresh_session(&server).with_spawner(|fut| {
		tokio::spawn(fut);
	});

	assert!(tokio::time::timeout(Duration::from_millis(50), session.refresh()).await.is_err());

	tokio::time::sleep(Duration::from_millis(1_500)).await;

	assert!(!session.is_refreshing());
	assert_eq!(session.metrics().refresh_successes(), 1);
	assert_eq!(
		session.credentials().snapshot().iter().map(|c| c.value.expose()).collect::<Vec<_>>(),
		vec!["fresh"],
	);

	refresh.assert_calls_async(1).await;
}
