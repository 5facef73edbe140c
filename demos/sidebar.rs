//! Renders a project sidebar against a mock odot backend whose access cookie has expired.
//!
//! The first `/api/projects` call is rejected with 401, the client refreshes the session through
//! `/api/auth/refresh`, replays the call with the rotated cookie, and prints the nested tree.
//! Credentials are persisted to a JSON jar in the system temp directory.
//!
//! Run with `RUST_LOG=odot_client=debug cargo run --example sidebar --features tracing` to see the
//! refresh spans.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use tracing_subscriber::EnvFilter;
// self
use odot_client::{
	api::OdotClient,
	auth::{AuthContext, AuthState},
	config::ClientConfig,
	credential::{CredentialStore, FileCredentialStore},
	hierarchy::build_hierarchy,
	session::SessionManager,
	url::Url,
};

const PROJECTS: &str = r##"[
	{"id":1,"name":"Home","description":null,"color":"#22c55e","parent_project_id":null},
	{"id":2,"name":"Work","description":"Day job","color":"#3b82f6","parent_project_id":null},
	{"id":3,"name":"Garden","description":null,"color":"#84cc16","parent_project_id":1},
	{"id":4,"name":"Herbs","description":null,"color":"#65a30d","parent_project_id":3},
	{"id":5,"name":"Q3 Launch","description":null,"color":"#f97316","parent_project_id":2}
]"##;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let server = MockServer::start_async().await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200).header("set-cookie", "auth_token=fresh; Path=/; Max-Age=900");
		})
		.await;
	let _me = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/me").header("cookie", "auth_token=fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":7,"email":"ada@odot.dev","profile_picture_url":""}"#);
		})
		.await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/me").header("cookie", "auth_token=stale");
			then.status(401);
		})
		.await;
	let _projects = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/projects").header("cookie", "auth_token=fresh");
			then.status(200).header("content-type", "application/json").body(PROJECTS);
		})
		.await;
	let _logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/logout");
			then.status(204).header("set-cookie", "auth_token=; Path=/; Max-Age=0");
		})
		.await;
	let jar_path = std::env::temp_dir().join("odot-client-demo").join("cookies.json");
	let jar = Arc::new(FileCredentialStore::open(&jar_path)?);

	jar.clear()?;
	jar.absorb(
		&Url::parse(&server.url("/"))?,
		&["auth_token=stale; Path=/".into()],
		time::OffsetDateTime::now_utc(),
	)?;

	let config = ClientConfig::builder(server.base_url()).build()?;
	let store: Arc<dyn CredentialStore> = jar.clone();
	let session = SessionManager::new(config, store)?.with_spawner(|fut| {
		tokio::spawn(fut);
	});
	let auth = AuthContext::new(OdotClient::new(session.clone()));

	match auth.check_auth().await {
		AuthState::Authenticated(user) => println!("Signed in as {}.", user.display_name()),
		_ => {
			println!("Signed out; log in at {}.", auth.login_redirect("/projects"));

			return Ok(());
		},
	}

	let projects = auth.client().list_projects().await?;

	for tree in build_hierarchy(&projects) {
		tree.walk(&mut |level, project| {
			println!("{}{} ({})", "  ".repeat(level), project.name, project.color);
		});
	}

	println!(
		"Refreshes: {}, retries: {}, jar: {}.",
		session.metrics().refresh_successes(),
		session.metrics().retries(),
		jar.path().display(),
	);

	auth.logout().await?;

	Ok(())
}
