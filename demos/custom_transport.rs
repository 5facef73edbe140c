//! Demonstrates plugging a non-reqwest transport into the session manager.
//!
//! 1. Implement [`SessionHttpClient`] and return every HTTP status as an [`ApiResponse`].
//! 2. Report connection-level problems as [`TransportError`].
//! 3. Pass the transport to [`SessionManager::with_http_client`] and issue requests as usual.

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use color_eyre::Result;
use http::{HeaderValue, StatusCode, header::SET_COOKIE};
// self
use odot_client::{
	api::OdotClient,
	config::ClientConfig,
	credential::{CredentialStore, MemoryCredentialStore},
	error::{Error, TransportError},
	http::{ApiResponse, HttpCall, SessionHttpClient, TransportFuture},
	session::SessionManager,
};

/// In-process backend that expires the first session it sees.
#[derive(Default)]
struct LoopbackTransport {
	rotated: AtomicBool,
	offline: AtomicBool,
}
impl SessionHttpClient for LoopbackTransport {
	fn execute(&self, call: HttpCall) -> TransportFuture<'_> {
		Box::pin(async move {
			if self.offline.load(Ordering::SeqCst) {
				return Err(TransportError::network(
					call.url.as_str(),
					std::io::Error::other("loopback offline"),
				));
			}

			let response = match call.url.path() {
				"/api/auth/refresh" => {
					self.rotated.store(true, Ordering::SeqCst);

					let mut response = ApiResponse::new(StatusCode::OK, Vec::new());

					response
						.headers
						.append(SET_COOKIE, HeaderValue::from_static("auth_token=rotated; Path=/"));

					response
				},
				"/api/projects" if self.rotated.load(Ordering::SeqCst) => ApiResponse::new(
					StatusCode::OK,
					br##"[{"id":1,"name":"Inbox","color":"#64748b"}]"##.to_vec(),
				),
				_ => ApiResponse::new(StatusCode::UNAUTHORIZED, Vec::new()),
			};

			Ok(response)
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(LoopbackTransport::default());
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::default());
	let config = ClientConfig::builder("http://odot.local").build()?;
	let session: SessionManager<LoopbackTransport> =
		SessionManager::with_http_client(config, Arc::clone(&store), Arc::clone(&transport));
	let client = OdotClient::new(session);
	let projects = client.list_projects().await?;

	println!(
		"Loaded {} project(s) after {} refresh(es); jar holds {} cookie(s).",
		projects.len(),
		client.session().metrics().refresh_successes(),
		store.snapshot().len(),
	);

	transport.offline.store(true, Ordering::SeqCst);

	match client.me().await {
		Err(Error::Transport(e)) => println!("Transport failure surfaced unchanged: {e}."),
		other => println!("Unexpected outcome: {other:?}."),
	}

	Ok(())
}
