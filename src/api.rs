//! Typed odot endpoints layered on top of the session manager.

// crates.io
use http::StatusCode;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{ApiRequest, ApiResponse, SessionHttpClient},
	obs::{self, OpKind, OpOutcome, OpSpan},
	session::SessionManager,
};

/// Account returned by the current-user endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Server-side user identifier.
	pub id: i64,
	/// Primary e-mail address.
	pub email: String,
	/// Avatar URL; empty when the account has none.
	#[serde(default, alias = "profilePictureUrl")]
	pub profile_picture_url: String,
}
impl User {
	/// Display name derived from the local part of the e-mail address.
	pub fn display_name(&self) -> &str {
		self.email.split('@').next().unwrap_or(&self.email)
	}
}

/// Project as listed by the project collection endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
	/// Server-side project identifier.
	pub id: i64,
	/// Project name.
	pub name: String,
	/// Optional free-form description.
	#[serde(default)]
	pub description: Option<String>,
	/// Display color (for example `#ef4444`).
	#[serde(default)]
	pub color: String,
	/// Parent project, `None` for top-level projects.
	#[serde(default)]
	pub parent_project_id: Option<i64>,
}

/// Payload accepted by the project creation endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
	/// Project name (required).
	pub name: String,
	/// Optional description; sent as an empty string when absent.
	pub description: String,
	/// Display color (required).
	pub color: String,
	/// Parent project identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parent_project_id: Option<i64>,
}
impl NewProject {
	/// Creates a top-level project payload.
	pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			color: color.into(),
			parent_project_id: None,
		}
	}

	/// Sets the description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();

		self
	}

	/// Nests the project under `parent`. The server treats id `0` as "no parent".
	pub fn with_parent(mut self, parent: i64) -> Self {
		self.parent_project_id = (parent != 0).then_some(parent);

		self
	}

	/// Checks the fields the server requires.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.name.trim().is_empty() {
			return Err(ConfigError::InvalidProject { reason: "name is required" });
		}
		if self.color.trim().is_empty() {
			return Err(ConfigError::InvalidProject { reason: "color is required" });
		}

		Ok(())
	}
}

/// Typed facade over the odot REST endpoints.
///
/// Every call goes through [`SessionManager::request`], so expired sessions are refreshed and
/// replayed transparently. Statuses the endpoint does not document as success become
/// [`Error::UnexpectedStatus`].
pub struct OdotClient<C>
where
	C: ?Sized + SessionHttpClient,
{
	session: SessionManager<C>,
}
impl<C> OdotClient<C>
where
	C: ?Sized + SessionHttpClient,
{
	/// Wraps an existing session manager.
	pub fn new(session: SessionManager<C>) -> Self {
		Self { session }
	}

	/// Underlying session manager.
	pub fn session(&self) -> &SessionManager<C> {
		&self.session
	}

	/// Fetches the signed-in user.
	pub async fn me(&self) -> Result<User> {
		let path = self.session.config().endpoints.me.clone();
		let response = self.session.request(ApiRequest::get(&path)).await?;

		decode(&path, &response, &[StatusCode::OK])
	}

	/// Lists every project owned by the signed-in user.
	pub async fn list_projects(&self) -> Result<Vec<Project>> {
		let path = self.session.config().endpoints.projects.clone();
		let response = self.session.request(ApiRequest::get(&path)).await?;

		decode(&path, &response, &[StatusCode::OK])
	}

	/// Creates a project and returns the stored representation.
	pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
		project.validate()?;

		let path = self.session.config().endpoints.projects.clone();
		let request = ApiRequest::post(&path).json(project)?;
		let response = self.session.request(request).await?;

		decode(&path, &response, &[StatusCode::CREATED, StatusCode::OK])
	}

	/// Ends the session on the server and clears local credentials.
	///
	/// Local credentials are cleared whatever the server answers, so a rejected logout still
	/// leaves this client signed out. Transport failures are reported after clearing.
	pub async fn logout(&self) -> Result<()> {
		const KIND: OpKind = OpKind::Logout;

		let span = OpSpan::new(KIND, "logout");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let path = self.session.config().endpoints.logout.clone();
				let sent = self.session.request(ApiRequest::post(&path)).await;

				self.session.credentials().clear()?;

				let response = match sent {
					Ok(response) => response,
					// Nothing left to end on the server.
					Err(Error::AuthenticationFailed) => return Ok(()),
					Err(e) => return Err(e),
				};

				if !response.is_success() {
					obs::event!(
						warn,
						status = response.status.as_u16(),
						"Server rejected logout; local credentials were cleared."
					);
				}

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
impl<C> Clone for OdotClient<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn clone(&self) -> Self {
		Self { session: self.session.clone() }
	}
}
impl<C> Debug for OdotClient<C>
where
	C: ?Sized + SessionHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OdotClient").field("session", &self.session).finish()
	}
}

fn decode<T>(path: &str, response: &ApiResponse, accepted: &[StatusCode]) -> Result<T>
where
	T: DeserializeOwned,
{
	if !accepted.contains(&response.status) {
		return Err(Error::UnexpectedStatus {
			status: response.status.as_u16(),
			body: response.body_preview(),
		});
	}

	Ok(response.json(path)?)
}
