//! Validated client configuration: server location, endpoint paths, and timing knobs.
//!
//! Configuration is assembled through [`ClientConfigBuilder`] or loaded from JSON with
//! [`ClientConfig::from_json_str`]; both routes run the same validation so a
//! [`ClientConfig`] value is always usable by the session manager.

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable configuration consumed by the session manager and typed API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Origin every relative request target is resolved against.
	pub base_url: Url,
	/// Endpoint paths exposed by the odot backend.
	#[serde(default)]
	pub endpoints: EndpointPaths,
	/// Interval between proactive refreshes while a session is authenticated.
	#[serde(default = "ClientConfig::default_keep_alive_interval", with = "seconds")]
	pub keep_alive_interval: Duration,
	/// Transport-level timeout applied to every request.
	#[serde(default = "ClientConfig::default_timeout", with = "seconds")]
	pub timeout: Duration,
}
impl ClientConfig {
	const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::minutes(10);
	const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a new builder seeded with the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Resolves a request target (relative path or absolute URL) against the base URL.
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(target)
			.map_err(|source| ConfigError::InvalidTarget { target: target.to_owned(), source })
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.endpoints.refresh)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		validate_scheme(&self.base_url)?;
		self.endpoints.validate()?;

		if !self.keep_alive_interval.is_positive() {
			return Err(ConfigError::NonPositiveInterval { field: "keep_alive" });
		}
		if !self.timeout.is_positive() {
			return Err(ConfigError::NonPositiveInterval { field: "timeout" });
		}

		Ok(())
	}

	fn default_keep_alive_interval() -> Duration {
		Self::DEFAULT_KEEP_ALIVE_INTERVAL
	}

	fn default_timeout() -> Duration {
		Self::DEFAULT_TIMEOUT
	}
}

/// Endpoint paths relative to [`ClientConfig::base_url`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
	/// Session refresh endpoint (`POST`, no body).
	pub refresh: String,
	/// Session logout endpoint (`POST`, no body).
	pub logout: String,
	/// Current-user endpoint (`GET`).
	pub me: String,
	/// Project collection endpoint (`GET` list, `POST` create).
	pub projects: String,
	/// Client-side login route callers navigate to after an authentication failure.
	pub login: String,
}
impl EndpointPaths {
	fn validate(&self) -> Result<(), ConfigError> {
		validate_path("refresh", &self.refresh)?;
		validate_path("logout", &self.logout)?;
		validate_path("me", &self.me)?;
		validate_path("projects", &self.projects)?;
		validate_path("login", &self.login)
	}
}
impl Default for EndpointPaths {
	fn default() -> Self {
		Self {
			refresh: "/api/auth/refresh".into(),
			logout: "/api/auth/logout".into(),
			me: "/api/me".into(),
			projects: "/api/projects".into(),
			login: "/login".into(),
		}
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Raw base URL; parsed during [`build`](Self::build).
	pub base_url: String,
	/// Endpoint paths.
	pub endpoints: EndpointPaths,
	/// Keep-alive refresh interval.
	pub keep_alive_interval: Duration,
	/// Transport timeout.
	pub timeout: Duration,
}
impl ClientConfigBuilder {
	/// Creates a new builder with default paths and intervals.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			endpoints: EndpointPaths::default(),
			keep_alive_interval: ClientConfig::DEFAULT_KEEP_ALIVE_INTERVAL,
			timeout: ClientConfig::DEFAULT_TIMEOUT,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Overrides the current-user endpoint path.
	pub fn me_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.me = path.into();

		self
	}

	/// Overrides the project collection path.
	pub fn projects_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.projects = path.into();

		self
	}

	/// Overrides the login route.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the keep-alive interval (defaults to 10 minutes).
	pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
		self.keep_alive_interval = interval;

		self
	}

	/// Overrides the transport timeout (defaults to 30 seconds).
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url =
			Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let config = ClientConfig {
			base_url,
			endpoints: self.endpoints,
			keep_alive_interval: self.keep_alive_interval,
			timeout: self.timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_scheme(url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { url: url.to_string() }),
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { endpoint, path: path.to_owned() })
	}
}

mod seconds {
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};
	use time::Duration;

	pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_applies_defaults() {
		let config = ClientConfig::builder("https://odot.example.com")
			.build()
			.expect("Default configuration should build.");

		assert_eq!(config.endpoints.refresh, "/api/auth/refresh");
		assert_eq!(config.endpoints.login, "/login");
		assert_eq!(config.keep_alive_interval, Duration::minutes(10));
		assert_eq!(
			config.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://odot.example.com/api/auth/refresh",
		);
	}

	#[test]
	fn builder_rejects_bad_inputs() {
		let err = ClientConfig::builder("not a url").build().expect_err("Garbage must fail.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

		let err = ClientConfig::builder("ftp://odot.example.com")
			.build()
			.expect_err("Non-HTTP schemes must fail.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder("http://localhost:8080")
			.refresh_path("api/auth/refresh")
			.build()
			.expect_err("Relative paths must fail.");

		assert!(matches!(err, ConfigError::InvalidPath { endpoint: "refresh", .. }));

		let err = ClientConfig::builder("http://localhost:8080")
			.keep_alive_interval(Duration::ZERO)
			.build()
			.expect_err("Zero keep-alive must fail.");

		assert!(matches!(err, ConfigError::NonPositiveInterval { field: "keep_alive" }));
	}

	#[test]
	fn json_documents_fill_defaults_and_validate() {
		let config = ClientConfig::from_json_str(
			r#"{"base_url":"http://localhost:8080","endpoints":{"me":"/api/v2/me"},"timeout":5}"#,
		)
		.expect("Partial document should parse.");

		assert_eq!(config.endpoints.me, "/api/v2/me");
		assert_eq!(config.endpoints.projects, "/api/projects");
		assert_eq!(config.timeout, Duration::seconds(5));
		assert_eq!(config.keep_alive_interval, Duration::minutes(10));

		let err = ClientConfig::from_json_str(r#"{"base_url":"http://localhost","timeout":"x"}"#)
			.expect_err("Wrong types must fail.");

		match err {
			ConfigError::Parse { source } => assert_eq!(source.path().to_string(), "timeout"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn resolve_accepts_absolute_targets() {
		let config = ClientConfig::builder("http://localhost:8080/")
			.build()
			.expect("Configuration should build.");

		assert_eq!(
			config.resolve("/api/projects").expect("Path should resolve.").as_str(),
			"http://localhost:8080/api/projects",
		);
		assert_eq!(
			config.resolve("https://other.example.com/x").expect("URL should resolve.").as_str(),
			"https://other.example.com/x",
		);
	}
}
