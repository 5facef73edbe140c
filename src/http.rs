//! Transport primitives for authenticated odot requests.
//!
//! The module exposes the caller-facing [`ApiRequest`]/[`ApiResponse`] value types and the
//! [`SessionHttpClient`] trait, which is the client's only dependency on an HTTP stack. The
//! session manager turns an [`ApiRequest`] into a resolved, credentialed [`HttpCall`] and hands
//! it to the transport; transports never see cookie jars or refresh state.

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{CONTENT_TYPE, SET_COOKIE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError, TransportError},
};
#[cfg(feature = "reqwest")] use crate::config::ClientConfig;

/// Boxed future returned by [`SessionHttpClient::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Abstraction over HTTP transports capable of executing resolved requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// clone of a session manager, and the returned future must be `Send` so refresh futures can be
/// shared across tasks. Transports report network-level failures as [`TransportError`]; any HTTP
/// status (including 401) is a successful [`ApiResponse`].
pub trait SessionHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and buffers the full response body.
	fn execute(&self, call: HttpCall) -> TransportFuture<'_>;
}

/// Request options supplied by callers of the session manager.
///
/// Credentials are never part of these options: the session manager attaches them itself and
/// rejects requests that already carry a `Cookie` or `Authorization` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Relative path (resolved against the configured base URL) or absolute URL.
	pub target: String,
	/// Extra request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request with the provided method and target.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), headers: HeaderMap::new(), body: None }
	}

	/// Creates a `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(Method::GET, target)
	}

	/// Creates a `POST` request.
	pub fn post(target: impl Into<String>) -> Self {
		Self::new(Method::POST, target)
	}

	/// Creates a `PUT` request.
	pub fn put(target: impl Into<String>) -> Self {
		Self::new(Method::PUT, target)
	}

	/// Creates a `DELETE` request.
	pub fn delete(target: impl Into<String>) -> Self {
		Self::new(Method::DELETE, target)
	}

	/// Appends a header, validating the name and value.
	pub fn header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let header_name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| ConfigError::InvalidHeader { name: name.to_owned() })?;
		let header_value = HeaderValue::from_str(value)
			.map_err(|_| ConfigError::InvalidHeader { name: name.to_owned() })?;

		self.headers.append(header_name, header_value);

		Ok(self)
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body and sets `content-type: application/json`.
	pub fn json<T>(mut self, payload: &T) -> Result<Self, DecodeError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(payload)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}
}

/// Fully resolved request handed to a [`SessionHttpClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpCall {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request headers, credentials included.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}

/// Buffered HTTP response returned to callers unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with an empty header map.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for any 2xx status.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` when the server rejected the session.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Lossy UTF-8 view of the body.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the JSON body, reporting the failing path on error.
	pub fn json<T>(&self, target: &str) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de).map_err(|source| DecodeError::ResponseJson {
			target: target.to_owned(),
			status: self.status.as_u16(),
			source,
		})
	}

	/// All `Set-Cookie` header values that are valid UTF-8.
	pub fn set_cookies(&self) -> Vec<String> {
		self.headers
			.get_all(SET_COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.map(ToOwned::to_owned)
			.collect()
	}

	/// Truncated body text used in error messages.
	pub fn body_preview(&self) -> String {
		let text = self.text();

		match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
			Some((idx, _)) => format!("{}...", &text[..idx]),
			None => text,
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Clients built with [`ReqwestHttpClient::from_config`] do not follow redirects: a refresh or
/// API call that bounces to a login page must surface as the original status instead of the
/// HTML of the redirect target.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that applies the configured timeout and disables redirects.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(config.timeout.unsigned_abs())
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl SessionHttpClient for ReqwestHttpClient {
	fn execute(&self, call: HttpCall) -> TransportFuture<'_> {
		Box::pin(async move {
			let HttpCall { method, url, headers, body } = call;
			let mut builder = self.0.request(method, url).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Probe {
		id: i64,
	}

	#[test]
	fn request_builders_validate_headers() {
		let request = ApiRequest::get("/api/projects")
			.header("x-request-id", "abc")
			.expect("Valid header should be accepted.");

		assert_eq!(request.method, Method::GET);
		assert_eq!(request.headers.get("x-request-id").map(|v| v.as_bytes()), Some(&b"abc"[..]));

		let err = ApiRequest::get("/").header("bad header", "x").expect_err("Space is invalid.");

		assert!(matches!(err, ConfigError::InvalidHeader { .. }));
	}

	#[test]
	fn json_body_sets_content_type() {
		let request = ApiRequest::post("/api/projects")
			.json(&serde_json::json!({ "name": "Inbox" }))
			.expect("JSON payload should serialize.");

		assert_eq!(
			request.headers.get(CONTENT_TYPE).map(|v| v.as_bytes()),
			Some(&b"application/json"[..]),
		);
		assert_eq!(request.body.as_deref(), Some(&br#"{"name":"Inbox"}"#[..]));
	}

	#[test]
	fn json_decoding_reports_path() {
		let response = ApiResponse::new(StatusCode::OK, br#"[{"id":1},{"id":"two"}]"#.to_vec());
		let err = response.json::<Vec<Probe>>("/api/projects").expect_err("Second id is a string.");

		match err {
			DecodeError::ResponseJson { target, status, source } => {
				assert_eq!(target, "/api/projects");
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "[1].id");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let ok = ApiResponse::new(StatusCode::OK, br#"{"id":7}"#.to_vec());

		assert_eq!(ok.json::<Probe>("/x").expect("Body should decode."), Probe { id: 7 });
	}

	#[test]
	fn body_preview_truncates_long_bodies() {
		let response = ApiResponse::new(StatusCode::BAD_GATEWAY, "x".repeat(300));
		let preview = response.body_preview();

		assert_eq!(preview.len(), BODY_PREVIEW_LIMIT + 3);
		assert!(preview.ends_with("..."));
	}

	#[test]
	fn set_cookies_collects_every_header() {
		let mut response = ApiResponse::new(StatusCode::OK, Vec::new());

		response.headers.append(SET_COOKIE, HeaderValue::from_static("auth_token=a; Path=/"));
		response.headers.append(SET_COOKIE, HeaderValue::from_static("refresh_token=r; Path=/"));

		assert_eq!(response.set_cookies(), vec!["auth_token=a; Path=/", "refresh_token=r; Path=/"]);
	}
}
