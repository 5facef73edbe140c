//! Session cookie model, `Set-Cookie` parsing, and the jar shared by the built-in stores.
//!
//! Cookies are scoped to the host (including port) that set them. `Secure` cookies are only sent
//! over https or to loopback hosts, matching how browsers treat `localhost` as a secure context.

// crates.io
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Redacted cookie value wrapper keeping session material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieValue(String);
impl CookieValue {
	/// Wraps a new cookie value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for CookieValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CookieValue").field(&"<redacted>").finish()
	}
}
impl Display for CookieValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Cookie held by a credential store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
	/// Host the cookie was received from; it is only sent back to the same host.
	pub host: String,
	/// Cookie name.
	pub name: String,
	/// Cookie value.
	pub value: CookieValue,
	/// Absolute expiry; `None` keeps the cookie for the lifetime of the store.
	pub expires_at: Option<OffsetDateTime>,
	/// Set with the `Secure` attribute.
	#[serde(default)]
	pub secure: bool,
}
impl SessionCookie {
	/// Returns `true` if the cookie must no longer be sent at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at <= now)
	}

	/// Returns `true` if the cookie may be attached to a request for `url`.
	pub fn is_sendable_to(&self, url: &Url) -> bool {
		!self.secure || url.scheme() == "https" || is_loopback(url)
	}
}

/// Instruction decoded from a single `Set-Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CookieDirective {
	/// Store (or replace) a cookie.
	Set {
		/// Cookie name.
		name: String,
		/// Cookie value.
		value: CookieValue,
		/// Absolute expiry derived from `Max-Age` or `Expires`.
		expires_at: Option<OffsetDateTime>,
		/// `Secure` attribute present.
		secure: bool,
	},
	/// Delete a cookie (empty value, `Max-Age<=0`, or an `Expires` in the past).
	Remove {
		/// Cookie name.
		name: String,
	},
}

/// Parses a `Set-Cookie` header value. Returns `None` for headers without a `name=value` pair.
///
/// `Max-Age` wins over `Expires` when both are present. `Secure` is recorded; `Path`, `Domain`,
/// `HttpOnly`, and `SameSite` are accepted and ignored.
pub fn parse_set_cookie(raw: &str, now: OffsetDateTime) -> Option<CookieDirective> {
	let mut parts = raw.split(';');
	let (name, value) = parts.next()?.split_once('=')?;
	let name = name.trim();

	if name.is_empty() {
		return None;
	}

	let value = value.trim().trim_matches('"');
	let mut max_age = None;
	let mut expires = None;
	let mut secure = false;

	for attribute in parts {
		let (key, attr_value) = attribute.split_once('=').unwrap_or((attribute, ""));
		let key = key.trim();
		let attr_value = attr_value.trim();

		if key.eq_ignore_ascii_case("max-age") {
			max_age = attr_value.parse::<i64>().ok();
		} else if key.eq_ignore_ascii_case("expires") {
			expires = OffsetDateTime::parse(attr_value, &Rfc2822).ok();
		} else if key.eq_ignore_ascii_case("secure") {
			secure = true;
		}
	}

	let expires_at = match max_age {
		Some(secs) if secs <= 0 => return Some(CookieDirective::Remove { name: name.to_owned() }),
		Some(secs) => now.checked_add(Duration::seconds(secs)),
		None => expires,
	};

	if value.is_empty() || expires_at.is_some_and(|at| at <= now) {
		return Some(CookieDirective::Remove { name: name.to_owned() });
	}

	Some(CookieDirective::Set {
		name: name.to_owned(),
		value: CookieValue::new(value),
		expires_at,
		secure,
	})
}

type JarKey = (String, String);

/// In-process cookie map keyed by host + name; wrapped by the concrete stores.
#[derive(Clone, Debug, Default)]
pub(crate) struct CookieJar(BTreeMap<JarKey, SessionCookie>);
impl CookieJar {
	pub(crate) fn from_cookies(cookies: impl IntoIterator<Item = SessionCookie>) -> Self {
		Self(
			cookies
				.into_iter()
				.map(|cookie| ((cookie.host.clone(), cookie.name.clone()), cookie))
				.collect(),
		)
	}

	/// Applies every header and reports whether the jar changed.
	pub(crate) fn absorb(&mut self, url: &Url, set_cookies: &[String], now: OffsetDateTime) -> bool {
		let host = host_of(url);
		let mut changed = false;

		for raw in set_cookies {
			match parse_set_cookie(raw, now) {
				Some(CookieDirective::Set { name, value, expires_at, secure }) => {
					let cookie = SessionCookie {
						host: host.clone(),
						name: name.clone(),
						value,
						expires_at,
						secure,
					};

					self.0.insert((host.clone(), name), cookie);

					changed = true;
				},
				Some(CookieDirective::Remove { name }) => {
					changed |= self.0.remove(&(host.clone(), name)).is_some();
				},
				None => {},
			}
		}

		changed |= self.purge(now);

		changed
	}

	pub(crate) fn cookie_header(&self, url: &Url, now: OffsetDateTime) -> Option<String> {
		let host = host_of(url);
		let pairs = self
			.0
			.values()
			.filter(|cookie| {
				cookie.host == host && !cookie.is_expired_at(now) && cookie.is_sendable_to(url)
			})
			.map(|cookie| format!("{}={}", cookie.name, cookie.value.expose()))
			.collect::<Vec<_>>();

		if pairs.is_empty() { None } else { Some(pairs.join("; ")) }
	}

	pub(crate) fn clear(&mut self) -> bool {
		let changed = !self.0.is_empty();

		self.0.clear();

		changed
	}

	pub(crate) fn cookies(&self) -> Vec<SessionCookie> {
		self.0.values().cloned().collect()
	}

	fn purge(&mut self, now: OffsetDateTime) -> bool {
		let before = self.0.len();

		self.0.retain(|_, cookie| !cookie.is_expired_at(now));

		before != self.0.len()
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn host_of(url: &Url) -> String {
	match (url.host_str(), url.port()) {
		(Some(host), Some(port)) => format!("{host}:{port}"),
		(Some(host), None) => host.to_owned(),
		(None, _) => String::new(),
	}
}
