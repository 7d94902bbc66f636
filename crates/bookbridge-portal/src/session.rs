// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cookie jar shared by every request of one portal session.
//!
//! The jar follows the parts of RFC 6265 the portal and its identity
//! provider rely on: `Domain` (host-only when absent), `Path`, `Secure`,
//! `Max-Age` and `Expires`. Expired cookies are dropped when set and never
//! sent. The jar can be written to a JSON file after a successful login and
//! loaded back later.

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, trace};
use url::Url;

use crate::error::PortalError;

/// Domain, then cookie name.
type Cookies = BTreeMap<String, BTreeMap<String, StoredCookie>>;

#[derive(Debug, Default)]
pub struct CookieJar {
	domains: RwLock<Cookies>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
	value: String,
	#[serde(default = "root_path")]
	path: String,
	/// Set without a `Domain` attribute: only the exact host gets it back.
	#[serde(default)]
	host_only: bool,
	#[serde(default)]
	secure: bool,
	/// `None` for session cookies.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires: Option<DateTime<Utc>>,
}

fn root_path() -> String {
	"/".to_string()
}

impl StoredCookie {
	fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires.is_some_and(|at| at <= now)
	}

	fn sent_to(&self, domain: &str, host: &str, url: &Url, now: DateTime<Utc>) -> bool {
		let domain_ok = if self.host_only {
			host == domain
		} else {
			domain_matches(host, domain)
		};
		domain_ok
			&& path_matches(url.path(), &self.path)
			&& (!self.secure || url.scheme() == "https")
			&& !self.is_expired(now)
	}
}

/// One parsed `Set-Cookie` header.
#[derive(Debug, PartialEq, Eq)]
struct SetCookie {
	domain: String,
	name: String,
	/// `None` when the cookie is being expired.
	cookie: Option<StoredCookie>,
}

/// `Expires` in the RFC 1123 form, or the dashed form ASP.NET emits.
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc2822(value)
		.map(|at| at.with_timezone(&Utc))
		.or_else(|_| {
			NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT").map(|at| at.and_utc())
		})
		.ok()
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(url: &Url) -> String {
	let path = url.path();
	match path.rfind('/') {
		Some(0) | None => root_path(),
		Some(end) => path[..end].to_string(),
	}
}

fn parse_set_cookie(header: &str, url: &Url, now: DateTime<Utc>) -> Option<SetCookie> {
	let host = url.host_str()?.to_ascii_lowercase();
	let mut parts = header.split(';');
	let (name, value) = parts.next()?.split_once('=')?;
	let name = name.trim();
	if name.is_empty() {
		return None;
	}

	let mut domain = None;
	let mut path = None;
	let mut secure = false;
	let mut max_age = None;
	let mut expires = None;
	for attribute in parts {
		let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
		let val = val.trim();
		match key.trim().to_ascii_lowercase().as_str() {
			"domain" if !val.is_empty() => {
				domain = Some(val.trim_start_matches('.').to_ascii_lowercase());
			}
			"path" if val.starts_with('/') => path = Some(val.to_string()),
			"secure" => secure = true,
			"max-age" => max_age = val.parse::<i64>().ok(),
			"expires" => expires = parse_cookie_date(val),
			_ => {}
		}
	}

	// A domain the response host does not belong to is refused outright.
	if domain.as_deref().is_some_and(|d| !domain_matches(&host, d)) {
		return None;
	}

	let expires = match max_age {
		Some(age) if age <= 0 => Some(now),
		Some(age) => chrono::Duration::try_seconds(age).and_then(|ttl| now.checked_add_signed(ttl)),
		None => expires,
	};
	let cookie = StoredCookie {
		value: value.trim().to_string(),
		path: path.unwrap_or_else(|| default_path(url)),
		host_only: domain.is_none(),
		secure,
		expires,
	};

	Some(SetCookie {
		domain: domain.unwrap_or(host),
		name: name.to_string(),
		cookie: (!cookie.is_expired(now)).then_some(cookie),
	})
}

fn domain_matches(host: &str, domain: &str) -> bool {
	host == domain
		|| host
			.strip_suffix(domain)
			.is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request: &str, cookie: &str) -> bool {
	request == cookie
		|| (request.starts_with(cookie)
			&& (cookie.ends_with('/') || request[cookie.len()..].starts_with('/')))
}

impl CookieJar {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn clear(&self) {
		self.domains
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.clear();
	}

	/// Number of unexpired cookies across all domains.
	pub fn len(&self) -> usize {
		let now = Utc::now();
		self.domains
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.values()
			.flat_map(BTreeMap::values)
			.filter(|cookie| !cookie.is_expired(now))
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Stores a session cookie for `domain` and its subdomains.
	pub fn insert(&self, domain: &str, name: &str, value: &str) {
		self.domains
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(domain.to_ascii_lowercase())
			.or_default()
			.insert(
				name.to_string(),
				StoredCookie {
					value: value.to_string(),
					path: root_path(),
					host_only: false,
					secure: false,
					expires: None,
				},
			);
	}

	/// Value of `name` as it would be sent to `url`.
	pub fn get(&self, url: &Url, name: &str) -> Option<String> {
		let host = url.host_str()?.to_ascii_lowercase();
		let now = Utc::now();
		self.domains
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.find_map(|(domain, cookies)| {
				cookies
					.get(name)
					.filter(|cookie| cookie.sent_to(domain, &host, url, now))
					.map(|cookie| cookie.value.clone())
			})
	}

	pub fn save(&self, path: &Path) -> Result<(), PortalError> {
		let json = {
			let now = Utc::now();
			let domains = self.domains.read().unwrap_or_else(PoisonError::into_inner);
			let live: Cookies = domains
				.iter()
				.map(|(domain, cookies)| {
					let cookies = cookies
						.iter()
						.filter(|(_, cookie)| !cookie.is_expired(now))
						.map(|(name, cookie)| (name.clone(), cookie.clone()))
						.collect::<BTreeMap<_, _>>();
					(domain.clone(), cookies)
				})
				.filter(|(_, cookies)| !cookies.is_empty())
				.collect();
			serde_json::to_vec_pretty(&live)
				.map_err(|e| PortalError::Session(format!("encode cookies: {e}")))?
		};
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)
				.map_err(|e| PortalError::Session(format!("create {}: {e}", parent.display())))?;
		}
		std::fs::write(path, json)
			.map_err(|e| PortalError::Session(format!("write {}: {e}", path.display())))?;
		debug!(path = %path.display(), cookies = self.len(), "saved session cookies");
		Ok(())
	}

	/// Loads a jar saved by [`CookieJar::save`]. A missing file gives an
	/// empty jar.
	pub fn load(path: &Path) -> Result<Self, PortalError> {
		let bytes = match std::fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
			Err(e) => {
				return Err(PortalError::Session(format!(
					"read {}: {e}",
					path.display()
				)))
			}
		};
		let domains: Cookies = serde_json::from_slice(&bytes)
			.map_err(|e| PortalError::Session(format!("decode {}: {e}", path.display())))?;
		Ok(Self {
			domains: RwLock::new(domains),
		})
	}
}

impl CookieStore for CookieJar {
	fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
		let now = Utc::now();
		let mut domains = self.domains.write().unwrap_or_else(PoisonError::into_inner);
		for header in cookie_headers {
			let Some(set) = header
				.to_str()
				.ok()
				.and_then(|h| parse_set_cookie(h, url, now))
			else {
				continue;
			};
			trace!(domain = %set.domain, name = %set.name, expired = set.cookie.is_none(), "set-cookie");
			match set.cookie {
				Some(cookie) => {
					domains.entry(set.domain).or_default().insert(set.name, cookie);
				}
				None => {
					if let Some(cookies) = domains.get_mut(&set.domain) {
						cookies.remove(&set.name);
					}
				}
			}
		}
	}

	fn cookies(&self, url: &Url) -> Option<HeaderValue> {
		let host = url.host_str()?.to_ascii_lowercase();
		let now = Utc::now();
		let domains = self.domains.read().unwrap_or_else(PoisonError::into_inner);
		let header = domains
			.iter()
			.flat_map(|(domain, cookies)| cookies.iter().map(move |(name, cookie)| (domain, name, cookie)))
			.filter(|(domain, _, cookie)| cookie.sent_to(domain, &host, url, now))
			.map(|(_, name, cookie)| format!("{name}={}", cookie.value))
			.collect::<Vec<_>>()
			.join("; ");
		if header.is_empty() {
			return None;
		}
		HeaderValue::from_str(&header).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	fn set(jar: &CookieJar, at: &str, headers: &[&str]) {
		let values: Vec<HeaderValue> = headers
			.iter()
			.map(|h| HeaderValue::from_str(h).unwrap())
			.collect();
		jar.set_cookies(&mut values.iter(), &url(at));
	}

	#[test]
	fn cookies_are_scoped_to_the_response_host() {
		let jar = CookieJar::new();
		set(&jar, "https://portal.example.org/en/SignIn", &["ASP.NET_SessionId=abc; path=/; HttpOnly"]);

		assert_eq!(
			jar.get(&url("https://portal.example.org/_api/contacts"), "ASP.NET_SessionId").as_deref(),
			Some("abc")
		);
		assert!(jar.cookies(&url("https://login.example.net/")).is_none());
	}

	#[test]
	fn domain_attribute_covers_subdomains() {
		let jar = CookieJar::new();
		set(&jar, "https://idp.example.net/tenant", &["x-ms-cpim-sso=1; Domain=.example.net"]);

		assert!(jar.cookies(&url("https://login.example.net/")).is_some());
		assert!(jar.cookies(&url("https://badexample.net/")).is_none());
	}

	#[test]
	fn cookies_header_joins_pairs() {
		let jar = CookieJar::new();
		set(&jar, "https://portal.example.org/", &["a=1", "b=2; Secure"]);
		let header = jar.cookies(&url("https://portal.example.org/")).unwrap();
		assert_eq!(header.to_str().unwrap(), "a=1; b=2");
	}

	#[test]
	fn non_positive_max_age_removes_the_cookie() {
		let jar = CookieJar::new();
		set(&jar, "https://portal.example.org/", &["session=1"]);
		set(&jar, "https://portal.example.org/", &["session=; Max-Age=0"]);
		assert!(jar.is_empty());
	}

	#[test]
	fn past_expires_removes_the_cookie() {
		let jar = CookieJar::new();
		let portal = "https://portal.example.org/en/SignIn";
		set(&jar, portal, &["ASP.NET_SessionId=abc; path=/; HttpOnly"]);
		set(&jar, portal, &["ASP.NET_SessionId=; expires=Thu, 01 Jan 1970 00:00:00 GMT; path=/"]);

		assert_eq!(jar.get(&url(portal), "ASP.NET_SessionId"), None);
		assert!(jar.cookies(&url(portal)).is_none());
		assert_eq!(jar.len(), 0);
	}

	#[test]
	fn future_expires_keeps_the_cookie() {
		let jar = CookieJar::new();
		set(
			&jar,
			"https://portal.example.org/",
			&[
				"a=1; expires=Fri, 01 Jan 2100 00:00:00 GMT",
				"b=2; expires=Fri, 01-Jan-2100 00:00:00 GMT",
				"c=3; expires=Thu, 01-Jan-1970 00:00:01 GMT",
			],
		);
		let header = jar.cookies(&url("https://portal.example.org/")).unwrap();
		assert_eq!(header.to_str().unwrap(), "a=1; b=2");
	}

	#[test]
	fn host_only_cookies_stay_on_their_host() {
		let jar = CookieJar::new();
		set(&jar, "https://example.org/", &["portal=1"]);

		assert!(jar.cookies(&url("https://example.org/")).is_some());
		assert!(jar.cookies(&url("https://portal.example.org/")).is_none());
	}

	#[test]
	fn foreign_domain_attribute_is_refused() {
		let jar = CookieJar::new();
		set(&jar, "https://portal.example.org/", &["tracking=1; Domain=example.net"]);
		assert!(jar.is_empty());
	}

	#[test]
	fn path_limits_where_a_cookie_is_sent() {
		let jar = CookieJar::new();
		set(&jar, "https://idp.example.net/tenant/policy/SelfAsserted", &["trans=1"]);
		set(&jar, "https://idp.example.net/", &["api=2; Path=/api"]);

		assert_eq!(jar.get(&url("https://idp.example.net/tenant/policy/confirmed"), "trans").as_deref(), Some("1"));
		assert_eq!(jar.get(&url("https://idp.example.net/tenant/other"), "trans"), None);
		assert_eq!(jar.get(&url("https://idp.example.net/api/x"), "api").as_deref(), Some("2"));
		assert_eq!(jar.get(&url("https://idp.example.net/apix"), "api"), None);
	}

	#[test]
	fn secure_cookies_need_https() {
		let jar = CookieJar::new();
		set(&jar, "https://portal.example.org/", &["auth=1; Secure"]);

		assert!(jar.cookies(&url("http://portal.example.org/")).is_none());
		assert!(jar.cookies(&url("https://portal.example.org/")).is_some());
	}

	#[test]
	fn malformed_headers_are_ignored() {
		let jar = CookieJar::new();
		set(&jar, "https://portal.example.org/", &["no-equals-sign", "=orphan", "ok=1"]);
		assert_eq!(jar.len(), 1);
	}

	#[test]
	fn clear_empties_the_jar() {
		let jar = CookieJar::new();
		jar.insert("portal.example.org", "a", "1");
		jar.insert("idp.example.net", "b", "2");
		assert_eq!(jar.len(), 2);
		jar.clear();
		assert!(jar.is_empty());
	}

	#[test]
	fn save_and_load_preserve_cookies() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("cookies.json");

		let jar = CookieJar::new();
		jar.insert("portal.example.org", ".AspNet.ApplicationCookie", "xyz");
		jar.save(&path).unwrap();

		let loaded = CookieJar::load(&path).unwrap();
		assert_eq!(loaded.len(), 1);
		assert_eq!(
			loaded
				.get(&url("https://portal.example.org/"), ".AspNet.ApplicationCookie")
				.as_deref(),
			Some("xyz")
		);
	}

	#[test]
	fn expired_cookies_on_disk_do_not_count() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cookies.json");
		std::fs::write(
			&path,
			r#"{"portal.example.org":{"old":{"value":"1","expires":"2000-01-01T00:00:00Z"},"live":{"value":"2"}}}"#,
		)
		.unwrap();

		let jar = CookieJar::load(&path).unwrap();
		assert_eq!(jar.len(), 1);
		assert_eq!(jar.get(&url("https://portal.example.org/"), "live").as_deref(), Some("2"));
		assert_eq!(jar.get(&url("https://portal.example.org/"), "old"), None);
	}

	#[test]
	fn loading_a_missing_file_gives_an_empty_jar() {
		let dir = tempfile::tempdir().unwrap();
		let jar = CookieJar::load(&dir.path().join("absent.json")).unwrap();
		assert!(jar.is_empty());
	}

	#[test]
	fn loading_garbage_is_a_session_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cookies.json");
		std::fs::write(&path, "not json").unwrap();
		assert!(matches!(CookieJar::load(&path), Err(PortalError::Session(_))));
	}
}
