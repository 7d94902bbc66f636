// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Portal client and authenticated session.

use bookbridge_common_secret::SecretString;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{PortalConfig, PortalCredentials};
use crate::error::PortalError;
use crate::session::CookieJar;

/// Header carrying the per-request anti-forgery token.
pub const REQUEST_TOKEN_HEADER: &str = "__RequestVerificationToken";

/// Error for a jar holding no live cookie.
pub(crate) fn no_cookies(step: &'static str) -> PortalError {
	PortalError::HandshakeParse {
		step,
		token: "session cookie",
	}
}

/// Logs into the portal. Holds no session state of its own: every login
/// produces a new [`PortalSession`] with its own cookie jar.
#[derive(Debug, Clone)]
pub struct PortalClient {
	pub(crate) config: PortalConfig,
	pub(crate) credentials: PortalCredentials,
}

impl PortalClient {
	pub fn new(config: PortalConfig, credentials: PortalCredentials) -> Self {
		Self {
			config,
			credentials,
		}
	}

	pub fn config(&self) -> &PortalConfig {
		&self.config
	}

	pub(crate) fn http_client(&self, jar: Arc<CookieJar>) -> Result<Client, PortalError> {
		Ok(bookbridge_common_http::builder()
			.cookie_provider(jar)
			.timeout(self.config.request_timeout)
			.build()?)
	}

	/// Writes the session's cookies to the configured cookie file. Failure
	/// is logged, never fatal.
	pub(crate) fn persist(&self, session: &PortalSession) {
		let Some(path) = &self.config.cookie_path else {
			return;
		};
		if let Err(e) = session.cookies().save(path) {
			warn!(error = %e, "could not persist session cookies");
		}
	}

	/// Reuses a persisted session when one is configured and still valid,
	/// otherwise performs a full login.
	pub async fn login_or_resume(&self) -> Result<PortalSession, PortalError> {
		if let Some(path) = &self.config.cookie_path {
			let jar = CookieJar::load(path)?;
			if !jar.is_empty() {
				match self.resume(jar).await {
					Ok(session) => return Ok(session),
					Err(e @ (PortalError::HandshakeParse { .. } | PortalError::HttpStatus { .. })) => {
						debug!(error = %e, "saved session rejected, logging in again");
					}
					Err(e) => return Err(e),
				}
			}
		}
		self.login().await
	}
}

/// An authenticated portal session.
///
/// Only exists with all three parts present: the cookie jar the handshake
/// filled, the secure-configuration blob required by course search, and the
/// anti-forgery token required by API calls.
pub struct PortalSession {
	http: Client,
	jar: Arc<CookieJar>,
	base_url: String,
	course_grid_id: String,
	secure_configuration: SecretString,
	request_token: String,
}

impl std::fmt::Debug for PortalSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PortalSession")
			.field("base_url", &self.base_url)
			.field("cookies", &self.jar.len())
			.field("secure_configuration", &self.secure_configuration)
			.finish_non_exhaustive()
	}
}

impl PortalSession {
	pub(crate) fn new(
		http: Client,
		jar: Arc<CookieJar>,
		config: &PortalConfig,
		secure_configuration: SecretString,
		request_token: String,
	) -> Result<Self, PortalError> {
		if jar.is_empty() {
			return Err(no_cookies("portal sign-in"));
		}
		if secure_configuration.is_empty() {
			return Err(PortalError::HandshakeParse {
				step: "course management",
				token: "Base64SecureConfiguration",
			});
		}
		if request_token.is_empty() {
			return Err(PortalError::HandshakeParse {
				step: "request token",
				token: REQUEST_TOKEN_HEADER,
			});
		}

		Ok(Self {
			http,
			jar,
			base_url: config.base_url.trim_end_matches('/').to_string(),
			course_grid_id: config.course_grid_id.clone(),
			secure_configuration,
			request_token,
		})
	}

	pub fn cookies(&self) -> &CookieJar {
		&self.jar
	}

	pub fn secure_configuration(&self) -> &SecretString {
		&self.secure_configuration
	}

	pub fn request_token(&self) -> &str {
		&self.request_token
	}

	pub(crate) fn course_grid_id(&self) -> &str {
		&self.course_grid_id
	}

	pub(crate) fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Request to a portal API endpoint carrying the anti-forgery token.
	pub(crate) fn api_request(&self, method: Method, path: &str) -> RequestBuilder {
		self.http
			.request(method, self.url(path))
			.header("X-Requested-With", "XMLHttpRequest")
			.header(REQUEST_TOKEN_HEADER, &self.request_token)
	}
}

/// Reads the body of a successful response; any other status is an error
/// naming `step`.
pub(crate) async fn success_text(
	step: &'static str,
	response: Response,
) -> Result<String, PortalError> {
	let status = response.status();
	if !status.is_success() {
		warn!(step, status = status.as_u16(), "unexpected status");
		return Err(PortalError::HttpStatus {
			step,
			status: status.as_u16(),
		});
	}
	Ok(response.text().await?)
}

#[cfg(test)]
pub(crate) fn test_jar() -> CookieJar {
	let jar = CookieJar::new();
	jar.insert("127.0.0.1", ".AspNet.ApplicationCookie", "auth");
	jar
}

#[cfg(test)]
pub(crate) fn test_session(base_url: &str) -> PortalSession {
	let config = PortalConfig {
		base_url: base_url.to_string(),
		..PortalConfig::default()
	};
	PortalSession::new(
		Client::new(),
		Arc::new(test_jar()),
		&config,
		SecretString::new("c2VjdXJlLWNvbmZpZw==".to_string()),
		"rvt-test".to_string(),
	)
	.unwrap()
}
