// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Identity handshake.
//!
//! The portal signs users in through a hosted identity provider using a
//! two-step credential flow. The sequence is strictly linear:
//!
//! 1. portal sign-in page (redirects to the provider): csrf + transaction id
//! 2. submit username and password
//! 3. first confirmation: may hand out a fresh csrf + transaction id
//! 4. submit the password again, then wait briefly
//! 5. final confirmation: `state` + `id_token` form values
//! 6. post the form values back to the portal
//! 7. course-management page: secure-configuration blob
//!
//! A session then needs the per-request anti-forgery token from the token
//! endpoint. Step 7 and the token fetch alone are enough to reopen a saved
//! session.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bookbridge_common_secret::SecretString;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::client::{no_cookies, success_text, PortalClient, PortalSession};
use crate::error::PortalError;
use crate::extract::{
	extract_first, API_BASE, CSRF, ID_TOKEN, REQUEST_TOKEN, STATE, TRANSACTION_ID,
	TRANSACTION_ID_ANYWHERE, VIEW_LAYOUTS,
};
use crate::session::CookieJar;

const SIGN_IN_PAGE: &str = "sign-in page";
const CREDENTIAL_SUBMIT: &str = "credential submit";
const SIGN_IN_CONFIRMATION: &str = "sign-in confirmation";
const PASSWORD_SUBMIT: &str = "password submit";
const TOKEN_CONFIRMATION: &str = "token confirmation";
const PORTAL_SIGN_IN: &str = "portal sign-in";
const COURSE_MANAGEMENT: &str = "course management";
const REQUEST_TOKEN_STEP: &str = "request token";

/// Provider settings threaded through steps 2 to 5.
struct Transaction {
	csrf: String,
	id: String,
}

impl Transaction {
	fn tx(&self) -> String {
		format!("StateProperties={}", self.id)
	}
}

struct IdentityTokens {
	state: String,
	id_token: SecretString,
}

#[derive(Deserialize)]
struct ViewLayout {
	#[serde(rename = "Base64SecureConfiguration", default)]
	secure_configuration: Option<String>,
}

/// Reads `[0].Base64SecureConfiguration` from the base64 view-layout blob.
fn decode_secure_configuration(layouts: &str) -> Option<String> {
	let json = STANDARD.decode(layouts.trim()).ok()?;
	let layouts: Vec<ViewLayout> = serde_json::from_slice(&json).ok()?;
	layouts
		.into_iter()
		.next()?
		.secure_configuration
		.filter(|s| !s.is_empty())
}

impl PortalClient {
	/// Full login with a fresh cookie jar.
	#[instrument(skip(self), fields(portal = %self.config.base_url))]
	pub async fn login(&self) -> Result<PortalSession, PortalError> {
		let jar = Arc::new(CookieJar::new());
		let http = self.http_client(Arc::clone(&jar))?;

		let transaction = self.sign_in_page(&http).await?;
		self.submit_credentials(&http, &transaction, true).await?;
		let transaction = self.confirm_sign_in(&http, transaction).await?;
		self.submit_credentials(&http, &transaction, false).await?;
		tokio::time::sleep(self.config.confirm_delay).await;
		let tokens = self.identity_tokens(&http, &transaction).await?;
		self.complete_sign_in(&http, tokens).await?;

		let session = self.open_session(http, jar).await?;
		self.persist(&session);
		info!(cookies = session.cookies().len(), "logged into portal");
		Ok(session)
	}

	/// Reopens a session from a saved cookie jar (step 7 and the token fetch).
	#[instrument(skip(self, jar), fields(portal = %self.config.base_url, cookies = jar.len()))]
	pub async fn resume(&self, jar: CookieJar) -> Result<PortalSession, PortalError> {
		if jar.is_empty() {
			return Err(no_cookies(COURSE_MANAGEMENT));
		}
		let jar = Arc::new(jar);
		let http = self.http_client(Arc::clone(&jar))?;
		let session = self.open_session(http, jar).await?;
		info!("resumed saved portal session");
		Ok(session)
	}

	async fn sign_in_page(&self, http: &Client) -> Result<Transaction, PortalError> {
		let response = http
			.get(self.config.portal_url("/en/SignIn"))
			.query(&[("returnUrl", "/en/")])
			.send()
			.await?;
		let page = success_text(SIGN_IN_PAGE, response).await?;

		if let Some(api) = API_BASE.find(&page) {
			debug!(api = %api, "identity provider api");
		}

		Ok(Transaction {
			csrf: extract_first(&page, &CSRF, SIGN_IN_PAGE)?,
			id: extract_first(&page, &TRANSACTION_ID_ANYWHERE, SIGN_IN_PAGE)?,
		})
	}

	/// Step 2 sends the username too; step 4 only the password.
	async fn submit_credentials(
		&self,
		http: &Client,
		transaction: &Transaction,
		with_username: bool,
	) -> Result<(), PortalError> {
		let step = if with_username {
			CREDENTIAL_SUBMIT
		} else {
			PASSWORD_SUBMIT
		};

		let mut form = vec![("request_type", "RESPONSE")];
		if with_username {
			form.push(("signInName", self.credentials.username.as_str()));
		}
		form.push(("password", self.credentials.password.as_str()));

		let response = http
			.post(self.config.policy_url("/SelfAsserted"))
			.query(&[("tx", transaction.tx().as_str()), ("p", self.config.policy.as_str())])
			.header("X-CSRF-TOKEN", &transaction.csrf)
			.header("X-Requested-With", "XMLHttpRequest")
			.form(&form)
			.send()
			.await?;
		success_text(step, response).await?;
		debug!(step, "credentials accepted");
		Ok(())
	}

	async fn confirmation_page(
		&self,
		http: &Client,
		transaction: &Transaction,
		step: &'static str,
	) -> Result<String, PortalError> {
		let response = http
			.get(self.config.policy_url("/api/CombinedSigninAndSignup/confirmed"))
			.query(&[
				("rememberMe", "false"),
				("csrf_token", transaction.csrf.as_str()),
				("tx", transaction.tx().as_str()),
				("p", self.config.policy.as_str()),
			])
			.send()
			.await?;
		success_text(step, response).await
	}

	async fn confirm_sign_in(
		&self,
		http: &Client,
		transaction: Transaction,
	) -> Result<Transaction, PortalError> {
		let page = self
			.confirmation_page(http, &transaction, SIGN_IN_CONFIRMATION)
			.await?;

		match (CSRF.find(&page), TRANSACTION_ID.find(&page)) {
			(Some(csrf), Some(id)) => {
				debug!("provider issued a new transaction for the password step");
				Ok(Transaction { csrf, id })
			}
			_ => Ok(transaction),
		}
	}

	async fn identity_tokens(
		&self,
		http: &Client,
		transaction: &Transaction,
	) -> Result<IdentityTokens, PortalError> {
		let page = self
			.confirmation_page(http, transaction, TOKEN_CONFIRMATION)
			.await?;

		Ok(IdentityTokens {
			state: extract_first(&page, &STATE, TOKEN_CONFIRMATION)?,
			id_token: SecretString::new(extract_first(&page, &ID_TOKEN, TOKEN_CONFIRMATION)?),
		})
	}

	async fn complete_sign_in(&self, http: &Client, tokens: IdentityTokens) -> Result<(), PortalError> {
		let form = [
			("state", tokens.state.as_str()),
			("id_token", tokens.id_token.as_str()),
		];
		let response = http
			.post(self.config.portal_url("/"))
			.form(&form)
			.send()
			.await?;
		success_text(PORTAL_SIGN_IN, response).await?;
		Ok(())
	}

	pub(crate) async fn open_session(
		&self,
		http: Client,
		jar: Arc<CookieJar>,
	) -> Result<PortalSession, PortalError> {
		let response = http
			.get(self.config.portal_url("/en/CourseManagement/"))
			.send()
			.await?;
		let page = success_text(COURSE_MANAGEMENT, response).await?;
		let layouts = extract_first(&page, &VIEW_LAYOUTS, COURSE_MANAGEMENT)?;
		let secure_configuration =
			decode_secure_configuration(&layouts).ok_or(PortalError::HandshakeParse {
				step: COURSE_MANAGEMENT,
				token: "Base64SecureConfiguration",
			})?;
		debug!(len = secure_configuration.len(), "got secure configuration");

		let response = http
			.get(self.config.portal_url("/_layout/tokenhtml"))
			.send()
			.await?;
		let page = success_text(REQUEST_TOKEN_STEP, response).await?;
		let request_token = extract_first(&page, &REQUEST_TOKEN, REQUEST_TOKEN_STEP)?;

		PortalSession::new(
			http,
			jar,
			&self.config,
			SecretString::new(secure_configuration),
			request_token,
		)
	}
}
