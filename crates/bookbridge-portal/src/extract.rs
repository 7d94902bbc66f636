// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Token extraction from handshake pages.
//!
//! Each token the handshake needs is described by a [`TokenPattern`]: an
//! ordered list of regex variants whose first capture group is the token.
//! The first variant that matches wins. Pages change markup from time to
//! time, so adding a variant is the only change needed when a new shape
//! shows up.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::PortalError;

pub struct TokenPattern {
	pub token: &'static str,
	variants: LazyLock<Vec<Regex>>,
}

impl TokenPattern {
	const fn new(token: &'static str, compile: fn() -> Vec<Regex>) -> Self {
		Self {
			token,
			variants: LazyLock::new(compile),
		}
	}

	/// First capture of the first matching variant.
	pub fn find(&self, text: &str) -> Option<String> {
		self.variants
			.iter()
			.find_map(|re| re.captures(text))
			.and_then(|caps| caps.get(1))
			.map(|m| m.as_str().to_string())
	}
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
	patterns
		.iter()
		.map(|p| Regex::new(p).expect("valid token pattern"))
		.collect()
}

/// Anti-forgery token in the identity provider's settings blob.
pub static CSRF: TokenPattern =
	TokenPattern::new("csrf", || compile(&[r#""csrf"\s*:\s*"([^"]+)""#]));

/// Transaction id as it appears in the settings blob.
pub static TRANSACTION_ID: TokenPattern = TokenPattern::new("transId", || {
	compile(&[r#""transId"\s*:\s*"StateProperties=([^"]+)""#])
});

/// Transaction id from the settings blob, or anywhere in the page.
pub static TRANSACTION_ID_ANYWHERE: TokenPattern = TokenPattern::new("transId", || {
	compile(&[
		r#""transId"\s*:\s*"StateProperties=([^"]+)""#,
		r#"StateProperties=([^"&\s]+)"#,
	])
});

pub static API_BASE: TokenPattern =
	TokenPattern::new("api", || compile(&[r#""api"\s*:\s*"([^"]+)""#]));

pub static STATE: TokenPattern = TokenPattern::new("state", || {
	compile(&[
		r#"name=['"]state['"][^>]*value=['"]([^'"]+)['"]"#,
		r#"id=['"]state['"] value=['"]([^'"]+)['"]"#,
	])
});

pub static ID_TOKEN: TokenPattern = TokenPattern::new("id_token", || {
	compile(&[
		r#"name=['"]id_token['"][^>]*value=['"]([^'"]+)['"]"#,
		r#"id=['"]id_token['"] value=['"]([^'"]+)['"]"#,
	])
});

/// Base64 view-layout blob on the course-management page.
pub static VIEW_LAYOUTS: TokenPattern = TokenPattern::new("data-view-layouts", || {
	compile(&[r#"data-view-layouts=['"]([^'"]+)['"]"#])
});

/// Per-request anti-forgery token served by the token endpoint.
pub static REQUEST_TOKEN: TokenPattern = TokenPattern::new("__RequestVerificationToken", || {
	compile(&[r#"value="([^"]+)""#])
});

/// Extracts `pattern` from `text`, failing with a parse error naming `step`.
pub fn extract_first(
	text: &str,
	pattern: &TokenPattern,
	step: &'static str,
) -> Result<String, PortalError> {
	pattern.find(text).ok_or(PortalError::HandshakeParse {
		step,
		token: pattern.token,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const SIGN_IN_PAGE: &str = r#"<script>var SETTINGS = {"remoteResource":"x","csrf":"Y3NyZi10b2tlbg==","transId":"StateProperties=eyJUSUQiOiIxMjMifQ","api":"CombinedSigninAndSignup"};</script>"#;

	#[test]
	fn settings_blob_tokens_are_found() {
		assert_eq!(CSRF.find(SIGN_IN_PAGE).as_deref(), Some("Y3NyZi10b2tlbg=="));
		assert_eq!(
			TRANSACTION_ID.find(SIGN_IN_PAGE).as_deref(),
			Some("eyJUSUQiOiIxMjMifQ")
		);
		assert_eq!(
			API_BASE.find(SIGN_IN_PAGE).as_deref(),
			Some("CombinedSigninAndSignup")
		);
	}

	#[test]
	fn bare_transaction_id_is_a_fallback() {
		let page = r#"<form action="/SelfAsserted?tx=StateProperties=abc123&p=B2C_1A"></form>"#;
		assert_eq!(TRANSACTION_ID.find(page), None);
		assert_eq!(TRANSACTION_ID_ANYWHERE.find(page).as_deref(), Some("abc123"));
	}

	#[test]
	fn settings_blob_wins_over_bare_transaction_id() {
		let page = r#"?tx=StateProperties=from-url&x=1 {"transId":"StateProperties=from-blob"}"#;
		assert_eq!(TRANSACTION_ID_ANYWHERE.find(page).as_deref(), Some("from-blob"));
	}

	#[test]
	fn form_values_are_found_by_name_then_id() {
		let by_name = r#"<input type='hidden' name='state' value='st-1'/><input type="hidden" name="id_token" value="jwt.1"/>"#;
		assert_eq!(STATE.find(by_name).as_deref(), Some("st-1"));
		assert_eq!(ID_TOKEN.find(by_name).as_deref(), Some("jwt.1"));

		let by_id = r#"<input id="state" value="st-2"><input id='id_token' value='jwt.2'>"#;
		assert_eq!(STATE.find(by_id).as_deref(), Some("st-2"));
		assert_eq!(ID_TOKEN.find(by_id).as_deref(), Some("jwt.2"));
	}

	#[test]
	fn view_layouts_accept_either_quote() {
		assert_eq!(
			VIEW_LAYOUTS.find(r#"<div data-view-layouts="W3t9XQ=="></div>"#).as_deref(),
			Some("W3t9XQ==")
		);
		assert_eq!(
			VIEW_LAYOUTS.find("<div data-view-layouts='W3t9XQ=='></div>").as_deref(),
			Some("W3t9XQ==")
		);
	}

	#[test]
	fn missing_token_is_a_parse_error() {
		let err = extract_first("<html>maintenance</html>", &STATE, "token confirmation").unwrap_err();
		assert!(matches!(
			err,
			PortalError::HandshakeParse {
				step: "token confirmation",
				token: "state"
			}
		));
	}

	#[test]
	fn request_token_is_read_from_the_input_value() {
		let html = r#"<input name="__RequestVerificationToken" type="hidden" value="rvt-42" />"#;
		assert_eq!(
			extract_first(html, &REQUEST_TOKEN, "request token").unwrap(),
			"rvt-42"
		);
	}

	proptest! {
		#[test]
		fn csrf_round_trips_through_the_settings_blob(token in "[A-Za-z0-9+/=_-]{1,64}") {
			let page = format!(r#"{{"csrf" : "{token}","transId":"StateProperties=x"}}"#);
			prop_assert_eq!(CSRF.find(&page), Some(token));
		}
	}
}
