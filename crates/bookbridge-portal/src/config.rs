// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use bookbridge_common_secret::SecretString;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "https://myrc.redcross.ca";
pub const DEFAULT_IDENTITY_URL: &str = "https://crcsb2c.b2clogin.com";
pub const DEFAULT_TENANT: &str = "crcsb2c.onmicrosoft.com";
/// Policy names are case-sensitive.
pub const DEFAULT_POLICY: &str = "B2C_1A_MYRC_SIGNUP_SIGNIN";
pub const DEFAULT_COURSE_GRID_ID: &str = "6d6b3012-e709-4c45-a00d-df4b3befc518";
pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(300);

/// Where the portal and its identity provider live.
#[derive(Debug, Clone)]
pub struct PortalConfig {
	pub base_url: String,
	pub identity_base_url: String,
	pub tenant: String,
	pub policy: String,
	/// Entity grid backing the course search.
	pub course_grid_id: String,
	/// Pause between the second credential submit and the final confirmation.
	pub confirm_delay: Duration,
	pub request_timeout: Duration,
	/// Cookie file written after a successful login.
	pub cookie_path: Option<PathBuf>,
}

impl Default for PortalConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_PORTAL_URL.to_string(),
			identity_base_url: DEFAULT_IDENTITY_URL.to_string(),
			tenant: DEFAULT_TENANT.to_string(),
			policy: DEFAULT_POLICY.to_string(),
			course_grid_id: DEFAULT_COURSE_GRID_ID.to_string(),
			confirm_delay: DEFAULT_CONFIRM_DELAY,
			request_timeout: bookbridge_common_http::DEFAULT_TIMEOUT,
			cookie_path: None,
		}
	}
}

impl PortalConfig {
	pub(crate) fn portal_url(&self, path: &str) -> String {
		format!("{}{}", self.base_url.trim_end_matches('/'), path)
	}

	pub(crate) fn policy_url(&self, path: &str) -> String {
		format!(
			"{}/{}/{}{}",
			self.identity_base_url.trim_end_matches('/'),
			self.tenant,
			self.policy,
			path
		)
	}
}

#[derive(Debug, Clone)]
pub struct PortalCredentials {
	pub username: String,
	pub password: SecretString,
}
