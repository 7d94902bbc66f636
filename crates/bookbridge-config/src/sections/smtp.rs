// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP configuration section for outcome notifications.

use bookbridge_common_secret::SecretString;
use bookbridge_smtp::{is_valid_address, SmtpConfig, SmtpSecurity, DEFAULT_FROM_NAME, DEFAULT_SMTP_PORT};
use serde::{Deserialize, Serialize};

use super::prefer;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<SecretString>,
	pub from_address: Option<String>,
	pub from_name: Option<String>,
	pub recipients: Option<Vec<String>>,
	pub security: Option<SmtpSecurity>,
}

impl SmtpConfigLayer {
	pub fn merge(&mut self, other: SmtpConfigLayer) {
		prefer(&mut self.host, other.host);
		prefer(&mut self.port, other.port);
		prefer(&mut self.username, other.username);
		prefer(&mut self.password, other.password);
		prefer(&mut self.from_address, other.from_address);
		prefer(&mut self.from_name, other.from_name);
		prefer(&mut self.recipients, other.recipients);
		prefer(&mut self.security, other.security);
	}

	pub fn is_configured(&self) -> bool {
		self.host.as_ref().is_some_and(|h| !h.is_empty())
	}

	/// `None` when no host is set. With a host, a sender and at least one
	/// recipient are required.
	pub fn build(self) -> Result<Option<SmtpConfig>, ConfigError> {
		let Some(host) = self.host.filter(|h| !h.is_empty()) else {
			return Ok(None);
		};

		let from_address = self
			.from_address
			.filter(|a| !a.is_empty())
			.ok_or_else(|| {
				ConfigError::Validation("SMTP from_address is required when host is configured".to_string())
			})?;

		let recipients = self.recipients.unwrap_or_default();
		if recipients.is_empty() {
			return Err(ConfigError::Validation(
				"SMTP recipients are required when host is configured".to_string(),
			));
		}
		if let Some(bad) = recipients.iter().find(|r| !is_valid_address(r)) {
			return Err(ConfigError::InvalidValue {
				key: "smtp.recipients".to_string(),
				message: format!("'{bad}' is not an email address"),
			});
		}

		Ok(Some(SmtpConfig {
			host,
			port: self.port.unwrap_or(DEFAULT_SMTP_PORT),
			username: self.username,
			password: self.password,
			from_address,
			from_name: self
				.from_name
				.unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
			recipients,
			security: self.security.unwrap_or_default(),
		}))
	}
}
