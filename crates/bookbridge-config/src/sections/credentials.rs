// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Portal account used for every login.

use bookbridge_common_secret::SecretString;
use bookbridge_portal::PortalCredentials;
use serde::{Deserialize, Serialize};

use super::prefer;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfigLayer {
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<SecretString>,
}

impl CredentialsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		prefer(&mut self.username, other.username);
		prefer(&mut self.password, other.password);
	}

	/// `None` when neither field is set; an error when only one is.
	pub fn build(self) -> Result<Option<PortalCredentials>, ConfigError> {
		let username = self.username.filter(|u| !u.is_empty());
		let password = self.password.filter(|p| !p.is_empty());
		match (username, password) {
			(None, None) => Ok(None),
			(Some(username), Some(password)) => Ok(Some(PortalCredentials { username, password })),
			(None, Some(_)) => Err(ConfigError::Missing("credentials.username".to_string())),
			(Some(_), None) => Err(ConfigError::Missing("credentials.password".to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn absent_credentials_are_not_an_error() {
		assert!(CredentialsConfigLayer::default().build().unwrap().is_none());
	}

	#[test]
	fn half_configured_credentials_are_rejected() {
		let layer = CredentialsConfigLayer {
			username: Some("coordinator@example.org".to_string()),
			password: None,
		};
		assert!(matches!(layer.build(), Err(ConfigError::Missing(ref f)) if f == "credentials.password"));
	}

	#[test]
	fn password_is_not_serialized() {
		let layer = CredentialsConfigLayer {
			username: Some("coordinator@example.org".to_string()),
			password: Some(SecretString::new("pa55word".to_string())),
		};
		let json = serde_json::to_string(&layer).unwrap();
		assert!(!json.contains("pa55word"));
		assert!(!json.contains("password"));
	}
}
