// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Booking-source API keys for the status write-back.

use bookbridge_booking::BookingSourceConfig;
use bookbridge_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use super::prefer;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingConfigLayer {
	pub base_url: Option<String>,
	#[serde(skip_serializing)]
	pub api_key: Option<SecretString>,
	#[serde(skip_serializing)]
	pub secret_key: Option<SecretString>,
}

impl BookingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		prefer(&mut self.base_url, other.base_url);
		prefer(&mut self.api_key, other.api_key);
		prefer(&mut self.secret_key, other.secret_key);
	}

	/// `None` without keys: status updates are then only logged.
	pub fn build(self) -> Result<Option<BookingSourceConfig>, ConfigError> {
		match (self.api_key, self.secret_key) {
			(None, None) => Ok(None),
			(Some(api_key), Some(secret_key)) => {
				let mut config = BookingSourceConfig::new(api_key, secret_key);
				if let Some(base_url) = self.base_url.filter(|u| !u.is_empty()) {
					config.base_url = base_url;
				}
				Ok(Some(config))
			}
			(None, Some(_)) => Err(ConfigError::Missing("booking.api_key".to_string())),
			(Some(_), None) => Err(ConfigError::Missing("booking.secret_key".to_string())),
		}
	}
}
