// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry policy, dry-run switch and default course location.

use std::time::Duration;

use bookbridge_common_http::RetryConfig;
use bookbridge_registrar::{RegistrarConfig, DEFAULT_LOCATION, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use serde::{Deserialize, Serialize};

use super::prefer;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationConfigLayer {
	pub max_attempts: Option<u32>,
	pub retry_delay_ms: Option<u64>,
	/// Grow the pause by `retry_delay_ms` after each failed attempt.
	pub linear_backoff: Option<bool>,
	pub dry_run: Option<bool>,
	pub default_location: Option<String>,
}

impl RegistrationConfigLayer {
	pub fn merge(&mut self, other: Self) {
		prefer(&mut self.max_attempts, other.max_attempts);
		prefer(&mut self.retry_delay_ms, other.retry_delay_ms);
		prefer(&mut self.linear_backoff, other.linear_backoff);
		prefer(&mut self.dry_run, other.dry_run);
		prefer(&mut self.default_location, other.default_location);
	}

	pub fn build(self) -> Result<RegistrarConfig, ConfigError> {
		let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
		if max_attempts == 0 {
			return Err(ConfigError::InvalidValue {
				key: "registration.max_attempts".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		let delay = self
			.retry_delay_ms
			.map_or(DEFAULT_RETRY_DELAY, Duration::from_millis);

		let retry = if self.linear_backoff.unwrap_or(false) {
			RetryConfig::linear(max_attempts, delay)
		} else {
			RetryConfig::fixed(max_attempts, delay)
		};

		Ok(RegistrarConfig {
			retry,
			dry_run: self.dry_run.unwrap_or(false),
			default_location: self
				.default_location
				.filter(|l| !l.is_empty())
				.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
		})
	}
}
