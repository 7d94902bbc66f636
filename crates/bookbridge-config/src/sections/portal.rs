// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Portal and identity-provider endpoints.

use std::time::Duration;

use bookbridge_portal::PortalConfig;
use serde::{Deserialize, Serialize};

use super::prefer;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortalConfigLayer {
	pub base_url: Option<String>,
	pub identity_url: Option<String>,
	pub tenant: Option<String>,
	pub policy: Option<String>,
	pub course_grid_id: Option<String>,
	pub confirm_delay_ms: Option<u64>,
	pub timeout_secs: Option<u64>,
}

impl PortalConfigLayer {
	pub fn merge(&mut self, other: Self) {
		prefer(&mut self.base_url, other.base_url);
		prefer(&mut self.identity_url, other.identity_url);
		prefer(&mut self.tenant, other.tenant);
		prefer(&mut self.policy, other.policy);
		prefer(&mut self.course_grid_id, other.course_grid_id);
		prefer(&mut self.confirm_delay_ms, other.confirm_delay_ms);
		prefer(&mut self.timeout_secs, other.timeout_secs);
	}

	/// The cookie path comes from the session section and is filled in by
	/// the caller.
	pub fn finalize(self) -> PortalConfig {
		let defaults = PortalConfig::default();
		PortalConfig {
			base_url: self.base_url.unwrap_or(defaults.base_url),
			identity_base_url: self.identity_url.unwrap_or(defaults.identity_base_url),
			tenant: self.tenant.unwrap_or(defaults.tenant),
			policy: self.policy.unwrap_or(defaults.policy),
			course_grid_id: self.course_grid_id.unwrap_or(defaults.course_grid_id),
			confirm_delay: self
				.confirm_delay_ms
				.map_or(defaults.confirm_delay, Duration::from_millis),
			request_timeout: self
				.timeout_secs
				.map_or(defaults.request_timeout, Duration::from_secs),
			cookie_path: None,
		}
	}
}
