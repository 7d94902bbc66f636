// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use serde::{Deserialize, Serialize};

use super::prefer;
use crate::error::ConfigError;

fn default_level() -> String {
	"info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Compact,
	Json,
}

impl LogFormat {
	pub fn from_str_value(value: &str) -> Result<Self, ConfigError> {
		match value.to_lowercase().as_str() {
			"pretty" => Ok(LogFormat::Pretty),
			"compact" => Ok(LogFormat::Compact),
			"json" => Ok(LogFormat::Json),
			_ => Err(ConfigError::InvalidValue {
				key: "logging.format".to_string(),
				message: format!("Invalid value: '{value}'. Expected: pretty, compact, json"),
			}),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
	pub format: Option<LogFormat>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		prefer(&mut self.level, other.level);
		prefer(&mut self.format, other.format);
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(default_level),
			format: self.format.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
	/// Level for the `bookbridge` crates when `RUST_LOG` is unset.
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_level(),
			format: LogFormat::default(),
		}
	}
}
