// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cookie persistence between runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::prefer;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionConfigLayer {
	pub cookie_path: Option<String>,
	pub reuse: Option<bool>,
}

impl SessionConfigLayer {
	pub fn merge(&mut self, other: Self) {
		prefer(&mut self.cookie_path, other.cookie_path);
		prefer(&mut self.reuse, other.reuse);
	}

	pub fn finalize(self) -> SessionConfig {
		SessionConfig {
			cookie_path: self.cookie_path.filter(|p| !p.is_empty()).map(PathBuf::from),
			reuse: self.reuse.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
	/// Cookies are saved here after every login when set.
	pub cookie_path: Option<PathBuf>,
	/// Try the saved cookies before a full login (diagnostic commands only).
	pub reuse: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_path_means_no_persistence() {
		let config = SessionConfigLayer {
			cookie_path: Some(String::new()),
			reuse: None,
		}
		.finalize();
		assert_eq!(config, SessionConfig::default());
	}
}
