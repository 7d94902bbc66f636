// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment variable helpers.
//!
//! Secrets follow the `VAR` / `VAR_FILE` convention: a file path in
//! `VAR_FILE` wins over a literal value in `VAR`, which lets container
//! secret mounts supply the portal password or booking keys.

use std::path::PathBuf;
use std::{env, fs};

use bookbridge_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Loads `var` from `{var}_FILE` (one trailing newline stripped) or from
/// `var` itself. `Ok(None)` when neither is set.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(env::var(var).ok().filter(|v| !v.is_empty()).map(SecretString::new))
}

pub(crate) fn env_var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|s| !s.is_empty())
}

pub(crate) fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

pub(crate) fn env_parse<T: std::str::FromStr>(
	name: &str,
	kind: &str,
) -> Result<Option<T>, crate::ConfigError> {
	match env_var(name) {
		Some(v) => v
			.parse()
			.map(Some)
			.map_err(|_| crate::ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
		None => Ok(None),
	}
}

/// Comma-separated list with blanks dropped.
pub(crate) fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn returns_none_when_not_set() {
		let var = "BOOKBRIDGE_TEST_UNSET_SECRET_4471";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
		assert!(load_secret_env(var).unwrap().is_none());
	}

	#[test]
	fn reads_direct_value() {
		let var = "BOOKBRIDGE_TEST_DIRECT_SECRET_4472";
		env::set_var(var, "hunter2");
		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "hunter2");
		env::remove_var(var);
	}

	#[test]
	fn file_wins_over_value_and_loses_one_newline() {
		let var = "BOOKBRIDGE_TEST_FILE_SECRET_4473";
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		env::set_var(var, "from-env");
		env::set_var(format!("{var}_FILE"), file.path());
		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file");

		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let var = "BOOKBRIDGE_TEST_EMPTY_PATH_4474";
		env::set_var(format!("{var}_FILE"), "");
		assert!(matches!(load_secret_env(var), Err(SecretEnvError::EmptyPath { .. })));
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let var = "BOOKBRIDGE_TEST_MISSING_FILE_4475";
		env::set_var(format!("{var}_FILE"), "/nonexistent/bookbridge/secret");
		assert!(matches!(load_secret_env(var), Err(SecretEnvError::Io { .. })));
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn lists_drop_blank_entries() {
		let var = "BOOKBRIDGE_TEST_LIST_4476";
		env::set_var(var, " a@example.com, ,b@example.com ");
		assert_eq!(
			env_list(var),
			Some(vec!["a@example.com".to_string(), "b@example.com".to_string()])
		);
		env::remove_var(var);
	}
}
