// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment
//! variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::{env_bool, env_list, env_parse, env_var, load_secret_env};
use crate::error::ConfigError;
use crate::layer::BookbridgeConfigLayer;
use crate::sections::{
	BookingConfigLayer, CredentialsConfigLayer, LogFormat, LoggingConfigLayer, PortalConfigLayer,
	RegistrationConfigLayer, SessionConfigLayer, SmtpConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/bookbridge/config.toml";
pub const ENV_PREFIX: &str = "BOOKBRIDGE";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<BookbridgeConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<BookbridgeConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(BookbridgeConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// A file the user asked for explicitly; it must exist.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	/// The system-wide file, skipped when absent.
	pub fn system() -> Self {
		Self {
			path: PathBuf::from(SYSTEM_CONFIG_PATH),
			required: false,
		}
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<BookbridgeConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(BookbridgeConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: BookbridgeConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `BOOKBRIDGE_<SECTION>_<FIELD>`. Secrets also accept
/// `<NAME>_FILE`.
pub struct EnvSource {
	prefix: String,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::with_prefix(ENV_PREFIX)
	}
}

impl EnvSource {
	pub fn with_prefix(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	fn key(&self, section: &str, field: &str) -> String {
		format!("{}_{section}_{field}", self.prefix)
	}

	fn string(&self, section: &str, field: &str) -> Option<String> {
		env_var(&self.key(section, field))
	}

	fn load_portal(&self) -> Result<PortalConfigLayer, ConfigError> {
		Ok(PortalConfigLayer {
			base_url: self.string("PORTAL", "BASE_URL"),
			identity_url: self.string("PORTAL", "IDENTITY_URL"),
			tenant: self.string("PORTAL", "TENANT"),
			policy: self.string("PORTAL", "POLICY"),
			course_grid_id: self.string("PORTAL", "COURSE_GRID_ID"),
			confirm_delay_ms: env_parse(&self.key("PORTAL", "CONFIRM_DELAY_MS"), "u64")?,
			timeout_secs: env_parse(&self.key("PORTAL", "TIMEOUT_SECS"), "u64")?,
		})
	}

	fn load_credentials(&self) -> Result<CredentialsConfigLayer, ConfigError> {
		Ok(CredentialsConfigLayer {
			username: self.string("CREDENTIALS", "USERNAME"),
			password: load_secret_env(&self.key("CREDENTIALS", "PASSWORD"))?,
		})
	}

	fn load_registration(&self) -> Result<RegistrationConfigLayer, ConfigError> {
		Ok(RegistrationConfigLayer {
			max_attempts: env_parse(&self.key("REGISTRATION", "MAX_ATTEMPTS"), "u32")?,
			retry_delay_ms: env_parse(&self.key("REGISTRATION", "RETRY_DELAY_MS"), "u64")?,
			linear_backoff: env_bool(&self.key("REGISTRATION", "LINEAR_BACKOFF")),
			dry_run: env_bool(&self.key("REGISTRATION", "DRY_RUN")),
			default_location: self.string("REGISTRATION", "DEFAULT_LOCATION"),
		})
	}

	fn load_session(&self) -> SessionConfigLayer {
		SessionConfigLayer {
			cookie_path: self.string("SESSION", "COOKIE_PATH"),
			reuse: env_bool(&self.key("SESSION", "REUSE")),
		}
	}

	fn load_booking(&self) -> Result<BookingConfigLayer, ConfigError> {
		Ok(BookingConfigLayer {
			base_url: self.string("BOOKING", "BASE_URL"),
			api_key: load_secret_env(&self.key("BOOKING", "API_KEY"))?,
			secret_key: load_secret_env(&self.key("BOOKING", "SECRET_KEY"))?,
		})
	}

	fn load_smtp(&self) -> Result<SmtpConfigLayer, ConfigError> {
		Ok(SmtpConfigLayer {
			host: self.string("SMTP", "HOST"),
			port: env_parse(&self.key("SMTP", "PORT"), "u16")?,
			username: self.string("SMTP", "USERNAME"),
			password: load_secret_env(&self.key("SMTP", "PASSWORD"))?,
			from_address: self.string("SMTP", "FROM_ADDRESS"),
			from_name: self.string("SMTP", "FROM_NAME"),
			recipients: env_list(&self.key("SMTP", "RECIPIENTS")),
			security: env_parse(&self.key("SMTP", "SECURITY"), "SMTP security")?,
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.string("LOG", "LEVEL"),
			format: self
				.string("LOG", "FORMAT")
				.map(|v| LogFormat::from_str_value(&v))
				.transpose()?,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<BookbridgeConfigLayer, ConfigError> {
		debug!(prefix = %self.prefix, "loading environment variables");
		Ok(BookbridgeConfigLayer {
			portal: Some(self.load_portal()?),
			credentials: Some(self.load_credentials()?),
			registration: Some(self.load_registration()?),
			session: Some(self.load_session()),
			booking: Some(self.load_booking()?),
			smtp: Some(self.load_smtp()?),
			logging: Some(self.load_logging()?),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.portal.is_none());
		assert!(layer.smtp.is_none());
	}

	#[test]
	fn test_missing_system_file_is_skipped() {
		let source = TomlSource {
			path: PathBuf::from("/nonexistent/bookbridge/config.toml"),
			required: false,
		};
		assert!(source.load().unwrap().portal.is_none());
	}

	#[test]
	fn test_missing_explicit_file_is_an_error() {
		let source = TomlSource::new("/nonexistent/bookbridge/config.toml");
		assert!(matches!(source.load(), Err(ConfigError::FileRead { .. })));
	}

	#[test]
	fn test_toml_file_is_parsed() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[portal]
base_url = "http://127.0.0.1:9000"

[registration]
max_attempts = 2

[smtp]
host = "smtp.example.com"
recipients = ["a@example.com", "b@example.com"]
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.portal.unwrap().base_url.as_deref(),
			Some("http://127.0.0.1:9000")
		);
		assert_eq!(layer.registration.unwrap().max_attempts, Some(2));
		assert_eq!(layer.smtp.unwrap().recipients.map(|r| r.len()), Some(2));
	}

	#[test]
	fn test_bad_toml_reports_the_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "[portal\nbase_url = 1").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_source_reads_prefixed_variables() {
		let prefix = "BBTEST_ENV_READ";
		std::env::set_var(format!("{prefix}_PORTAL_BASE_URL"), "http://portal.test");
		std::env::set_var(format!("{prefix}_CREDENTIALS_USERNAME"), "bot@example.org");
		std::env::set_var(format!("{prefix}_CREDENTIALS_PASSWORD"), "pa55word");
		std::env::set_var(format!("{prefix}_REGISTRATION_DRY_RUN"), "1");
		std::env::set_var(format!("{prefix}_SMTP_RECIPIENTS"), "a@example.com,b@example.com");
		std::env::set_var(format!("{prefix}_LOG_FORMAT"), "json");

		let layer = EnvSource::with_prefix(prefix).load().unwrap();
		assert_eq!(
			layer.portal.unwrap().base_url.as_deref(),
			Some("http://portal.test")
		);
		let credentials = layer.credentials.unwrap();
		assert_eq!(credentials.username.as_deref(), Some("bot@example.org"));
		assert_eq!(credentials.password.unwrap().expose(), "pa55word");
		assert_eq!(layer.registration.unwrap().dry_run, Some(true));
		assert_eq!(layer.smtp.unwrap().recipients.map(|r| r.len()), Some(2));
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn test_env_source_rejects_bad_numbers() {
		let prefix = "BBTEST_ENV_BAD";
		std::env::set_var(format!("{prefix}_REGISTRATION_MAX_ATTEMPTS"), "four");
		let err = EnvSource::with_prefix(prefix).load().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "BBTEST_ENV_BAD_REGISTRATION_MAX_ATTEMPTS"));
	}
}
