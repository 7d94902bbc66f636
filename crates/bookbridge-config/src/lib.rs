// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the registration bot.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`BOOKBRIDGE_<SECTION>_<FIELD>`, secrets also
//!    via `<NAME>_FILE`)
//! 2. Config file (`--config`, else `/etc/bookbridge/config.toml`)
//! 3. Built-in defaults
//!
//! ```ignore
//! use bookbridge_config::load_config;
//!
//! let config = load_config()?;
//! println!("portal at {}", config.portal.base_url);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::BookbridgeConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, ENV_PREFIX, SYSTEM_CONFIG_PATH,
};

use bookbridge_booking::BookingSourceConfig;
use bookbridge_portal::{PortalConfig, PortalCredentials};
use bookbridge_registrar::RegistrarConfig;
use bookbridge_smtp::SmtpConfig;
use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct BookbridgeConfig {
	pub portal: PortalConfig,
	/// Required by every command that talks to the portal.
	pub credentials: Option<PortalCredentials>,
	pub registration: RegistrarConfig,
	pub session: SessionConfig,
	/// Without it booking updates are only logged.
	pub booking: Option<BookingSourceConfig>,
	/// Without it notifications are only logged.
	pub smtp: Option<SmtpConfig>,
	pub logging: LoggingConfig,
}

/// Defaults, then `/etc/bookbridge/config.toml` if present, then the
/// environment.
pub fn load_config() -> Result<BookbridgeConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::default()),
	];
	load_from_sources(sources)
}

/// Like [`load_config`] with an explicit file, which must exist.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<BookbridgeConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::default()),
	];
	load_from_sources(sources)
}

/// Merges `sources` in precedence order and resolves the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<BookbridgeConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = BookbridgeConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: BookbridgeConfigLayer) -> Result<BookbridgeConfig, ConfigError> {
	let session = layer.session.unwrap_or_default().finalize();
	let mut portal = layer.portal.unwrap_or_default().finalize();
	portal.cookie_path = session.cookie_path.clone();

	let credentials = layer.credentials.unwrap_or_default().build()?;
	let registration = layer.registration.unwrap_or_default().build()?;
	let booking = layer.booking.unwrap_or_default().build()?;
	let smtp = layer.smtp.unwrap_or_default().build()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		portal = %portal.base_url,
		credentials_configured = credentials.is_some(),
		max_attempts = registration.retry.max_attempts,
		dry_run = registration.dry_run,
		cookie_path = ?session.cookie_path,
		booking_configured = booking.is_some(),
		smtp_configured = smtp.is_some(),
		"configuration loaded"
	);

	Ok(BookbridgeConfig {
		portal,
		credentials,
		registration,
		session,
		booking,
		smtp,
		logging,
	})
}
