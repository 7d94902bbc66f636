// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod booking;
pub mod credentials;
pub mod logging;
pub mod portal;
pub mod registration;
pub mod session;
pub mod smtp;

pub use booking::BookingConfigLayer;
pub use credentials::CredentialsConfigLayer;
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use portal::PortalConfigLayer;
pub use registration::RegistrationConfigLayer;
pub use session::{SessionConfig, SessionConfigLayer};
pub use smtp::SmtpConfigLayer;

/// Field-level merge: a value set by the higher-precedence layer wins.
pub(crate) fn prefer<T>(slot: &mut Option<T>, other: Option<T>) {
	if other.is_some() {
		*slot = other;
	}
}
