// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	BookingConfigLayer, CredentialsConfigLayer, LoggingConfigLayer, PortalConfigLayer,
	RegistrationConfigLayer, SessionConfigLayer, SmtpConfigLayer,
};

/// Every field optional so sources can be stacked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookbridgeConfigLayer {
	#[serde(default)]
	pub portal: Option<PortalConfigLayer>,
	#[serde(default)]
	pub credentials: Option<CredentialsConfigLayer>,
	#[serde(default)]
	pub registration: Option<RegistrationConfigLayer>,
	#[serde(default)]
	pub session: Option<SessionConfigLayer>,
	#[serde(default)]
	pub booking: Option<BookingConfigLayer>,
	#[serde(default)]
	pub smtp: Option<SmtpConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl BookbridgeConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: BookbridgeConfigLayer) {
		merge_option(&mut self.portal, other.portal, PortalConfigLayer::merge);
		merge_option(
			&mut self.credentials,
			other.credentials,
			CredentialsConfigLayer::merge,
		);
		merge_option(
			&mut self.registration,
			other.registration,
			RegistrationConfigLayer::merge,
		);
		merge_option(&mut self.session, other.session, SessionConfigLayer::merge);
		merge_option(&mut self.booking, other.booking, BookingConfigLayer::merge);
		merge_option(&mut self.smtp, other.smtp, SmtpConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
