// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Read;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use bookbridge_booking::{BookingEvent, BookingSourceClient};
use bookbridge_config::BookbridgeConfig;
use bookbridge_portal::{CourseQuery, MatchOutcome, PortalClient, PortalCredentials, PortalSession};
use bookbridge_registrar::Registrar;
use bookbridge_smtp::SmtpNotifier;

/// Reads a booking event from a file, or from stdin for `-`.
pub fn read_event(source: &str) -> Result<BookingEvent> {
	let raw = if source == "-" {
		let mut buf = String::new();
		std::io::stdin()
			.read_to_string(&mut buf)
			.context("failed to read booking event from stdin")?;
		buf
	} else {
		std::fs::read_to_string(source)
			.with_context(|| format!("failed to read booking event from {source}"))?
	};
	BookingEvent::from_json(&raw).context("input is not a booking event")
}

fn credentials(config: &BookbridgeConfig) -> Result<PortalCredentials> {
	config.credentials.clone().context(
		"portal credentials are not configured \
		 (set BOOKBRIDGE_CREDENTIALS_USERNAME and BOOKBRIDGE_CREDENTIALS_PASSWORD)",
	)
}

fn portal_client(config: &BookbridgeConfig) -> Result<PortalClient> {
	Ok(PortalClient::new(config.portal.clone(), credentials(config)?))
}

async fn open_session(config: &BookbridgeConfig, reuse_session: bool) -> Result<PortalSession> {
	let portal = portal_client(config)?;
	let reuse = reuse_session || config.session.reuse;
	if reuse && config.portal.cookie_path.is_none() {
		warn!("session reuse requested but no cookie path is configured");
	}

	let session = if reuse {
		portal.login_or_resume().await
	} else {
		portal.login().await
	};
	session.context("portal login failed")
}

pub async fn register(config: &BookbridgeConfig, event_source: &str, dry_run: bool) -> Result<()> {
	let event = read_event(event_source)?;

	let mut registration = config.registration.clone();
	registration.dry_run |= dry_run;

	let mut registrar = Registrar::new(portal_client(config)?, registration);
	match &config.booking {
		Some(booking) => {
			let client = BookingSourceClient::new(booking.clone())
				.context("failed to build booking source client")?;
			registrar = registrar.with_updater(client);
		}
		None => info!("booking source not configured, updates will only be logged"),
	}
	match &config.smtp {
		Some(smtp) => {
			let notifier =
				SmtpNotifier::from_config(smtp.clone()).context("failed to build SMTP notifier")?;
			registrar = registrar.with_notifier(notifier);
		}
		None => info!("SMTP not configured, notifications will only be logged"),
	}

	let report = registrar.run(&event).await;
	println!("{}", serde_json::to_string_pretty(&report)?);
	Ok(())
}

pub async fn login(config: &BookbridgeConfig, reuse_session: bool) -> Result<()> {
	let session = open_session(config, reuse_session).await?;
	let summary = json!({
		"portal": config.portal.base_url,
		"cookies": session.cookies().len(),
		"cookie_path": config.portal.cookie_path,
	});
	println!("{}", serde_json::to_string_pretty(&summary)?);
	Ok(())
}

pub async fn locate(config: &BookbridgeConfig, query: &CourseQuery, reuse_session: bool) -> Result<()> {
	let session = open_session(config, reuse_session).await?;
	let outcome = session
		.locate_course(query)
		.await
		.context("course search failed")?;
	println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
	Ok(())
}

fn outcome_json(outcome: &MatchOutcome) -> serde_json::Value {
	match outcome {
		MatchOutcome::Single(course) => json!({ "outcome": "single", "course": course }),
		MatchOutcome::None => json!({ "outcome": "none" }),
		MatchOutcome::Multiple(count) => json!({ "outcome": "multiple", "count": count }),
	}
}
