// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Binds a contact to a course session.

use reqwest::Method;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::client::PortalSession;
use crate::error::PortalError;

const PARTICIPANTS_PATH: &str = "/_api/crc_courseparticipants";
const PARTICIPANT_TYPE: &str = "0";
const PARTICIPANT_STATUS: &str = "171120001";
const ALREADY_REGISTERED: &str = "already registered";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
	Enrolled,
	/// The portal reported the contact was already on the roster.
	AlreadyEnrolled,
}

#[derive(Serialize)]
struct CourseParticipant<'a> {
	#[serde(rename = "crc_attendee@odata.bind")]
	attendee: String,
	#[serde(rename = "crc_coursesession@odata.bind")]
	course_session: String,
	crc_participanttype: &'a str,
	crc_status: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	crc_cprlevel: Option<&'a str>,
}

impl PortalSession {
	/// Enrolls `contact_id` in the course session `reference_id`.
	/// `certification_code` is the portal's level code, if the course has one.
	#[instrument(skip(self))]
	pub async fn enroll(
		&self,
		contact_id: &str,
		reference_id: &str,
		certification_code: Option<&str>,
	) -> Result<EnrollmentOutcome, PortalError> {
		let body = CourseParticipant {
			attendee: format!("/contacts({contact_id})"),
			course_session: format!("/crc_coursesessions({reference_id})"),
			crc_participanttype: PARTICIPANT_TYPE,
			crc_status: PARTICIPANT_STATUS,
			crc_cprlevel: certification_code,
		};

		let response = self
			.api_request(Method::POST, PARTICIPANTS_PATH)
			.json(&body)
			.send()
			.await?;

		let status = response.status();
		if status.is_success() {
			info!("participant enrolled");
			return Ok(EnrollmentOutcome::Enrolled);
		}

		let text = response.text().await.unwrap_or_default();
		if text.to_lowercase().contains(ALREADY_REGISTERED) {
			info!("participant already enrolled");
			return Ok(EnrollmentOutcome::AlreadyEnrolled);
		}

		warn!(status = status.as_u16(), "enrollment rejected");
		Err(PortalError::Enrollment(format!("HTTP {status}: {text}")))
	}
}
