// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Booking event normalization.
//!
//! A [`BookingContext`] is derived once per event (course type, location,
//! date, customer-selected certification level). Each participant block is
//! then turned into an immutable [`ParticipantRecord`], or reported as
//! [`MalformedParticipant`] without affecting its neighbours.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::event::{BookingEvent, ParticipantDetail};

/// Certification level recorded on the enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CertificationLevel {
	A,
	C,
}

impl CertificationLevel {
	/// Option-set code the portal expects.
	pub fn code(self) -> &'static str {
		match self {
			CertificationLevel::A => "171120000",
			CertificationLevel::C => "171120001",
		}
	}
}

/// Option value markers for the customer-selected level. Later options
/// override earlier ones.
const LEVEL_MARKERS: &[(&str, CertificationLevel)] =
	&[("evel A", CertificationLevel::A), ("evel C", CertificationLevel::C)];

/// Option value marker → canonical course type. First match wins.
const OPTION_COURSE_TYPES: &[(&str, &str)] = &[
	("Standard First Aid", "Standard First Aid Blended"),
	("Emergency First Aid", "Emergency First Aid Blended"),
	("AED", "CPR/AED Blended"),
	(
		"Oxygen Therapy",
		"Basic Life Support with Airway Management and Oxygen Therapy",
	),
];

struct ProductRule {
	marker: &'static str,
	course_type: &'static str,
	recertification: Option<&'static str>,
}

/// Product name marker → canonical course type, used when no option named
/// the course. First match wins.
const PRODUCT_RULES: &[ProductRule] = &[
	ProductRule {
		marker: "Babysitter",
		course_type: "Babysitter Course",
		recertification: None,
	},
	ProductRule {
		marker: "Stay Safe",
		course_type: "Stay Safe!",
		recertification: None,
	},
	ProductRule {
		marker: "Basic Life Support",
		course_type: "Basic Life Support",
		recertification: Some("Basic Life Support Recertification"),
	},
	ProductRule {
		marker: "Red Cross First Aid Course",
		course_type: "Standard First Aid Blended",
		recertification: Some("Standard First Aid (Recert)"),
	},
];

const RECERTIFICATION: &str = "Recertification";
const PRIVATE_PREFIX: &str = "Private ";

/// Courses that carry no certification level at all.
const LEVELLESS_COURSES: &[&str] = &["Babysitter", "Stay Safe"];
/// Courses that keep the level the customer picked instead of upgrading to C.
const CUSTOMER_LEVEL_COURSES: &[&str] = &["Recert", "Basic Life Support"];

/// Ordered substring → code table. Fragments skip the first letter so
/// capitalisation of the first character does not matter.
const PROVINCES: &[(&str, &str)] = &[
	("lberta", "AB"),
	("olumbia", "BC"),
	("anitoba", "MB"),
	("runswick", "NB"),
	("abrador", "NL"),
	("ewfoundland", "NL"),
	("erritories", "NT"),
	("cotia", "NS"),
	("unavut", "NU"),
	("ntario", "ON"),
	("sland", "PE"),
	("uebec", "QC"),
	("askatchewan", "SK"),
];
const FALLBACK_PROVINCE: &str = "YT";

/// Maps a province or territory name to its two-letter code. Total: any
/// input without a known fragment maps to `YT`.
pub fn province_code(name: &str) -> &'static str {
	PROVINCES
		.iter()
		.find(|(fragment, _)| name.contains(fragment))
		.map_or(FALLBACK_PROVINCE, |(_, code)| code)
}

/// Formats a phone number as `(NNN) NNN-NNNN` when it has at least ten
/// digits; otherwise returns it unchanged.
pub fn format_phone(raw: &str) -> String {
	let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
	if digits.len() < 10 {
		return raw.to_string();
	}
	format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..10])
}

/// Canonical course type from the course part of the product name and the
/// type already detected from the booking options (empty if none).
pub fn infer_course_type(course_name: &str, option_course_type: &str) -> String {
	if !option_course_type.is_empty() {
		if course_name.contains(RECERTIFICATION) {
			return option_course_type.replace("Blended", "(Recert)");
		}
		return option_course_type.to_string();
	}

	let course_name = course_name
		.strip_prefix(PRIVATE_PREFIX)
		.unwrap_or(course_name);

	PRODUCT_RULES
		.iter()
		.find(|rule| course_name.contains(rule.marker))
		.map_or_else(
			|| course_name.to_string(),
			|rule| match rule.recertification {
				Some(recert) if course_name.contains(RECERTIFICATION) => recert.to_string(),
				_ => rule.course_type.to_string(),
			},
		)
}

fn level_for_course(course_type: &str, customer_level: CertificationLevel) -> Option<CertificationLevel> {
	if LEVELLESS_COURSES.iter().any(|m| course_type.contains(m)) {
		None
	} else if CUSTOMER_LEVEL_COURSES.iter().any(|m| course_type.contains(m)) {
		Some(customer_level)
	} else {
		Some(CertificationLevel::C)
	}
}

/// A participant block that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("participant {index} is malformed: {reason}")]
pub struct MalformedParticipant {
	pub index: usize,
	pub reason: String,
}

/// Normalized, immutable view of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRecord {
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub address_line1: String,
	pub address_line2: String,
	pub city: String,
	pub province: String,
	pub postal_code: String,
	pub phone: String,
	pub course_type: String,
	pub course_location: String,
	/// Matched verbatim against the portal's free-text search.
	pub course_date: String,
	pub certification_level: Option<CertificationLevel>,
}

/// Course information shared by every participant of one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingContext {
	pub booking_number: String,
	pub course_type: String,
	pub course_location: Option<String>,
	pub course_date: Option<String>,
	pub customer_level: CertificationLevel,
}

impl BookingContext {
	/// Derives the course context. `default_location` is used for products
	/// without a "Location: " prefix (virtual courses).
	pub fn from_event(event: &BookingEvent, default_location: &str) -> Self {
		let item = &event.item;
		let mut customer_level = CertificationLevel::C;
		let mut option_course_type = "";

		for option in item
			.options()
			.iter()
			.filter(|o| o.name.contains("Certification"))
		{
			if let Some((_, level)) = LEVEL_MARKERS.iter().find(|(m, _)| option.value.contains(m)) {
				customer_level = *level;
			}
			if let Some((_, course_type)) = OPTION_COURSE_TYPES
				.iter()
				.find(|(m, _)| option.value.contains(m))
			{
				option_course_type = course_type;
			}
		}

		let (course_location, course_type) = match item.product_name.as_deref() {
			Some(product) => match product.split_once(": ") {
				Some((location, course)) => (
					Some(location.to_string()),
					infer_course_type(course, option_course_type),
				),
				None => {
					debug!(product, default_location, "no location prefix in product name");
					(
						Some(default_location.to_string()),
						infer_course_type(product, option_course_type),
					)
				}
			},
			None => (None, option_course_type.to_string()),
		};

		let course_date = item
			.start_time
			.as_deref()
			.map(|start| start.split('T').next().unwrap_or(start).to_string());

		Self {
			booking_number: item.booking_number.clone(),
			course_type,
			course_location,
			course_date,
			customer_level,
		}
	}

	/// Certification level recorded for this booking's course.
	pub fn certification_level(&self) -> Option<CertificationLevel> {
		level_for_course(&self.course_type, self.customer_level)
	}

	/// Builds the record for the participant block at `index`.
	pub fn participant(&self, index: usize, detail: &Value) -> Result<ParticipantRecord, MalformedParticipant> {
		let malformed = |reason: &str| MalformedParticipant {
			index,
			reason: reason.to_string(),
		};

		let course_location = self
			.course_location
			.clone()
			.ok_or_else(|| malformed("booking has no product name"))?;
		let course_date = self
			.course_date
			.clone()
			.ok_or_else(|| malformed("booking has no start time"))?;

		let detail: ParticipantDetail = serde_json::from_value(detail.clone()).map_err(|e| {
			warn!(index, error = %e, "participant block does not match the expected shape");
			malformed(&e.to_string())
		})?;
		let person = detail.person_details;

		if person.last_name.trim().is_empty() || person.email_address.trim().is_empty() {
			return Err(malformed("last name and email are required"));
		}

		let address = person.street_address;
		Ok(ParticipantRecord {
			first_name: person.first_name,
			last_name: person.last_name,
			email: person.email_address,
			address_line1: address.address1,
			address_line2: address.address2,
			city: address.city,
			province: province_code(&address.state).to_string(),
			postal_code: address.postcode,
			phone: person
				.phone_numbers
				.first()
				.map(|p| format_phone(&p.number))
				.unwrap_or_default(),
			course_type: self.course_type.clone(),
			course_location,
			course_date,
			certification_level: self.certification_level(),
		})
	}

	/// Records for every participant, in event order.
	pub fn participants(
		&self,
		event: &BookingEvent,
	) -> Vec<Result<ParticipantRecord, MalformedParticipant>> {
		event
			.item
			.participants
			.details
			.iter()
			.enumerate()
			.map(|(index, detail)| self.participant(index, detail))
			.collect()
	}
}
