// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Per-participant registration results.

use serde::{Serialize, Serializer};
use std::fmt;

/// Outcome recorded for one participant. The status strings are written
/// back to the booking and mailed to coordinators, so they never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationResult {
	Success,
	DryRunSuccess,
	Failure,
	LoginFailed,
	NoCoursesFound,
	MultipleCoursesFound,
	FailedToCreateContact,
	FailedToAddParticipant,
	MalformedData,
}

impl RegistrationResult {
	pub fn as_str(self) -> &'static str {
		match self {
			RegistrationResult::Success => "Success",
			RegistrationResult::DryRunSuccess => "Dry Run Success",
			RegistrationResult::Failure => "Failure",
			RegistrationResult::LoginFailed => "Login Failed",
			RegistrationResult::NoCoursesFound => "No Courses Found",
			RegistrationResult::MultipleCoursesFound => "Multiple Courses Found",
			RegistrationResult::FailedToCreateContact => "Failed to Create Contact",
			RegistrationResult::FailedToAddParticipant => "Failed to Add Participant",
			RegistrationResult::MalformedData => "Malformed Data",
		}
	}

	pub fn is_success(self) -> bool {
		matches!(
			self,
			RegistrationResult::Success | RegistrationResult::DryRunSuccess
		)
	}
}

impl fmt::Display for RegistrationResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for RegistrationResult {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

/// Course matching failures that stop the whole booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchFailure {
	NoCoursesFound,
	MultipleCoursesFound,
}

impl From<MatchFailure> for RegistrationResult {
	fn from(failure: MatchFailure) -> Self {
		match failure {
			MatchFailure::NoCoursesFound => RegistrationResult::NoCoursesFound,
			MatchFailure::MultipleCoursesFound => RegistrationResult::MultipleCoursesFound,
		}
	}
}

/// Status strings in participant order.
pub fn status_strings(results: &[RegistrationResult]) -> Vec<String> {
	results.iter().map(|r| r.as_str().to_string()).collect()
}
