// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Booking-to-portal registration pipeline.
//!
//! A [`Registrar`] takes a booking event, normalizes its participants,
//! registers each one through a [`RegistrationPortal`] and reports the
//! ordered status list to a [`BookingUpdater`] and a [`Notifier`].

pub mod orchestrator;
pub mod portal;
pub mod report;
pub mod result;

pub use orchestrator::{
	course_query, new_contact, Acknowledgement, AttemptError, AttemptStage, ParticipantOutcome,
	Registrar, RegistrarConfig, RunOutcome, RunReport, DEFAULT_LOCATION, DEFAULT_MAX_ATTEMPTS,
	DEFAULT_RETRY_DELAY, NO_COURSE_ID,
};
pub use portal::{RegistrationPortal, RegistrationSession};
pub use report::{BookingUpdater, LogBookingUpdater, LogNotifier, Notification, Notifier, ReportError};
pub use result::{MatchFailure, RegistrationResult};
