// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Registration orchestrator.
//!
//! Participants are registered strictly one after another. Each attempt
//! walks `Init → LoggedIn → CourseLocated → ContactResolved → Enrolled` on
//! a freshly logged-in session; a failed attempt is retried from the top
//! up to the configured bound. Course matching failures are never retried
//! and stop the whole booking: every participant shares the same course,
//! so the remaining ones would fail the same way.

use bookbridge_booking::{BookingContext, BookingEvent, CertificationLevel, ParticipantRecord};
use bookbridge_common_http::{retry, RetryConfig, RetryableError};
use bookbridge_portal::{CourseCandidate, CourseQuery, MatchOutcome, NewContact, PortalError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn, Span};

use crate::portal::{RegistrationPortal, RegistrationSession};
use crate::report::{BookingUpdater, LogBookingUpdater, LogNotifier, Notification, Notifier};
use crate::result::{status_strings, MatchFailure, RegistrationResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_LOCATION: &str = "Cambridge";
/// Course number reported when no course was located.
pub const NO_COURSE_ID: &str = "N/A";

#[derive(Debug, Clone)]
pub struct RegistrarConfig {
	pub retry: RetryConfig,
	/// Stop each attempt after the contact lookup and skip reporting.
	pub dry_run: bool,
	/// Location for products without a "Location: " prefix.
	pub default_location: String,
}

impl Default for RegistrarConfig {
	fn default() -> Self {
		Self {
			retry: RetryConfig::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY),
			dry_run: false,
			default_location: DEFAULT_LOCATION.to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
	Init,
	LoggedIn,
	CourseLocated,
	ContactResolved,
	Enrolled,
}

impl AttemptStage {
	pub fn as_str(self) -> &'static str {
		match self {
			AttemptStage::Init => "init",
			AttemptStage::LoggedIn => "logged_in",
			AttemptStage::CourseLocated => "course_located",
			AttemptStage::ContactResolved => "contact_resolved",
			AttemptStage::Enrolled => "enrolled",
		}
	}
}

impl fmt::Display for AttemptStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Why an attempt stopped.
#[derive(Debug, Error)]
pub enum AttemptError {
	#[error("failed after {stage}: {source}")]
	Portal {
		/// Last stage reached before the failure.
		stage: AttemptStage,
		/// Set once the attempt got past course search.
		course: Option<CourseCandidate>,
		source: PortalError,
	},

	#[error("no courses matched")]
	NoCourse,

	#[error("{0} courses matched")]
	MultipleCourses(usize),
}

impl AttemptError {
	pub fn course(&self) -> Option<&CourseCandidate> {
		match self {
			AttemptError::Portal { course, .. } => course.as_ref(),
			AttemptError::NoCourse | AttemptError::MultipleCourses(_) => None,
		}
	}

	/// Status recorded once retries are exhausted or the error is terminal.
	pub fn result(&self) -> RegistrationResult {
		match self {
			AttemptError::Portal { source, .. } => match source {
				PortalError::HandshakeParse { .. } => RegistrationResult::LoginFailed,
				PortalError::ContactCreation(_) => RegistrationResult::FailedToCreateContact,
				PortalError::Enrollment(_) => RegistrationResult::FailedToAddParticipant,
				_ => RegistrationResult::Failure,
			},
			AttemptError::NoCourse => RegistrationResult::NoCoursesFound,
			AttemptError::MultipleCourses(_) => RegistrationResult::MultipleCoursesFound,
		}
	}
}

impl RetryableError for AttemptError {
	fn is_retryable(&self) -> bool {
		match self {
			AttemptError::Portal { source, .. } => match source {
				PortalError::HandshakeParse { .. }
				| PortalError::HttpStatus { .. }
				| PortalError::ContactCreation(_)
				| PortalError::Enrollment(_) => true,
				other => other.is_retryable(),
			},
			AttemptError::NoCourse | AttemptError::MultipleCourses(_) => false,
		}
	}
}

fn at(stage: AttemptStage) -> impl FnOnce(PortalError) -> AttemptError {
	move |source| AttemptError::Portal {
		stage,
		course: None,
		source,
	}
}

fn with_course(
	stage: AttemptStage,
	course: &CourseCandidate,
) -> impl FnOnce(PortalError) -> AttemptError {
	let course = course.clone();
	move |source| AttemptError::Portal {
		stage,
		course: Some(course),
		source,
	}
}

fn advance(stage: &mut AttemptStage, next: AttemptStage) {
	*stage = next;
	Span::current().record("stage", next.as_str());
	debug!(stage = %next, "attempt advanced");
}

/// What happened to one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantOutcome {
	Registered {
		result: RegistrationResult,
		course: CourseCandidate,
	},
	Failed {
		result: RegistrationResult,
		/// Course located by the final attempt, if it got that far.
		course: Option<CourseCandidate>,
	},
	/// The booking cannot proceed past this participant.
	Aborted(MatchFailure),
}

impl ParticipantOutcome {
	pub fn result(&self) -> RegistrationResult {
		match self {
			ParticipantOutcome::Registered { result, .. } | ParticipantOutcome::Failed { result, .. } => *result,
			ParticipantOutcome::Aborted(failure) => (*failure).into(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
	Completed { all_succeeded: bool },
	Aborted(MatchFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
	pub booking_number: String,
	/// One entry per attempted participant, in event order.
	pub statuses: Vec<RegistrationResult>,
	pub course_id: String,
	pub course_type: String,
	pub outcome: RunOutcome,
}

impl RunReport {
	/// Notification subject: the abort reason, or SUCCESS / FAILURE.
	pub fn subject(&self) -> &'static str {
		match self.outcome {
			RunOutcome::Aborted(failure) => RegistrationResult::from(failure).as_str(),
			RunOutcome::Completed {
				all_succeeded: true,
			} => "SUCCESS",
			RunOutcome::Completed {
				all_succeeded: false,
			} => "FAILURE",
		}
	}

	pub fn status_strings(&self) -> Vec<String> {
		status_strings(&self.statuses)
	}

	pub fn notification(&self) -> Notification {
		Notification {
			subject: self.subject().to_string(),
			statuses: self.status_strings(),
			booking_number: self.booking_number.clone(),
			course_id: self.course_id.clone(),
			course_type: self.course_type.clone(),
		}
	}
}

/// What the event source receives. Always a success: failures are
/// reported through the booking and the notification instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
	pub status_code: u16,
}

impl Acknowledgement {
	pub fn ok() -> Self {
		Self { status_code: 200 }
	}
}

pub fn new_contact(record: &ParticipantRecord) -> NewContact {
	NewContact {
		first_name: record.first_name.clone(),
		last_name: record.last_name.clone(),
		email: record.email.clone(),
		address_line1: record.address_line1.clone(),
		address_line2: record.address_line2.clone(),
		city: record.city.clone(),
		province: record.province.clone(),
		postal_code: record.postal_code.clone(),
		phone: record.phone.clone(),
	}
}

pub fn course_query(record: &ParticipantRecord) -> CourseQuery {
	CourseQuery {
		date: record.course_date.clone(),
		course_type: record.course_type.clone(),
		location: record.course_location.clone(),
	}
}

pub struct Registrar<P> {
	portal: P,
	updater: Box<dyn BookingUpdater>,
	notifier: Box<dyn Notifier>,
	config: RegistrarConfig,
}

impl<P: RegistrationPortal> Registrar<P> {
	/// A registrar that only logs its reports; see [`Registrar::with_updater`]
	/// and [`Registrar::with_notifier`].
	pub fn new(portal: P, config: RegistrarConfig) -> Self {
		Self {
			portal,
			updater: Box::new(LogBookingUpdater),
			notifier: Box::new(LogNotifier),
			config,
		}
	}

	pub fn with_updater(mut self, updater: impl BookingUpdater + 'static) -> Self {
		self.updater = Box::new(updater);
		self
	}

	pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
		self.notifier = Box::new(notifier);
		self
	}

	pub fn config(&self) -> &RegistrarConfig {
		&self.config
	}

	/// Processes a booking event and acknowledges it.
	pub async fn handle(&self, event: &BookingEvent) -> Acknowledgement {
		let report = self.run(event).await;
		info!(
			booking_number = %report.booking_number,
			statuses = ?report.status_strings(),
			subject = report.subject(),
			"booking processed"
		);
		Acknowledgement::ok()
	}

	/// Registers every participant of `event` and reports the outcome.
	#[instrument(skip_all, fields(item_id = %event.item_id, booking_number = %event.item.booking_number, dry_run = self.config.dry_run))]
	pub async fn run(&self, event: &BookingEvent) -> RunReport {
		let context = BookingContext::from_event(event, &self.config.default_location);
		let mut statuses = Vec::new();
		let mut course_id = None;
		let mut outcome = RunOutcome::Completed {
			all_succeeded: true,
		};

		for (index, record) in context.participants(event).into_iter().enumerate() {
			let record = match record {
				Ok(record) => record,
				Err(malformed) => {
					warn!(error = %malformed, "skipping participant");
					statuses.push(RegistrationResult::MalformedData);
					continue;
				}
			};

			let participant = self.register_participant(index, &record).await;
			statuses.push(participant.result());
			match participant {
				ParticipantOutcome::Registered { course, .. }
				| ParticipantOutcome::Failed {
					course: Some(course),
					..
				} => course_id = Some(course.course_id),
				ParticipantOutcome::Failed { course: None, .. } => {}
				ParticipantOutcome::Aborted(failure) => {
					warn!(index, reason = %RegistrationResult::from(failure), "aborting booking");
					outcome = RunOutcome::Aborted(failure);
					break;
				}
			}
		}

		if let RunOutcome::Completed { all_succeeded } = &mut outcome {
			*all_succeeded = statuses.iter().all(|s| s.is_success());
		}

		let report = RunReport {
			booking_number: context.booking_number.clone(),
			statuses,
			course_id: course_id.unwrap_or_else(|| NO_COURSE_ID.to_string()),
			course_type: context.course_type.clone(),
			outcome,
		};
		self.report(event, &report).await;
		report
	}

	/// Registers one participant, retrying failed attempts.
	#[instrument(skip_all, fields(index = index))]
	pub async fn register_participant(
		&self,
		index: usize,
		record: &ParticipantRecord,
	) -> ParticipantOutcome {
		match retry(&self.config.retry, |attempt| self.attempt(attempt, record)).await {
			Ok(course) => {
				let result = if self.config.dry_run {
					RegistrationResult::DryRunSuccess
				} else {
					RegistrationResult::Success
				};
				info!(course_id = %course.course_id, %result, "participant registered");
				ParticipantOutcome::Registered { result, course }
			}
			Err(AttemptError::NoCourse) => ParticipantOutcome::Aborted(MatchFailure::NoCoursesFound),
			Err(AttemptError::MultipleCourses(_)) => {
				ParticipantOutcome::Aborted(MatchFailure::MultipleCoursesFound)
			}
			Err(e) => {
				let result = e.result();
				let course = e.course().cloned();
				error!(
					error = %e,
					%result,
					course_id = course.as_ref().map(|c| c.course_id.as_str()),
					"participant not registered"
				);
				ParticipantOutcome::Failed { result, course }
			}
		}
	}

	#[instrument(skip_all, fields(attempt = attempt, stage = AttemptStage::Init.as_str()))]
	async fn attempt(
		&self,
		attempt: u32,
		record: &ParticipantRecord,
	) -> Result<CourseCandidate, AttemptError> {
		let mut stage = AttemptStage::Init;

		let session = self.portal.login().await.map_err(at(stage))?;
		advance(&mut stage, AttemptStage::LoggedIn);

		let course = match session
			.locate_course(&course_query(record))
			.await
			.map_err(at(stage))?
		{
			MatchOutcome::Single(course) => course,
			MatchOutcome::None => return Err(AttemptError::NoCourse),
			MatchOutcome::Multiple(count) => return Err(AttemptError::MultipleCourses(count)),
		};
		advance(&mut stage, AttemptStage::CourseLocated);

		if self.config.dry_run {
			let existing = session
				.find_contact(&record.last_name, &record.email)
				.await
				.map_err(with_course(stage, &course))?;
			info!(
				course_id = %course.course_id,
				contact_exists = existing.is_some(),
				"dry run: not creating contact or enrolling"
			);
			return Ok(course);
		}

		let contact = session
			.resolve_contact(&new_contact(record))
			.await
			.map_err(with_course(stage, &course))?;
		debug!(contact_id = %contact.id, created = contact.created, "contact resolved");
		advance(&mut stage, AttemptStage::ContactResolved);

		session
			.enroll(
				&contact.id,
				&course.reference_id,
				record.certification_level.map(CertificationLevel::code),
			)
			.await
			.map_err(with_course(stage, &course))?;
		advance(&mut stage, AttemptStage::Enrolled);

		Ok(course)
	}

	async fn report(&self, event: &BookingEvent, report: &RunReport) {
		if self.config.dry_run {
			info!(
				subject = report.subject(),
				statuses = ?report.status_strings(),
				"dry run: skipping booking update and notification"
			);
			return;
		}

		let statuses = report.status_strings();
		if let Err(e) = self.updater.update(event, &statuses, &report.course_id).await {
			error!(error = %e, "could not update booking");
		}
		if let Err(e) = self.notifier.notify(&report.notification()).await {
			error!(error = %e, "could not send notification");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::report::ReportError;
	use async_trait::async_trait;
	use bookbridge_portal::{Contact, EnrollmentOutcome, ResolvedContact};
	use serde_json::json;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{Arc, Mutex};

	/// Scripted portal: every knob describes how the next calls behave.
	struct Script {
		/// Logins that fail with a parse error before logins start working.
		failing_logins: u32,
		login_status: Option<u16>,
		outcome: MatchOutcome,
		existing_contact: bool,
		failing_creates: u32,
		failing_enrollments: u32,
		logins: AtomicU32,
		lookups: AtomicU32,
		creates: AtomicU32,
		enrollments: AtomicU32,
	}

	impl Default for Script {
		fn default() -> Self {
			Self {
				failing_logins: 0,
				login_status: None,
				outcome: MatchOutcome::Single(candidate()),
				existing_contact: false,
				failing_creates: 0,
				failing_enrollments: 0,
				logins: AtomicU32::new(0),
				lookups: AtomicU32::new(0),
				creates: AtomicU32::new(0),
				enrollments: AtomicU32::new(0),
			}
		}
	}

	fn candidate() -> CourseCandidate {
		CourseCandidate {
			course_id: "C-1001".to_string(),
			reference_id: "ref-1".to_string(),
			course_type_name: "Standard First Aid Blended".to_string(),
			location_name: "Cambridge".to_string(),
		}
	}

	struct FakePortal(Arc<Script>);
	struct FakeSession(Arc<Script>);

	#[async_trait]
	impl RegistrationPortal for FakePortal {
		type Session = FakeSession;

		async fn login(&self) -> Result<FakeSession, PortalError> {
			let n = self.0.logins.fetch_add(1, Ordering::SeqCst);
			if let Some(status) = self.0.login_status {
				return Err(PortalError::HttpStatus {
					step: "sign-in page",
					status,
				});
			}
			if n < self.0.failing_logins {
				return Err(PortalError::HandshakeParse {
					step: "token confirmation",
					token: "state",
				});
			}
			Ok(FakeSession(Arc::clone(&self.0)))
		}
	}

	#[async_trait]
	impl RegistrationSession for FakeSession {
		async fn locate_course(&self, _query: &CourseQuery) -> Result<MatchOutcome, PortalError> {
			Ok(self.0.outcome.clone())
		}

		async fn find_contact(&self, _last_name: &str, _email: &str) -> Result<Option<Contact>, PortalError> {
			self.0.lookups.fetch_add(1, Ordering::SeqCst);
			Ok(self.0.existing_contact.then(|| Contact {
				id: "c-existing".to_string(),
				full_name: None,
				address1_line1: None,
				address1_line2: None,
				address1_city: None,
				address1_stateorprovince: None,
				address1_postalcode: None,
			}))
		}

		async fn resolve_contact(&self, contact: &NewContact) -> Result<ResolvedContact, PortalError> {
			if let Some(existing) = self.find_contact(&contact.last_name, &contact.email).await? {
				return Ok(ResolvedContact {
					id: existing.id,
					created: false,
				});
			}
			if self.0.creates.fetch_add(1, Ordering::SeqCst) < self.0.failing_creates {
				return Err(PortalError::ContactCreation("HTTP 400".to_string()));
			}
			Ok(ResolvedContact {
				id: "c-new".to_string(),
				created: true,
			})
		}

		async fn enroll(
			&self,
			_contact_id: &str,
			_reference_id: &str,
			_certification_code: Option<&str>,
		) -> Result<EnrollmentOutcome, PortalError> {
			if self.0.enrollments.fetch_add(1, Ordering::SeqCst) < self.0.failing_enrollments {
				return Err(PortalError::Enrollment("HTTP 400".to_string()));
			}
			Ok(EnrollmentOutcome::Enrolled)
		}
	}

	#[derive(Clone, Default)]
	struct Recorder {
		notifications: Arc<Mutex<Vec<Notification>>>,
		updates: Arc<Mutex<Vec<(Vec<String>, String)>>>,
	}

	#[async_trait]
	impl Notifier for Recorder {
		async fn notify(&self, notification: &Notification) -> Result<(), ReportError> {
			self.notifications.lock().unwrap().push(notification.clone());
			Ok(())
		}
	}

	#[async_trait]
	impl BookingUpdater for Recorder {
		async fn update(
			&self,
			_event: &BookingEvent,
			statuses: &[String],
			course_id: &str,
		) -> Result<(), ReportError> {
			self.updates
				.lock()
				.unwrap()
				.push((statuses.to_vec(), course_id.to_string()));
			Ok(())
		}
	}

	fn registrar(script: Script, dry_run: bool) -> (Registrar<FakePortal>, Arc<Script>, Recorder) {
		let script = Arc::new(script);
		let recorder = Recorder::default();
		let config = RegistrarConfig {
			retry: RetryConfig::fixed(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(1)),
			dry_run,
			..RegistrarConfig::default()
		};
		let registrar = Registrar::new(FakePortal(Arc::clone(&script)), config)
			.with_updater(recorder.clone())
			.with_notifier(recorder.clone());
		(registrar, script, recorder)
	}

	fn person(last_name: &str) -> serde_json::Value {
		json!({"personDetails": {
			"firstName": "Pat",
			"lastName": last_name,
			"emailAddress": format!("{}@example.com", last_name.to_lowercase()),
			"streetAddress": {"state": "Ontario"}
		}})
	}

	fn event(details: Vec<serde_json::Value>) -> BookingEvent {
		serde_json::from_value(json!({
			"itemId": "B-1",
			"item": {
				"bookingNumber": "1001",
				"productName": "Cambridge: Standard First Aid Blended",
				"startTime": "2025-12-31T09:00:00",
				"participants": {"details": details}
			}
		}))
		.unwrap()
	}

	#[tokio::test]
	async fn successful_registration_is_reported() {
		let (registrar, script, recorder) = registrar(Script::default(), false);
		let report = registrar.run(&event(vec![person("Hopper")])).await;

		assert_eq!(report.statuses, vec![RegistrationResult::Success]);
		assert_eq!(report.course_id, "C-1001");
		assert_eq!(report.outcome, RunOutcome::Completed { all_succeeded: true });
		assert_eq!(script.creates.load(Ordering::SeqCst), 1);

		let notifications = recorder.notifications.lock().unwrap();
		assert_eq!(notifications.len(), 1);
		assert_eq!(notifications[0].subject, "SUCCESS");
		assert_eq!(
			*recorder.updates.lock().unwrap(),
			vec![(vec!["Success".to_string()], "C-1001".to_string())]
		);
	}

	#[tokio::test]
	async fn existing_contact_is_not_recreated() {
		let (registrar, script, _) = registrar(
			Script {
				existing_contact: true,
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;
		assert_eq!(report.statuses, vec![RegistrationResult::Success]);
		assert_eq!(script.creates.load(Ordering::SeqCst), 0);
		assert_eq!(script.enrollments.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn login_parse_failures_are_retried_to_the_bound() {
		let (registrar, script, recorder) = registrar(
			Script {
				failing_logins: u32::MAX,
				..Script::default()
			},
			false,
		);
		let report = registrar
			.run(&event(vec![person("Hopper"), person("Lovelace")]))
			.await;

		assert_eq!(
			report.statuses,
			vec![RegistrationResult::LoginFailed, RegistrationResult::LoginFailed]
		);
		assert_eq!(script.logins.load(Ordering::SeqCst), 2 * DEFAULT_MAX_ATTEMPTS);
		assert_eq!(report.course_id, NO_COURSE_ID);
		assert_eq!(recorder.notifications.lock().unwrap()[0].subject, "FAILURE");
	}

	#[tokio::test]
	async fn transient_login_failure_recovers() {
		let (registrar, script, _) = registrar(
			Script {
				failing_logins: 2,
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;
		assert_eq!(report.statuses, vec![RegistrationResult::Success]);
		assert_eq!(script.logins.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn no_course_aborts_the_batch() {
		let (registrar, script, recorder) = registrar(
			Script {
				outcome: MatchOutcome::None,
				..Script::default()
			},
			false,
		);
		let report = registrar
			.run(&event(vec![person("Hopper"), person("Lovelace"), person("Turing")]))
			.await;

		assert_eq!(report.statuses, vec![RegistrationResult::NoCoursesFound]);
		assert_eq!(report.outcome, RunOutcome::Aborted(MatchFailure::NoCoursesFound));
		assert_eq!(script.logins.load(Ordering::SeqCst), 1);

		let notifications = recorder.notifications.lock().unwrap();
		assert_eq!(notifications.len(), 1);
		assert_eq!(notifications[0].subject, "No Courses Found");
		assert_eq!(notifications[0].statuses, vec!["No Courses Found"]);
	}

	#[tokio::test]
	async fn multiple_courses_abort_after_earlier_results() {
		let (registrar, _, recorder) = registrar(
			Script {
				outcome: MatchOutcome::Multiple(2),
				..Script::default()
			},
			false,
		);
		let report = registrar
			.run(&event(vec![json!({"personDetails": {}}), person("Hopper"), person("Turing")]))
			.await;

		assert_eq!(
			report.statuses,
			vec![
				RegistrationResult::MalformedData,
				RegistrationResult::MultipleCoursesFound
			]
		);
		assert_eq!(
			recorder.updates.lock().unwrap()[0].0,
			vec!["Malformed Data", "Multiple Courses Found"]
		);
	}

	#[tokio::test]
	async fn contact_creation_failures_are_retried_then_reported() {
		let (registrar, script, _) = registrar(
			Script {
				failing_creates: u32::MAX,
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;
		assert_eq!(report.statuses, vec![RegistrationResult::FailedToCreateContact]);
		assert_eq!(script.creates.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
		assert_eq!(script.enrollments.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn enrollment_failures_are_retried_then_reported() {
		let (registrar, script, _) = registrar(
			Script {
				failing_enrollments: u32::MAX,
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;
		assert_eq!(report.statuses, vec![RegistrationResult::FailedToAddParticipant]);
		assert_eq!(script.enrollments.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
	}

	#[tokio::test]
	async fn failed_enrollment_still_reports_the_located_course() {
		let (registrar, _, recorder) = registrar(
			Script {
				failing_enrollments: u32::MAX,
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;

		assert_eq!(report.course_id, "C-1001");
		assert_eq!(
			*recorder.updates.lock().unwrap(),
			vec![(vec!["Failed to Add Participant".to_string()], "C-1001".to_string())]
		);
		assert_eq!(recorder.notifications.lock().unwrap()[0].course_id, "C-1001");
	}

	#[tokio::test]
	async fn failed_contact_creation_still_reports_the_located_course() {
		let (registrar, _, _) = registrar(
			Script {
				failing_creates: u32::MAX,
				..Script::default()
			},
			false,
		);
		let event = event(vec![person("Hopper")]);
		let record = BookingContext::from_event(&event, DEFAULT_LOCATION)
			.participants(&event)
			.remove(0)
			.unwrap();
		let outcome = registrar.register_participant(0, &record).await;
		assert_eq!(
			outcome,
			ParticipantOutcome::Failed {
				result: RegistrationResult::FailedToCreateContact,
				course: Some(candidate()),
			}
		);
	}

	#[tokio::test]
	async fn client_error_status_is_retried_up_to_the_bound() {
		let (registrar, script, _) = registrar(
			Script {
				login_status: Some(403),
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;
		assert_eq!(report.statuses, vec![RegistrationResult::Failure]);
		assert_eq!(report.course_id, NO_COURSE_ID);
		assert_eq!(script.logins.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
	}

	#[tokio::test]
	async fn retryable_status_fails_after_the_bound() {
		let (registrar, script, _) = registrar(
			Script {
				login_status: Some(503),
				..Script::default()
			},
			false,
		);
		let report = registrar.run(&event(vec![person("Hopper")])).await;
		assert_eq!(report.statuses, vec![RegistrationResult::Failure]);
		assert_eq!(script.logins.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
	}

	#[tokio::test]
	async fn dry_run_stops_after_lookup_and_skips_reporting() {
		let (registrar, script, recorder) = registrar(Script::default(), true);
		let report = registrar.run(&event(vec![person("Hopper")])).await;

		assert_eq!(report.statuses, vec![RegistrationResult::DryRunSuccess]);
		assert_eq!(script.lookups.load(Ordering::SeqCst), 1);
		assert_eq!(script.creates.load(Ordering::SeqCst), 0);
		assert_eq!(script.enrollments.load(Ordering::SeqCst), 0);
		assert!(recorder.notifications.lock().unwrap().is_empty());
		assert!(recorder.updates.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn malformed_participants_do_not_stop_the_batch() {
		let (registrar, _, _) = registrar(Script::default(), false);
		let report = registrar
			.run(&event(vec![json!("not an object"), person("Hopper")]))
			.await;
		assert_eq!(
			report.statuses,
			vec![RegistrationResult::MalformedData, RegistrationResult::Success]
		);
		assert_eq!(report.outcome, RunOutcome::Completed { all_succeeded: false });
	}

	#[tokio::test]
	async fn handle_always_acknowledges() {
		let (registrar, _, _) = registrar(
			Script {
				failing_logins: u32::MAX,
				..Script::default()
			},
			false,
		);
		let ack = registrar.handle(&event(vec![person("Hopper")])).await;
		assert_eq!(ack, Acknowledgement { status_code: 200 });
	}

	#[test]
	fn classification_table() {
		let portal = |source| AttemptError::Portal {
			stage: AttemptStage::LoggedIn,
			course: None,
			source,
		};
		let parse = portal(PortalError::HandshakeParse {
			step: "course management",
			token: "data-view-layouts",
		});
		assert!(parse.is_retryable());
		assert_eq!(parse.result(), RegistrationResult::LoginFailed);

		let invalid = portal(PortalError::InvalidResponse("not json".to_string()));
		assert!(!invalid.is_retryable());
		assert_eq!(invalid.result(), RegistrationResult::Failure);

		let forbidden = portal(PortalError::HttpStatus {
			step: "course search",
			status: 403,
		});
		assert!(forbidden.is_retryable());
		assert_eq!(forbidden.result(), RegistrationResult::Failure);
		assert_eq!(forbidden.course(), None);

		assert!(!AttemptError::NoCourse.is_retryable());
		assert!(!AttemptError::MultipleCourses(3).is_retryable());
	}
}
