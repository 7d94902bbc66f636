// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The portal as seen by the orchestrator.

use async_trait::async_trait;
use bookbridge_portal::{
	Contact, CourseQuery, EnrollmentOutcome, MatchOutcome, NewContact, PortalClient, PortalError,
	PortalSession, ResolvedContact,
};

/// Produces a fresh authenticated session per registration attempt.
#[async_trait]
pub trait RegistrationPortal: Send + Sync {
	type Session: RegistrationSession;

	/// Full login. Never reuses state from an earlier attempt.
	async fn login(&self) -> Result<Self::Session, PortalError>;
}

/// Operations available on an authenticated session.
#[async_trait]
pub trait RegistrationSession: Send + Sync {
	async fn locate_course(&self, query: &CourseQuery) -> Result<MatchOutcome, PortalError>;

	/// Lookup only; used by dry runs.
	async fn find_contact(&self, last_name: &str, email: &str) -> Result<Option<Contact>, PortalError>;

	/// Existing contact for this person, or a newly created one.
	async fn resolve_contact(&self, contact: &NewContact) -> Result<ResolvedContact, PortalError>;

	async fn enroll(
		&self,
		contact_id: &str,
		reference_id: &str,
		certification_code: Option<&str>,
	) -> Result<EnrollmentOutcome, PortalError>;
}

#[async_trait]
impl RegistrationPortal for PortalClient {
	type Session = PortalSession;

	async fn login(&self) -> Result<PortalSession, PortalError> {
		PortalClient::login(self).await
	}
}

#[async_trait]
impl RegistrationSession for PortalSession {
	async fn locate_course(&self, query: &CourseQuery) -> Result<MatchOutcome, PortalError> {
		PortalSession::locate_course(self, query).await
	}

	async fn find_contact(&self, last_name: &str, email: &str) -> Result<Option<Contact>, PortalError> {
		PortalSession::find_contact(self, last_name, email).await
	}

	async fn resolve_contact(&self, contact: &NewContact) -> Result<ResolvedContact, PortalError> {
		PortalSession::resolve_contact(self, contact).await
	}

	async fn enroll(
		&self,
		contact_id: &str,
		reference_id: &str,
		certification_code: Option<&str>,
	) -> Result<EnrollmentOutcome, PortalError> {
		PortalSession::enroll(self, contact_id, reference_id, certification_code).await
	}
}
