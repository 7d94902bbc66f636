// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Registration portal client.
//!
//! [`PortalClient::login`] runs the identity handshake and returns a
//! [`PortalSession`]. The session then searches for courses
//! ([`PortalSession::locate_course`]), resolves contacts
//! ([`PortalSession::resolve_contact`]) and enrolls them
//! ([`PortalSession::enroll`]).

pub mod client;
pub mod config;
pub mod contacts;
pub mod enrollment;
pub mod error;
pub mod extract;
mod handshake;
pub mod locator;
pub mod session;

pub use client::{PortalClient, PortalSession, REQUEST_TOKEN_HEADER};
pub use config::{PortalConfig, PortalCredentials};
pub use contacts::{contact_filter, escape_odata_literal, Contact, NewContact, ResolvedContact};
pub use enrollment::EnrollmentOutcome;
pub use error::PortalError;
pub use extract::{extract_first, TokenPattern};
pub use locator::{select_course, CourseCandidate, CourseQuery, MatchOutcome, MAX_SEARCH_PAGES};
pub use session::CookieJar;
