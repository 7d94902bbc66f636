// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Booking-side types for bookbridge.
//!
//! - [`event`]: the booking event as delivered by the booking source
//! - [`normalize`]: turns an event into immutable [`ParticipantRecord`]s
//! - [`client`]: writes the registration outcome back to the booking source

pub mod client;
pub mod event;
pub mod normalize;

pub use client::{BookingClientError, BookingSourceClient, BookingSourceConfig};
pub use event::{BookingEvent, BookingItem, Participants, PersonDetails, ProductOption};
pub use normalize::{
	format_phone, infer_course_type, province_code, BookingContext, CertificationLevel,
	MalformedParticipant, ParticipantRecord,
};
