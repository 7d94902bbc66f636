// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Where run outcomes go: the booking source and the coordinators' inbox.

use async_trait::async_trait;
use bookbridge_booking::{BookingClientError, BookingEvent, BookingSourceClient};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
	#[error("booking update failed: {0}")]
	BookingUpdate(#[from] BookingClientError),

	#[error("notification failed: {0}")]
	Notification(String),
}

/// Records the per-participant statuses on the booking.
#[async_trait]
pub trait BookingUpdater: Send + Sync {
	async fn update(
		&self,
		event: &BookingEvent,
		statuses: &[String],
		course_id: &str,
	) -> Result<(), ReportError>;
}

#[async_trait]
impl BookingUpdater for BookingSourceClient {
	async fn update(
		&self,
		event: &BookingEvent,
		statuses: &[String],
		course_id: &str,
	) -> Result<(), ReportError> {
		Ok(self.update_status(event, statuses, course_id).await?)
	}
}

/// Used when no booking-source credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBookingUpdater;

#[async_trait]
impl BookingUpdater for LogBookingUpdater {
	async fn update(
		&self,
		event: &BookingEvent,
		statuses: &[String],
		course_id: &str,
	) -> Result<(), ReportError> {
		info!(
			item_id = %event.item_id,
			statuses = ?statuses,
			course_id,
			"booking update (not sent)"
		);
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
	pub subject: String,
	/// Participant order.
	pub statuses: Vec<String>,
	pub booking_number: String,
	pub course_id: String,
	pub course_type: String,
}

impl Notification {
	/// Plain-text body listing the statuses in participant order.
	pub fn body(&self) -> String {
		format!(
			"Status Codes: [{}]\n\
			 Booking Number: {}\n\
			 Course Number: {}\n\
			 Course Type: {}\n\
			 \n\
			 *The status codes show the problems (or successes) each participant\n\
			 in this booking had when being entered. They are in the same order as\n\
			 the participants in the booking.\n",
			self.statuses.join(", "),
			self.booking_number,
			self.course_id,
			self.course_type
		)
	}
}

#[async_trait]
pub trait Notifier: Send + Sync {
	async fn notify(&self, notification: &Notification) -> Result<(), ReportError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
	async fn notify(&self, notification: &Notification) -> Result<(), ReportError> {
		info!(
			subject = %notification.subject,
			booking_number = %notification.booking_number,
			statuses = ?notification.statuses,
			course_id = %notification.course_id,
			course_type = %notification.course_type,
			"notification"
		);
		Ok(())
	}
}
