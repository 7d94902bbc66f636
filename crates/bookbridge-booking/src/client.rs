// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Booking-source client: writes the registration outcome back onto the
//! booking as its external reference.

use bookbridge_common_http::{is_retryable_status, retry, RetryConfig, RetryableError};
use bookbridge_common_secret::SecretString;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::event::{BookingEvent, BookingItem};

pub const DEFAULT_BASE_URL: &str = "https://api.bookeo.com/v2";

/// Item fields the booking source rejects on update.
const READ_ONLY_FIELDS: &[&str] = &["customer"];

#[derive(Debug, Error)]
pub enum BookingClientError {
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	#[error("Booking API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("Failed to encode booking: {0}")]
	Encode(#[from] serde_json::Error),
}

impl RetryableError for BookingClientError {
	fn is_retryable(&self) -> bool {
		match self {
			BookingClientError::Network(e) => e.is_retryable(),
			BookingClientError::Timeout => true,
			BookingClientError::ApiError { status, .. } => StatusCode::from_u16(*status)
				.map(is_retryable_status)
				.unwrap_or(false),
			BookingClientError::Encode(_) => false,
		}
	}
}

#[derive(Debug, Clone)]
pub struct BookingSourceConfig {
	pub base_url: String,
	pub api_key: SecretString,
	pub secret_key: SecretString,
}

impl BookingSourceConfig {
	pub fn new(api_key: SecretString, secret_key: SecretString) -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			api_key,
			secret_key,
		}
	}
}

#[derive(Debug, Clone)]
pub struct BookingSourceClient {
	http_client: Client,
	config: BookingSourceConfig,
	retry_config: RetryConfig,
}

/// `"<statuses>, myrc: <course id>"`, e.g. `"[Success, Success], myrc: abc"`.
pub fn external_ref(statuses: &[String], course_id: &str) -> String {
	format!("[{}], myrc: {}", statuses.join(", "), course_id)
}

/// Copy of the item ready to be written back: read-only and per-person
/// fields removed, external reference set.
pub fn update_body(item: &BookingItem, external_ref: &str) -> BookingItem {
	let mut item = item.clone();
	item.start_time = None;
	item.end_time = None;
	item.participants.details.clear();
	for field in READ_ONLY_FIELDS {
		item.extra.remove(*field);
	}
	item.extra.insert(
		"externalRef".to_string(),
		serde_json::Value::String(external_ref.to_string()),
	);
	item
}

impl BookingSourceClient {
	pub fn new(config: BookingSourceConfig) -> Result<Self, BookingClientError> {
		let http_client = bookbridge_common_http::builder().build()?;

		Ok(Self {
			http_client,
			config,
			retry_config: RetryConfig::default(),
		})
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	/// Records the per-participant outcome on the booking.
	#[instrument(skip(self, event, statuses), fields(item_id = %event.item_id, booking_number = %event.item.booking_number))]
	pub async fn update_status(
		&self,
		event: &BookingEvent,
		statuses: &[String],
		course_id: &str,
	) -> Result<(), BookingClientError> {
		let body = update_body(&event.item, &external_ref(statuses, course_id));
		let body = serde_json::to_value(&body)?;

		retry(&self.retry_config, |_| self.put_booking(&event.item_id, &body)).await?;
		info!("booking updated with registration outcome");
		Ok(())
	}

	async fn put_booking(
		&self,
		item_id: &str,
		body: &serde_json::Value,
	) -> Result<(), BookingClientError> {
		let url = format!("{}/bookings/{}", self.config.base_url.trim_end_matches('/'), item_id);
		debug!(url = %url, "updating booking");

		let response = self
			.http_client
			.put(&url)
			.query(&[
				("secretKey", self.config.secret_key.as_str()),
				("mode", "backend"),
				("apiKey", self.config.api_key.as_str()),
			])
			.json(body)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					error!("booking update timed out");
					return BookingClientError::Timeout;
				}
				error!(error = %e, "network error during booking update");
				BookingClientError::Network(e)
			})?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			error!(status = status.as_u16(), body = %message, "booking API error");
			return Err(BookingClientError::ApiError {
				status: status.as_u16(),
				message,
			});
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::time::Duration;
	use wiremock::matchers::{body_partial_json, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn event() -> BookingEvent {
		BookingEvent::from_json(
			r#"{
				"itemId": "B-77",
				"item": {
					"bookingNumber": "77",
					"productName": "Cambridge: Standard First Aid Blended",
					"startTime": "2025-12-31T09:00:00",
					"endTime": "2025-12-31T17:00:00",
					"customer": {"id": "c-1"},
					"title": "Group",
					"participants": {
						"numbers": [{"peopleCategoryId": "Cadults", "number": 1}],
						"details": [{"personDetails": {"lastName": "Hopper"}}]
					}
				}
			}"#,
		)
		.unwrap()
	}

	fn client(base_url: &str) -> BookingSourceClient {
		let config = BookingSourceConfig {
			base_url: base_url.to_string(),
			..BookingSourceConfig::new(
				SecretString::new("api".to_string()),
				SecretString::new("secret".to_string()),
			)
		};
		BookingSourceClient::new(config)
			.unwrap()
			.with_retry_config(RetryConfig::fixed(2, Duration::from_millis(1)))
	}

	#[test]
	fn external_ref_lists_statuses_and_course() {
		let statuses = vec!["Success".to_string(), "Failure".to_string()];
		assert_eq!(external_ref(&statuses, "abc"), "[Success, Failure], myrc: abc");
		assert_eq!(external_ref(&[], "N/A"), "[], myrc: N/A");
	}

	#[test]
	fn update_body_strips_read_only_fields() {
		let body = serde_json::to_value(update_body(&event().item, "[Success], myrc: x")).unwrap();

		assert!(body.get("startTime").is_none());
		assert!(body.get("endTime").is_none());
		assert!(body.get("customer").is_none());
		assert!(body["participants"].get("details").is_none());
		assert_eq!(body["participants"]["numbers"][0]["number"], 1);
		assert_eq!(body["title"], "Group");
		assert_eq!(body["externalRef"], "[Success], myrc: x");
	}

	#[tokio::test]
	async fn update_puts_the_stripped_booking() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/bookings/B-77"))
			.and(query_param("secretKey", "secret"))
			.and(query_param("apiKey", "api"))
			.and(query_param("mode", "backend"))
			.and(body_partial_json(json!({"externalRef": "[Success], myrc: course-1"})))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		client(&server.uri())
			.update_status(&event(), &["Success".to_string()], "course-1")
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn client_errors_are_not_retried() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(400).set_body_string("bad booking"))
			.expect(1)
			.mount(&server)
			.await;

		let err = client(&server.uri())
			.update_status(&event(), &["Failure".to_string()], "N/A")
			.await
			.unwrap_err();
		assert!(matches!(err, BookingClientError::ApiError { status: 400, .. }));
	}

	#[tokio::test]
	async fn server_errors_are_retried() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(503))
			.expect(2)
			.mount(&server)
			.await;

		let err = client(&server.uri())
			.update_status(&event(), &["Success".to_string()], "x")
			.await
			.unwrap_err();
		assert!(err.is_retryable());
	}
}
