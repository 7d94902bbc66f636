// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Booking event payload.
//!
//! Only the fields bookbridge reads are typed. Everything else is kept in
//! `extra` so the item can be written back to the booking source without
//! losing data. Participant detail blocks stay as raw JSON until
//! normalization so one malformed participant cannot reject the event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
	#[serde(rename = "itemId")]
	pub item_id: String,
	pub item: BookingItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingItem {
	#[serde(default)]
	pub booking_number: String,
	/// "Location: Course Type".
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_time: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_time: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub options: Option<Vec<ProductOption>>,
	#[serde(default)]
	pub participants: Participants,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOption {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participants {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub details: Vec<Value>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetail {
	pub person_details: PersonDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetails {
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub last_name: String,
	#[serde(default)]
	pub email_address: String,
	#[serde(default)]
	pub phone_numbers: Vec<PhoneNumber>,
	#[serde(default)]
	pub street_address: StreetAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumber {
	pub number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreetAddress {
	#[serde(default)]
	pub address1: String,
	#[serde(default)]
	pub address2: String,
	#[serde(default)]
	pub city: String,
	#[serde(default)]
	pub state: String,
	#[serde(default)]
	pub postcode: String,
}

impl BookingEvent {
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

impl BookingItem {
	/// Certification options, in the order the customer answered them.
	pub fn options(&self) -> &[ProductOption] {
		self.options.as_deref().unwrap_or_default()
	}
}
