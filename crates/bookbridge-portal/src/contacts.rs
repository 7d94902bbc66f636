// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Contact lookup and creation through the portal's OData API.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::client::{success_text, PortalSession};
use crate::error::PortalError;

const CONTACT_LOOKUP: &str = "contact lookup";
const CONTACTS_PATH: &str = "/_api/contacts";
const CONTACT_FIELDS: &str = "contactid,fullname,birthdate,adx_identity_username,address1_line1,address1_line2,address1_city,address1_stateorprovince,address1_postalcode";

/// A person record owned by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Contact {
	#[serde(rename = "contactid")]
	pub id: String,
	#[serde(rename = "fullname", default)]
	pub full_name: Option<String>,
	#[serde(default)]
	pub address1_line1: Option<String>,
	#[serde(default)]
	pub address1_line2: Option<String>,
	#[serde(default)]
	pub address1_city: Option<String>,
	#[serde(default)]
	pub address1_stateorprovince: Option<String>,
	#[serde(default)]
	pub address1_postalcode: Option<String>,
}

/// Fields written when a contact has to be created. Empty fields are left
/// out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewContact {
	#[serde(rename = "firstname", skip_serializing_if = "String::is_empty")]
	pub first_name: String,
	#[serde(rename = "lastname", skip_serializing_if = "String::is_empty")]
	pub last_name: String,
	#[serde(rename = "emailaddress1", skip_serializing_if = "String::is_empty")]
	pub email: String,
	#[serde(rename = "address1_line1", skip_serializing_if = "String::is_empty")]
	pub address_line1: String,
	#[serde(rename = "address1_line2", skip_serializing_if = "String::is_empty")]
	pub address_line2: String,
	#[serde(rename = "address1_city", skip_serializing_if = "String::is_empty")]
	pub city: String,
	#[serde(rename = "address1_stateorprovince", skip_serializing_if = "String::is_empty")]
	pub province: String,
	#[serde(rename = "address1_postalcode", skip_serializing_if = "String::is_empty")]
	pub postal_code: String,
	#[serde(rename = "telephone1", skip_serializing_if = "String::is_empty")]
	pub phone: String,
}

/// Contact id plus whether this run created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContact {
	pub id: String,
	pub created: bool,
}

#[derive(Deserialize)]
struct ContactList {
	#[serde(default)]
	value: Vec<Contact>,
}

/// Escapes a value for use inside a single-quoted OData string literal.
pub fn escape_odata_literal(value: &str) -> String {
	value.replace('\'', "''")
}

/// Active contacts with exactly this last name and email.
pub fn contact_filter(last_name: &str, email: &str) -> String {
	format!(
		"(lastname eq '{}' and emailaddress1 eq '{}' and statecode eq 0)",
		escape_odata_literal(last_name),
		escape_odata_literal(email)
	)
}

impl PortalSession {
	pub(crate) async fn query_contacts(&self, filter: &str) -> Result<Vec<Contact>, PortalError> {
		let response = self
			.api_request(Method::GET, CONTACTS_PATH)
			.query(&[("$select", CONTACT_FIELDS), ("$filter", filter)])
			.send()
			.await?;
		let body = success_text(CONTACT_LOOKUP, response).await?;
		let list: ContactList = serde_json::from_str(&body)
			.map_err(|e| PortalError::InvalidResponse(format!("contact lookup: {e}")))?;
		Ok(list.value)
	}

	/// First active contact matching last name and email, if any.
	#[instrument(skip_all)]
	pub async fn find_contact(
		&self,
		last_name: &str,
		email: &str,
	) -> Result<Option<Contact>, PortalError> {
		let contacts = self.query_contacts(&contact_filter(last_name, email)).await?;
		debug!(matches = contacts.len(), "contact lookup");
		Ok(contacts.into_iter().next())
	}

	/// Creates a contact and returns its id.
	#[instrument(skip_all)]
	pub async fn create_contact(&self, contact: &NewContact) -> Result<String, PortalError> {
		let response = self
			.api_request(Method::POST, CONTACTS_PATH)
			.json(contact)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			warn!(status = status.as_u16(), "contact creation rejected");
			return Err(PortalError::ContactCreation(format!("HTTP {status}: {body}")));
		}

		let id = response
			.headers()
			.get("entityid")
			.and_then(|v| v.to_str().ok())
			.filter(|v| !v.is_empty())
			.map(str::to_string)
			.ok_or_else(|| PortalError::ContactCreation("response had no entityid header".to_string()))?;
		info!(contact_id = %id, "created contact");
		Ok(id)
	}

	/// Finds the contact for `contact`, creating it when none exists.
	pub async fn resolve_contact(&self, contact: &NewContact) -> Result<ResolvedContact, PortalError> {
		if let Some(existing) = self.find_contact(&contact.last_name, &contact.email).await? {
			debug!(contact_id = %existing.id, "using existing contact");
			return Ok(ResolvedContact {
				id: existing.id,
				created: false,
			});
		}
		Ok(ResolvedContact {
			id: self.create_contact(contact).await?,
			created: true,
		})
	}
}
