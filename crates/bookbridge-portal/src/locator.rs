// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Course search and matching.
//!
//! The portal's course grid is searched by date only. Every page is fetched
//! and the rows are reduced to a [`MatchOutcome`] by location and course
//! type. A row whose type equals the requested type outranks rows that
//! merely contain it, so "Basic Life Support" never matches "Basic Life
//! Support Recertification" when an exact offering exists.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::client::{success_text, PortalSession};
use crate::error::PortalError;

const COURSE_SEARCH: &str = "course search";
const PAGE_SIZE: u32 = 10;
/// Upper bound on result pages fetched for one date, whatever the portal
/// reports.
pub const MAX_SEARCH_PAGES: u32 = 20;
/// Course number reported when a row carries none.
const UNNUMBERED_COURSE: &str = "0";

/// What the caller is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseQuery {
	/// Matched verbatim by the portal's free-text search.
	pub date: String,
	pub course_type: String,
	pub location: String,
}

/// A search row reduced to what registration needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseCandidate {
	/// Human-facing course number, echoed into status reports.
	pub course_id: String,
	/// Record id used when binding a participant to the session.
	pub reference_id: String,
	pub course_type_name: String,
	pub location_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
	Single(CourseCandidate),
	None,
	Multiple(usize),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GridSearch<'a> {
	base64_secure_configuration: &'a str,
	sort_expression: &'a str,
	search: &'a str,
	page: u32,
	page_size: u32,
	paging_cookie: &'a str,
	filter: &'a str,
	meta_filter: Option<&'a str>,
	nl_search_filter: &'a str,
	timezone_offset: i32,
	custom_parameters: &'a [Value],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GridPage {
	#[serde(default)]
	records: Vec<GridRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GridRecord {
	#[serde(default)]
	id: String,
	#[serde(default)]
	attributes: Vec<GridAttribute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GridAttribute {
	#[serde(default)]
	name: String,
	#[serde(default)]
	value: Value,
}

impl GridRecord {
	fn candidate(self) -> CourseCandidate {
		let mut candidate = CourseCandidate {
			course_id: UNNUMBERED_COURSE.to_string(),
			reference_id: self.id,
			course_type_name: String::new(),
			location_name: String::new(),
		};
		for attribute in self.attributes {
			let lookup_name = || {
				attribute
					.value
					.get("Name")
					.and_then(Value::as_str)
					.unwrap_or_default()
					.to_string()
			};
			match attribute.name.as_str() {
				"crc_coursetype" => candidate.course_type_name = lookup_name(),
				"crc_facility" => candidate.location_name = lookup_name(),
				"crc_name" => {
					candidate.course_id = match &attribute.value {
						Value::String(s) => s.clone(),
						Value::Null => UNNUMBERED_COURSE.to_string(),
						other => other.to_string(),
					}
				}
				_ => {}
			}
		}
		candidate
	}
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
	!needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
	!b.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Reduces a JSON array of search pages to a [`MatchOutcome`].
///
/// Location matches by case-insensitive containment. Type matches exactly
/// (ignoring case) or, only when no exact match exists at a matching
/// location, by containment. Empty query fields never match.
pub fn select_course(results: &str, query: &CourseQuery) -> Result<MatchOutcome, PortalError> {
	let pages: Vec<GridPage> = serde_json::from_str(results)
		.map_err(|e| PortalError::InvalidResponse(format!("course search results: {e}")))?;

	let mut exact = Vec::new();
	let mut partial = Vec::new();
	let mut total = 0;

	for record in pages.into_iter().flat_map(|page| page.records) {
		total += 1;
		let candidate = record.candidate();
		if !contains_ignore_case(&candidate.location_name, &query.location) {
			continue;
		}
		if eq_ignore_case(&candidate.course_type_name, &query.course_type) {
			exact.push(candidate);
		} else if contains_ignore_case(&candidate.course_type_name, &query.course_type) {
			partial.push(candidate);
		}
	}

	debug!(
		total,
		exact = exact.len(),
		partial = partial.len(),
		"course search rows matched"
	);

	let mut matches = if exact.is_empty() { partial } else { exact };
	Ok(match matches.len() {
		0 => MatchOutcome::None,
		1 => MatchOutcome::Single(matches.remove(0)),
		n => MatchOutcome::Multiple(n),
	})
}

impl PortalSession {
	async fn search_page(&self, date: &str, page: u32) -> Result<String, PortalError> {
		let body = GridSearch {
			base64_secure_configuration: self.secure_configuration().as_str(),
			sort_expression: "crc_startdate ASC",
			search: date,
			page,
			page_size: PAGE_SIZE,
			paging_cookie: "",
			filter: "account",
			meta_filter: None,
			nl_search_filter: "",
			timezone_offset: 0,
			custom_parameters: &[],
		};
		let path = format!("/_services/entity-grid-data.json/{}", self.course_grid_id());
		let response = self
			.api_request(Method::POST, &path)
			.json(&body)
			.send()
			.await?;
		success_text(COURSE_SEARCH, response).await
	}

	/// Fetches every result page for `date` and joins them into one JSON
	/// array, in page order.
	#[instrument(skip(self))]
	pub async fn search_courses(&self, date: &str) -> Result<String, PortalError> {
		let first = self.search_page(date, 1).await?;
		let reported = serde_json::from_str::<Value>(&first)
			.map_err(|e| PortalError::InvalidResponse(format!("course search page 1: {e}")))?
			.get("PageCount")
			.and_then(Value::as_u64)
			.unwrap_or(1);
		let page_count = u32::try_from(reported)
			.unwrap_or(u32::MAX)
			.min(MAX_SEARCH_PAGES);
		if u64::from(page_count) < reported {
			warn!(reported, page_count, "course search page count capped");
		}
		debug!(page_count, "course search pages");

		let mut pages = vec![first];
		for page in 2..=page_count {
			pages.push(self.search_page(date, page).await?);
		}
		Ok(format!("[{}]", pages.join(",")))
	}

	/// Searches for `query.date` and selects the matching course.
	#[instrument(skip(self), fields(date = %query.date, course_type = %query.course_type, location = %query.location))]
	pub async fn locate_course(&self, query: &CourseQuery) -> Result<MatchOutcome, PortalError> {
		let results = self.search_courses(&query.date).await?;
		select_course(&results, query)
	}
}
