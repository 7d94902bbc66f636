// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with a browser User-Agent.
//!
//! The identity provider serves its sign-in pages differently to clients it
//! does not recognise as browsers, so every request carries the same
//! desktop User-Agent.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// User-Agent sent on every request.
pub const BROWSER_USER_AGENT: &str =
	"Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Request timeout applied when callers do not choose one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a client builder with the browser User-Agent and default timeout.
///
/// Use this when the client needs more configuration, e.g. a cookie store:
///
/// ```ignore
/// let client = bookbridge_common_http::builder()
///     .cookie_provider(jar)
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(BROWSER_USER_AGENT)
		.timeout(DEFAULT_TIMEOUT)
}
