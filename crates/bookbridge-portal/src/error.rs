// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for the portal client.

use bookbridge_common_http::RetryableError;
use thiserror::Error;

/// Errors that can occur while talking to the portal or identity provider.
#[derive(Debug, Error)]
pub enum PortalError {
	/// Connection, timeout or body I/O failure.
	#[error("Transport error: {0}")]
	Transport(#[from] reqwest::Error),

	/// A step returned a non-success status. Retryable whatever the code:
	/// a rejected step is retried with a fresh login like an I/O failure.
	#[error("{step} returned HTTP {status}")]
	HttpStatus { step: &'static str, status: u16 },

	/// A required token could not be found in a handshake page.
	#[error("could not extract {token} from {step}")]
	HandshakeParse {
		step: &'static str,
		token: &'static str,
	},

	/// A response body was not in the expected shape.
	#[error("Invalid response from portal: {0}")]
	InvalidResponse(String),

	#[error("Failed to create contact: {0}")]
	ContactCreation(String),

	#[error("Failed to add participant: {0}")]
	Enrollment(String),

	/// Cookie file could not be read or written.
	#[error("Session store error: {0}")]
	Session(String),
}

impl RetryableError for PortalError {
	fn is_retryable(&self) -> bool {
		match self {
			PortalError::Transport(_) | PortalError::HttpStatus { .. } => true,
			PortalError::HandshakeParse { .. }
			| PortalError::InvalidResponse(_)
			| PortalError::ContactCreation(_)
			| PortalError::Enrollment(_)
			| PortalError::Session(_) => false,
		}
	}
}
