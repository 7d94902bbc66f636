// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for bookbridge.
//!
//! This crate provides:
//! - A pre-configured HTTP client builder that looks like a desktop browser
//!   to the portal and identity provider
//! - Attempt-bounded retry with fixed, linear or exponential backoff

mod client;
mod retry;

pub use client::{builder, BROWSER_USER_AGENT, DEFAULT_TIMEOUT};
pub use retry::{is_retryable_status, retry, Backoff, RetryConfig, RetryableError};
