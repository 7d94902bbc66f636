// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded retry for portal and booking-source calls.
//!
//! A registration attempt is retried as a whole (fresh login included), so
//! the policy is expressed in attempts rather than in requests: `retry`
//! hands the closure a 1-based attempt number and sleeps between attempts
//! according to [`Backoff`].

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How the pause grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
	/// `delay` before every retry.
	Fixed,
	/// `delay * n` before retry `n`.
	Linear,
	/// `delay * factor^(n-1)`, never more than `max`.
	Exponential { factor: f64, max: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub delay: Duration,
	pub backoff: Backoff,
	/// Scale each pause by a random factor in `[0.5, 1.5)`.
	pub jitter: bool,
}

impl Default for RetryConfig {
	/// Short exponential policy for single HTTP calls.
	fn default() -> Self {
		Self {
			max_attempts: 3,
			delay: Duration::from_millis(200),
			backoff: Backoff::Exponential {
				factor: 2.0,
				max: Duration::from_secs(5),
			},
			jitter: true,
		}
	}
}

impl RetryConfig {
	pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
		Self {
			max_attempts,
			delay,
			backoff: Backoff::Fixed,
			jitter: false,
		}
	}

	pub fn linear(max_attempts: u32, delay: Duration) -> Self {
		Self {
			backoff: Backoff::Linear,
			..Self::fixed(max_attempts, delay)
		}
	}

	/// Pause after failed attempt `failed` (1-based), before the next one.
	pub fn pause_after(&self, failed: u32) -> Duration {
		let n = failed.max(1);
		let pause = match self.backoff {
			Backoff::Fixed => self.delay,
			Backoff::Linear => self.delay.saturating_mul(n),
			Backoff::Exponential { factor, max } => {
				let grown = self.delay.as_secs_f64() * factor.powi(n as i32 - 1);
				Duration::from_secs_f64(grown.min(max.as_secs_f64()))
			}
		};

		if self.jitter {
			pause.mul_f64(0.5 + fastrand::f64())
		} else {
			pause
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

/// 408, 429 and the transient 5xx family.
pub fn is_retryable_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::TOO_MANY_REQUESTS
			| StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT
	)
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		self.is_timeout()
			|| self.is_connect()
			|| self.is_request()
			|| self.is_body()
			|| self.status().is_some_and(is_retryable_status)
	}
}

/// Calls `f(attempt)` until it succeeds, fails with a non-retryable error,
/// or `max_attempts` calls have been made. The last error is returned
/// unchanged so callers can classify it.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		let err = match f(attempt).await {
			Ok(value) => {
				if attempt > 1 {
					debug!(attempt, "succeeded after retry");
				}
				return Ok(value);
			}
			Err(err) => err,
		};

		if !err.is_retryable() {
			debug!(error = %err, attempt, "not retrying");
			return Err(err);
		}
		if attempt >= max_attempts {
			warn!(error = %err, attempt, max_attempts, "giving up");
			return Err(err);
		}

		let pause = cfg.pause_after(attempt);
		warn!(
			error = %err,
			attempt,
			max_attempts,
			pause_ms = pause.as_millis() as u64,
			"attempt failed, retrying"
		);
		tokio::time::sleep(pause).await;
		attempt += 1;
	}
}
