// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credentials and tokens that must not reach logs.
//!
//! The portal password, the identity provider's `id_token`, the portal's
//! secure-configuration blob and the booking-source keys are all held in a
//! [`Secret`]. Formatting or serializing one yields [`REDACTED`]; the value
//! is wiped when the wrapper is dropped and can only be read through
//! [`Secret::expose`] or [`SecretString::as_str`].
//!
//! ```
//! use bookbridge_common_secret::SecretString;
//!
//! let password = SecretString::from("hunter2");
//! assert_eq!(format!("{password} / {password:?}"), "[REDACTED] / Secret(\"[REDACTED]\")");
//! assert_eq!(password.as_str(), "hunter2");
//! ```

use std::fmt;

use zeroize::Zeroize;

pub const REDACTED: &str = "[REDACTED]";

pub struct Secret<T: Zeroize> {
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T: Zeroize> Secret<T> {
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Moves the value out; the emptied wrapper is still wiped on drop.
	pub fn into_inner(mut self) -> T
	where
		T: Default,
	{
		std::mem::take(&mut self.inner)
	}
}

impl<T: Zeroize> Drop for Secret<T> {
	fn drop(&mut self) {
		self.inner.zeroize();
	}
}

impl SecretString {
	pub fn as_str(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_owned())
	}
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
	fn clone(&self) -> Self {
		Self::new(self.inner.clone())
	}
}

impl<T: Zeroize + PartialEq> PartialEq for Secret<T> {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T: Zeroize + Eq> Eq for Secret<T> {}

impl<T: Zeroize> fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T: Zeroize> fmt::Display for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

/// Config files carry secrets in clear text, so deserialization reads the
/// real value while serialization (config dumps, run reports) never does.
#[cfg(feature = "serde")]
mod serde_support {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T: Zeroize> Serialize for Secret<T> {
		fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
		fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
