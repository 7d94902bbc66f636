// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mails registration outcomes to the course coordinators.
//!
//! Every processed booking produces one plain-text message, addressed to
//! all configured recipients, whose subject is the run's outcome and whose
//! body lists the participant statuses in booking order.
//!
//! ```no_run
//! use bookbridge_smtp::{SmtpConfig, SmtpNotifier, SmtpSecurity};
//!
//! # async fn example() -> Result<(), bookbridge_smtp::SmtpError> {
//! let notifier = SmtpNotifier::from_config(SmtpConfig {
//!     host: "mail.example.org".to_string(),
//!     port: 587,
//!     username: Some("registrations@example.org".to_string()),
//!     password: Some("app-password".into()),
//!     from_address: "registrations@example.org".to_string(),
//!     from_name: "Registration Bot".to_string(),
//!     recipients: vec!["coordinator@example.org".to_string()],
//!     security: SmtpSecurity::StartTls,
//! })?;
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use bookbridge_common_secret::SecretString;
use bookbridge_registrar::{Notification, Notifier, ReportError};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_FROM_NAME: &str = "Registration Bot";

#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	#[error("invalid SMTP configuration: {0}")]
	Config(String),

	#[error("invalid address {address:?}: {reason}")]
	Address { address: String, reason: String },

	#[error("could not build message: {0}")]
	Message(#[from] lettre::error::Error),

	#[error("SMTP delivery failed: {0}")]
	Delivery(#[from] lettre::transport::smtp::Error),
}

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
	/// Plain connection upgraded with STARTTLS, usually port 587.
	#[default]
	StartTls,
	/// TLS from the first byte, usually port 465.
	Tls,
	/// No encryption. Local relays and test servers only.
	Plain,
}

impl FromStr for SmtpSecurity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"starttls" => Ok(Self::StartTls),
			"tls" => Ok(Self::Tls),
			"plain" => Ok(Self::Plain),
			other => Err(format!("unknown SMTP security mode '{other}'")),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	#[serde(default = "default_from_name")]
	pub from_name: String,
	pub recipients: Vec<String>,
	#[serde(default)]
	pub security: SmtpSecurity,
}

fn default_port() -> u16 {
	DEFAULT_SMTP_PORT
}

fn default_from_name() -> String {
	DEFAULT_FROM_NAME.to_string()
}

fn mailbox(address: &str) -> Result<Mailbox, SmtpError> {
	address.parse().map_err(|e: lettre::address::AddressError| SmtpError::Address {
		address: address.to_string(),
		reason: e.to_string(),
	})
}

/// Syntax check for coordinator addresses.
pub fn is_valid_address(address: &str) -> bool {
	mailbox(address).is_ok()
}

pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	sender: Mailbox,
	recipients: Vec<Mailbox>,
}

impl SmtpClient {
	/// Checks every address and prepares the transport; the relay is first
	/// contacted on send.
	#[instrument(skip(config), fields(host = %config.host, port = config.port, security = ?config.security))]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let sender = mailbox(&format!("{} <{}>", config.from_name, config.from_address))?;

		if config.recipients.is_empty() {
			return Err(SmtpError::Config("no recipients configured".to_string()));
		}
		let recipients = config
			.recipients
			.iter()
			.map(|r| mailbox(r))
			.collect::<Result<Vec<_>, _>>()?;

		let builder = match config.security {
			SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?,
			SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
			SmtpSecurity::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
		}
		.port(config.port);

		let builder = match (config.username, config.password) {
			(Some(user), Some(password)) => builder.credentials(Credentials::new(user, password.into_inner())),
			(None, None) => builder,
			_ => {
				return Err(SmtpError::Config(
					"username and password must be set together".to_string(),
				))
			}
		};

		debug!(recipients = recipients.len(), "SMTP transport ready");
		Ok(Self {
			transport: builder.build(),
			sender,
			recipients,
		})
	}

	pub fn recipients(&self) -> &[Mailbox] {
		&self.recipients
	}

	/// Plain-text message from the bot to every recipient.
	pub fn compose(&self, subject: &str, body: &str) -> Result<Message, SmtpError> {
		let message = self
			.recipients
			.iter()
			.cloned()
			.fold(Message::builder().from(self.sender.clone()), |b, to| b.to(to))
			.subject(subject)
			.header(ContentType::TEXT_PLAIN)
			.body(body.to_string())?;
		Ok(message)
	}

	#[instrument(skip(self, body))]
	pub async fn send(&self, subject: &str, body: &str) -> Result<(), SmtpError> {
		let message = self.compose(subject, body)?;
		self.transport.send(message).await?;
		info!(recipients = self.recipients.len(), "notification mailed");
		Ok(())
	}
}

/// [`Notifier`] backed by [`SmtpClient`].
pub struct SmtpNotifier {
	client: SmtpClient,
}

impl SmtpNotifier {
	pub fn new(client: SmtpClient) -> Self {
		Self { client }
	}

	pub fn from_config(config: SmtpConfig) -> Result<Self, SmtpError> {
		SmtpClient::new(config).map(Self::new)
	}
}

#[async_trait]
impl Notifier for SmtpNotifier {
	async fn notify(&self, notification: &Notification) -> Result<(), ReportError> {
		self
			.client
			.send(&notification.subject, &notification.body())
			.await
			.map_err(|e| ReportError::Notification(e.to_string()))
	}
}
