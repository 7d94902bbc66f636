// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! bookbridge: registers booking participants into the course portal.
//!
//! `register` is the production path: one booking event in, one JSON run
//! report out. `login` and `locate` exercise the handshake and the course
//! search on their own.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bookbridge_config::{BookbridgeConfig, LogFormat, LoggingConfig};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "bookbridge", version, about, long_about = None)]
struct Args {
	/// Configuration file (default: /etc/bookbridge/config.toml if present)
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Register every participant of a booking event
	Register {
		/// Booking event JSON file, or `-` for stdin
		#[arg(long)]
		event: String,

		/// Locate the course and look up contacts without changing anything
		#[arg(long)]
		dry_run: bool,
	},
	/// Log into the portal and report the session
	Login {
		/// Try the saved cookie file before a full login
		#[arg(long)]
		reuse_session: bool,
	},
	/// Search the portal for the course a booking would be registered into
	Locate {
		/// Course date (YYYY-MM-DD)
		#[arg(long)]
		date: String,

		/// Canonical course type, e.g. "Standard First Aid Blended"
		#[arg(long)]
		course_type: String,

		/// Location fragment matched against the facility name
		#[arg(long)]
		location: String,

		/// Try the saved cookie file before a full login
		#[arg(long)]
		reuse_session: bool,
	},
}

impl Args {
	fn apply_overrides(&self, logging: &mut LoggingConfig) {
		if let Some(level) = &self.log_level {
			logging.level = level.clone();
		}
		if self.json_logs {
			logging.format = LogFormat::Json;
		}
	}
}

fn load_config(args: &Args) -> Result<BookbridgeConfig> {
	let mut config = match &args.config {
		Some(path) => bookbridge_config::load_config_with_file(path),
		None => bookbridge_config::load_config(),
	}
	.context("failed to load configuration")?;
	args.apply_overrides(&mut config.logging);
	Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("bookbridge={}", logging.level)));

	// stdout carries the command's JSON output.
	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = load_config(&args)?;
	init_tracing(&config.logging);

	match args.command {
		Command::Register { event, dry_run } => commands::register(&config, &event, dry_run).await,
		Command::Login { reuse_session } => commands::login(&config, reuse_session).await,
		Command::Locate {
			date,
			course_type,
			location,
			reuse_session,
		} => {
			let query = bookbridge_portal::CourseQuery {
				date,
				course_type,
				location,
			};
			commands::locate(&config, &query, reuse_session).await
		}
	}
}
