// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OCONN - data-plane bridge for a fleet of Okuma CNC machines.
//!
//! Couples an OPC UA control plane to per-machine native OSPAPI sessions
//! and publishes MacMan history to an event stream.

use clap::Parser;

use oconn_bin::cli::Cli;
use oconn_bin::commands;
use oconn_bin::error::report_error_and_exit;
use oconn_bin::logging::init_logging;
use oconn_config::{envfile, Settings};

/// Application entry point.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Environment first: the .env file feeds the settings that decide the
    // log verbosity.
    match &cli.env_file {
        Some(path) => {
            envfile::load_from(path);
        }
        None => {
            envfile::load();
        }
    }
    let settings = Settings::from_env();

    let _log_guard = init_logging(
        cli.effective_log_level(settings.detailed_logging),
        cli.log_format,
    );

    if let Err(error) = commands::execute(cli, settings).await {
        report_error_and_exit(error);
    }
}
