// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text (default).
    Text,
    /// JSON lines for log aggregation.
    Json,
    /// Minimal single-line output.
    Compact,
}

/// OCONN - the Okuma fleet data-plane bridge.
#[derive(Debug, Parser)]
#[command(name = "oconn", version, about, long_about = None)]
pub struct Cli {
    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Explicit .env file; otherwise the standard lookup order applies.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Path to the API descriptor configuration.
    #[arg(long, global = true, default_value = "api_config.json")]
    pub api_config: PathBuf,

    /// Subcommand; `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Run the bridge until a shutdown signal.
    Run,
    /// Check the environment and API configuration without connecting.
    Validate,
    /// Print version information.
    Version,
}

impl Cli {
    /// The command to execute, defaulting to `run`.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// The log level to initialize with. `OPCUA_ENABLE_DETAILED_LOGGING`
    /// raises a default `info` to `debug`; an explicit `--log-level` wins.
    pub fn effective_log_level(&self, detailed_logging: bool) -> &str {
        if detailed_logging && self.log_level == "info" {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
