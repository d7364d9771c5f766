// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! Console output plus an append-only daily file under `logs/`
//! (`okuma_connect.log.<date>`). The returned guard must stay alive for
//! the process lifetime or buffered file output is lost.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

/// Log directory.
const LOG_DIR: &str = "logs";

/// Daily log file prefix.
const LOG_PREFIX: &str = "okuma_connect.log";

/// Initializes the logging subsystem.
pub fn init_logging(level: &str, format: LogFormat) -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level))
        .add_directive("opcua=warn".parse().unwrap())
        .add_directive("tokio=info".parse().unwrap());

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());

    match format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_ansi(is_terminal),
                )
                .with(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true),
                )
                .with(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_ansi(is_terminal),
                )
                .with(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();
        }
    }

    guard
}
