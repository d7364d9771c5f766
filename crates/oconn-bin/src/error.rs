// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary-level errors and exit reporting.

use thiserror::Error;

use oconn_core::error::BridgeError;

/// Errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration problems detected before startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Component initialization failed.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// A bridge error escaped the runtime.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// A Result type with BinError.
pub type BinResult<T> = Result<T, BinError>;

/// Prints the error chain and exits with a non-zero status.
pub fn report_error_and_exit(error: BinError) -> ! {
    eprintln!("oconn: {}", error);

    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }

    std::process::exit(1);
}
