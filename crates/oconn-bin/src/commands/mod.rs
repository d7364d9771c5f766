// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subcommand implementations.

mod run;
mod validate;
mod version;

use oconn_config::Settings;

use crate::cli::{Cli, Command};
use crate::error::BinResult;

/// Executes the selected subcommand.
pub async fn execute(cli: Cli, settings: Settings) -> BinResult<()> {
    match cli.command() {
        Command::Run => run::execute(&cli, settings).await,
        Command::Validate => validate::execute(&cli, &settings),
        Command::Version => {
            version::execute();
            Ok(())
        }
    }
}
