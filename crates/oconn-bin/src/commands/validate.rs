// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `validate` command: check configuration without touching the
//! network.

use oconn_config::{try_load_registry, Settings};

use crate::cli::Cli;
use crate::error::{BinError, BinResult};

/// Validates the environment settings and the API configuration.
pub fn execute(cli: &Cli, settings: &Settings) -> BinResult<()> {
    println!("Endpoint:            {}", settings.opcua_server_url);
    println!(
        "Authentication:      {}",
        if settings.uses_user_auth() {
            "username/password"
        } else {
            "anonymous"
        }
    );
    println!(
        "Extract interval:    {}",
        if settings.scheduler_disabled() {
            "disabled".to_string()
        } else {
            format!("{}s", settings.macman_extract_interval.as_secs())
        }
    );
    println!(
        "Event stream:        {}",
        if settings.eventhub_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let registry = try_load_registry(&cli.api_config)
        .map_err(|e| BinError::Configuration(e.to_string()))?;

    println!(
        "API configuration:   {} ({} descriptors)",
        cli.api_config.display(),
        registry.len()
    );

    let disabled = registry
        .descriptors()
        .iter()
        .filter(|d| !d.enabled)
        .count();
    if disabled > 0 {
        println!("                     {} descriptors disabled", disabled);
    }

    println!("Configuration OK");
    Ok(())
}
