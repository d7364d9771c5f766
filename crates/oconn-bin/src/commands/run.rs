// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `run` command: bring the bridge up and hold it until a signal.

use tracing::info;

use oconn_config::{load_registry, Settings};

use crate::cli::Cli;
use crate::error::BinResult;
use crate::runtime::BridgeRuntime;

/// Runs the bridge.
pub async fn execute(cli: &Cli, settings: Settings) -> BinResult<()> {
    let registry = load_registry(&cli.api_config);
    info!(
        endpoint = %settings.opcua_server_url,
        descriptors = registry.len(),
        "Configuration loaded"
    );

    BridgeRuntime::new(settings, registry).run().await
}
