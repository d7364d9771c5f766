// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Environment-derived runtime settings.
//!
//! Every knob has a default; an empty environment yields a working
//! configuration pointed at a local server. Malformed numeric values fall
//! back to their defaults with a warning rather than failing startup.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Runtime settings, one field per environment variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `OPCUA_SERVER_URL` - control-plane endpoint.
    pub opcua_server_url: String,
    /// `OPCUA_USERNAME` - empty means anonymous.
    pub opcua_username: String,
    /// `OPCUA_PASSWORD`.
    pub opcua_password: String,
    /// `OPCUA_RECONNECT_INTERVAL_SECONDS` - wait between reconnect attempts.
    pub reconnect_interval: Duration,
    /// `OPCUA_PUBLISHING_INTERVAL_MS` - subscription publishing interval.
    pub publishing_interval: Duration,
    /// `OPCUA_DEFAULT_SAMPLING_INTERVAL_MS` - per-item sampling interval.
    pub sampling_interval: Duration,
    /// `OPCUA_MAX_RECONNECT_ATTEMPTS` - 0 means retry forever.
    pub max_reconnect_attempts: u32,
    /// `OPCUA_ENABLE_DETAILED_LOGGING` - debug verbosity.
    pub detailed_logging: bool,
    /// `EVENTHUB_ENABLED` - master switch for the event-stream sink.
    pub eventhub_enabled: bool,
    /// `EVENTHUB_CONNECTION_STRING` - may embed the stream name.
    pub eventhub_connection_string: String,
    /// `EVENTHUB_NAME` - stream name when not embedded above.
    pub eventhub_name: String,
    /// `MACMAN_EXTRACT_INTERVAL_MINUTES` - scheduler period, 0 disables.
    pub macman_extract_interval: Duration,
    /// `OSPAPI_SIMULATE` - route the data plane to the simulated controller.
    pub ospapi_simulate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opcua_server_url: "opc.tcp://localhost:4840/AAE/MachineServer".to_string(),
            opcua_username: String::new(),
            opcua_password: String::new(),
            reconnect_interval: Duration::from_secs(10),
            publishing_interval: Duration::from_millis(1000),
            sampling_interval: Duration::from_millis(1000),
            max_reconnect_attempts: 0,
            detailed_logging: true,
            eventhub_enabled: false,
            eventhub_connection_string: String::new(),
            eventhub_name: String::new(),
            macman_extract_interval: Duration::from_secs(60),
            ospapi_simulate: false,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, falling back to the
    /// defaults field by field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            opcua_server_url: string_var("OPCUA_SERVER_URL", &defaults.opcua_server_url),
            opcua_username: string_var("OPCUA_USERNAME", ""),
            opcua_password: string_var("OPCUA_PASSWORD", ""),
            reconnect_interval: Duration::from_secs(numeric_var(
                "OPCUA_RECONNECT_INTERVAL_SECONDS",
                10,
            )),
            publishing_interval: Duration::from_millis(numeric_var(
                "OPCUA_PUBLISHING_INTERVAL_MS",
                1000,
            )),
            sampling_interval: Duration::from_millis(numeric_var(
                "OPCUA_DEFAULT_SAMPLING_INTERVAL_MS",
                1000,
            )),
            max_reconnect_attempts: numeric_var("OPCUA_MAX_RECONNECT_ATTEMPTS", 0) as u32,
            detailed_logging: bool_var("OPCUA_ENABLE_DETAILED_LOGGING", true),
            eventhub_enabled: bool_var("EVENTHUB_ENABLED", false),
            eventhub_connection_string: string_var("EVENTHUB_CONNECTION_STRING", ""),
            eventhub_name: string_var("EVENTHUB_NAME", ""),
            macman_extract_interval: Duration::from_secs(
                numeric_var("MACMAN_EXTRACT_INTERVAL_MINUTES", 1) * 60,
            ),
            ospapi_simulate: bool_var("OSPAPI_SIMULATE", false),
        }
    }

    /// Returns `true` when username/password authentication should be used.
    pub fn uses_user_auth(&self) -> bool {
        !self.opcua_username.is_empty()
    }

    /// Returns `true` when the extract scheduler is disabled.
    pub fn scheduler_disabled(&self) -> bool {
        self.macman_extract_interval.is_zero()
    }
}

fn string_var(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn numeric_var(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                warn!(%name, value = %v, "Not a number, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn bool_var(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(
            s.opcua_server_url,
            "opc.tcp://localhost:4840/AAE/MachineServer"
        );
        assert_eq!(s.reconnect_interval, Duration::from_secs(10));
        assert_eq!(s.publishing_interval, Duration::from_millis(1000));
        assert_eq!(s.max_reconnect_attempts, 0);
        assert!(s.detailed_logging);
        assert!(!s.eventhub_enabled);
        assert_eq!(s.macman_extract_interval, Duration::from_secs(60));
        assert!(!s.uses_user_auth());
        assert!(!s.scheduler_disabled());
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("OPCUA_RECONNECT_INTERVAL_SECONDS", "30");
        env::set_var("MACMAN_EXTRACT_INTERVAL_MINUTES", "0");
        env::set_var("EVENTHUB_ENABLED", "TRUE");

        let s = Settings::from_env();
        assert_eq!(s.reconnect_interval, Duration::from_secs(30));
        assert!(s.scheduler_disabled());
        assert!(s.eventhub_enabled);

        env::remove_var("OPCUA_RECONNECT_INTERVAL_SECONDS");
        env::remove_var("MACMAN_EXTRACT_INTERVAL_MINUTES");
        env::remove_var("EVENTHUB_ENABLED");
    }

    #[test]
    fn test_malformed_number_falls_back() {
        env::set_var("OPCUA_PUBLISHING_INTERVAL_MS", "soon");
        let s = Settings::from_env();
        assert_eq!(s.publishing_interval, Duration::from_millis(1000));
        env::remove_var("OPCUA_PUBLISHING_INTERVAL_MS");
    }
}
