// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Subscription tuning knobs passed to the server on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Requested lifetime count.
    pub lifetime_count: u32,
    /// Requested max keep-alive count.
    pub keepalive_count: u32,
    /// Max notifications per publish (0 = unlimited).
    pub max_notifications_per_publish: u32,
    /// Subscription priority.
    pub priority: u8,
    /// Whether publishing starts enabled.
    pub publishing_enabled: bool,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            lifetime_count: 100,
            keepalive_count: 10,
            max_notifications_per_publish: 0,
            priority: 0,
            publishing_enabled: true,
        }
    }
}

/// Configuration of the control-plane client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpcUaConfig {
    /// Server endpoint URL.
    pub endpoint: String,
    /// Application name announced to the server.
    pub application_name: String,
    /// Application URI announced to the server.
    pub application_uri: String,
    /// User name; empty means anonymous.
    pub username: String,
    /// Password for user-name authentication.
    pub password: String,
    /// Session timeout.
    pub session_timeout: Duration,
    /// Session retry limit handed to the library's reconnect machinery.
    pub session_retry_limit: i32,
    /// PKI directory holding `own`, `trusted`, and `rejected`.
    pub pki_dir: PathBuf,
    /// Subscription publishing interval.
    pub publishing_interval: Duration,
    /// Per-item sampling interval.
    pub sampling_interval: Duration,
    /// Subscription tuning.
    pub subscription: SubscriptionSettings,
}

impl Default for OpcUaConfig {
    fn default() -> Self {
        Self {
            endpoint: "opc.tcp://localhost:4840/AAE/MachineServer".to_string(),
            application_name: "OCONN Bridge".to_string(),
            application_uri: "urn:oconn:bridge".to_string(),
            username: String::new(),
            password: String::new(),
            session_timeout: Duration::from_secs(60),
            session_retry_limit: 10,
            pki_dir: PathBuf::from("certificates"),
            publishing_interval: Duration::from_millis(1000),
            sampling_interval: Duration::from_millis(1000),
            subscription: SubscriptionSettings::default(),
        }
    }
}

impl OpcUaConfig {
    /// Creates a config for an endpoint with everything else defaulted.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Sets user-name credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the publishing interval.
    pub fn with_publishing_interval(mut self, interval: Duration) -> Self {
        self.publishing_interval = interval;
        self
    }

    /// Sets the sampling interval.
    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval = interval;
        self
    }

    /// Sets the PKI directory.
    pub fn with_pki_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pki_dir = dir.into();
        self
    }

    /// Returns `true` when user-name authentication is configured.
    pub fn uses_user_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
