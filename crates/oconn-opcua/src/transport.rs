// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport abstraction over the OPC UA session.
//!
//! The trait carries exactly the services the bridge uses: single-attribute
//! read/write, hierarchical browse, and subscription plumbing. The real
//! implementation lives in [`crate::real`]; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use oconn_core::address::NodeId;
use oconn_core::control::BrowsedNode;
use oconn_core::error::PlaneResult;
use oconn_core::types::PlaneValue;

/// Connection state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and serving.
    Connected,
    /// Last connect attempt failed.
    Failed,
}

impl TransportState {
    /// Returns `true` when connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, TransportState::Connected)
    }
}

/// Result of a single-attribute read.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    /// The value, present only on a good status.
    pub value: Option<PlaneValue>,
    /// Whether the status was good.
    pub good: bool,
    /// Source timestamp when provided.
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl ReadOutcome {
    /// A good read.
    pub fn good(value: PlaneValue) -> Self {
        Self {
            value: Some(value),
            good: true,
            source_timestamp: None,
        }
    }

    /// A not-good read.
    pub fn bad() -> Self {
        Self {
            value: None,
            good: false,
            source_timestamp: None,
        }
    }
}

/// The OPC UA services the bridge consumes.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    /// Establishes the connection and activates a session.
    async fn connect(&self) -> PlaneResult<()>;

    /// Closes the session and the connection.
    async fn disconnect(&self) -> PlaneResult<()>;

    /// Returns `true` while the session is usable.
    fn is_connected(&self) -> bool;

    /// Returns the current state.
    fn state(&self) -> TransportState;

    /// Reads a node's value attribute.
    async fn read_value(&self, node: &NodeId) -> PlaneResult<ReadOutcome>;

    /// Writes a node's value attribute; returns the good-status bit.
    async fn write_value(&self, node: &NodeId, value: PlaneValue) -> PlaneResult<bool>;

    /// Forward hierarchical browse, variables and objects only.
    async fn browse(&self, node: &NodeId) -> PlaneResult<Vec<BrowsedNode>>;

    /// Creates a subscription; data changes flow into the notification
    /// channel handed to the transport at construction.
    async fn create_subscription(&self, publishing_interval: Duration) -> PlaneResult<u32>;

    /// Adds monitored items to a subscription.
    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        nodes: &[NodeId],
        sampling_interval: Duration,
    ) -> PlaneResult<()>;

    /// The server endpoint URL, for logging.
    fn endpoint(&self) -> &str;
}
