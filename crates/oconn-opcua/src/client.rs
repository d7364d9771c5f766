// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The control-plane client.
//!
//! Wraps a transport behind the engine's [`ControlPlane`] seam and owns the
//! subscription memory: every node id subscribed since startup is
//! remembered in an append-only set, and [`restore_subscriptions`] rebuilds
//! the server-side subscription from that set after a reconnect. The set is
//! cleared only at final teardown.
//!
//! [`ControlPlane`]: oconn_core::control::ControlPlane
//! [`restore_subscriptions`]: oconn_core::control::ControlPlane::restore_subscriptions

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use oconn_core::address::NodeId;
use oconn_core::control::{BrowsedNode, ControlPlane};
use oconn_core::error::{PlaneError, PlaneResult};
use oconn_core::types::PlaneValue;

use crate::transport::OpcUaTransport;
use crate::types::OpcUaConfig;

/// The production [`ControlPlane`] implementation.
///
/// [`ControlPlane`]: oconn_core::control::ControlPlane
pub struct ControlPlaneClient<T: OpcUaTransport> {
    transport: T,
    config: OpcUaConfig,
    remembered: RwLock<BTreeSet<NodeId>>,
    subscription_id: Mutex<Option<u32>>,
}

impl<T: OpcUaTransport> ControlPlaneClient<T> {
    /// Creates a client over a transport.
    pub fn new(config: OpcUaConfig, transport: T) -> Self {
        Self {
            transport,
            config,
            remembered: RwLock::new(BTreeSet::new()),
            subscription_id: Mutex::new(None),
        }
    }

    /// Connects the transport.
    pub async fn connect(&self) -> PlaneResult<()> {
        self.transport.connect().await
    }

    /// Returns `true` while the session is usable.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Reconnects and restores the remembered subscription set.
    pub async fn reconnect(&self) -> PlaneResult<()> {
        warn!("Control-plane session lost, reconnecting");
        self.transport.disconnect().await.ok();
        // The server-side subscription died with the old session.
        *self.subscription_id.lock().await = None;
        self.transport.connect().await?;
        self.restore_subscriptions().await?;
        info!("Control-plane session restored");
        Ok(())
    }

    /// Disconnects and clears the subscription memory. Final teardown only.
    pub async fn shutdown(&self) -> PlaneResult<()> {
        self.remembered.write().clear();
        *self.subscription_id.lock().await = None;
        self.transport.disconnect().await
    }

    /// Number of remembered subscription nodes.
    pub fn remembered_count(&self) -> usize {
        self.remembered.read().len()
    }

    /// Returns the subscription id, creating the subscription on demand.
    async fn ensure_subscription(&self) -> PlaneResult<u32> {
        let mut guard = self.subscription_id.lock().await;
        if let Some(id) = *guard {
            return Ok(id);
        }
        let id = self
            .transport
            .create_subscription(self.config.publishing_interval)
            .await?;
        *guard = Some(id);
        Ok(id)
    }
}

#[async_trait]
impl<T: OpcUaTransport> ControlPlane for ControlPlaneClient<T> {
    async fn read(&self, node: &NodeId) -> Option<PlaneValue> {
        match self.transport.read_value(node).await {
            Ok(outcome) if outcome.good => outcome.value,
            Ok(_) => None,
            Err(e) => {
                debug!(node = %node, error = %e, "Read failed");
                None
            }
        }
    }

    async fn write(&self, node: &NodeId, value: PlaneValue) -> bool {
        match self.transport.write_value(node, value).await {
            Ok(good) => good,
            Err(e) => {
                debug!(node = %node, error = %e, "Write failed");
                false
            }
        }
    }

    async fn browse(&self, node: &NodeId) -> PlaneResult<Vec<BrowsedNode>> {
        self.transport.browse(node).await
    }

    async fn subscribe(&self, node: &NodeId) -> PlaneResult<()> {
        // Remember first: a node requested while the server is flapping
        // must still be restored later.
        self.remembered.write().insert(node.clone());

        let subscription_id = self.ensure_subscription().await?;
        self.transport
            .create_monitored_items(
                subscription_id,
                std::slice::from_ref(node),
                self.config.sampling_interval,
            )
            .await
    }

    async fn restore_subscriptions(&self) -> PlaneResult<()> {
        let nodes: Vec<NodeId> = self.remembered.read().iter().cloned().collect();
        if nodes.is_empty() {
            return Ok(());
        }

        let subscription_id = self.ensure_subscription().await?;
        self.transport
            .create_monitored_items(subscription_id, &nodes, self.config.sampling_interval)
            .await
            .map_err(|e| {
                PlaneError::subscription(format!("restore of {} nodes: {}", nodes.len(), e))
            })?;

        info!(nodes = nodes.len(), "Subscriptions restored");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
