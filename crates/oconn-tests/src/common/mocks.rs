// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock implementations of the engine's seams.
//!
//! The data plane is mocked by the simulated controller from `oconn-osp`;
//! this module adds the in-memory control plane and the recording event
//! sink.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use oconn_core::address::NodeId;
use oconn_core::control::{BrowsedNode, ControlPlane};
use oconn_core::envelope::{EnvelopeMetadata, MacManEnvelope};
use oconn_core::error::{PlaneResult, SinkError};
use oconn_core::sink::EventSink;
use oconn_core::types::PlaneValue;

// =============================================================================
// MockControlPlane
// =============================================================================

/// An in-memory control plane with write recording and per-node write
/// rejection.
#[derive(Default)]
pub struct MockControlPlane {
    nodes: RwLock<HashMap<String, PlaneValue>>,
    children: RwLock<HashMap<String, Vec<BrowsedNode>>>,
    writes: Mutex<Vec<(String, PlaneValue)>>,
    subscriptions: Mutex<Vec<String>>,
    restores: AtomicU32,
    /// (node, value type name) pairs whose writes report a bad status.
    rejected: RwLock<HashSet<(String, &'static str)>>,
}

impl MockControlPlane {
    /// Creates an empty control plane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a node value.
    pub fn set_node(&self, node: &NodeId, value: PlaneValue) {
        self.nodes.write().insert(node.as_str().to_string(), value);
    }

    /// Removes a node.
    pub fn remove_node(&self, node: &NodeId) {
        self.nodes.write().remove(node.as_str());
    }

    /// Returns a node's current value.
    pub fn node(&self, node: &NodeId) -> Option<PlaneValue> {
        self.nodes.read().get(node.as_str()).cloned()
    }

    /// Seeds the children returned when browsing `parent`.
    pub fn set_children(&self, parent: &NodeId, children: Vec<BrowsedNode>) {
        self.children
            .write()
            .insert(parent.as_str().to_string(), children);
    }

    /// Makes writes of a specific value type to a node report a bad status.
    pub fn reject_write(&self, node: &NodeId, type_name: &'static str) {
        self.rejected
            .write()
            .insert((node.as_str().to_string(), type_name));
    }

    /// The full write history in order.
    pub fn write_history(&self) -> Vec<(String, PlaneValue)> {
        self.writes.lock().clone()
    }

    /// Accepted writes to one node, in order.
    pub fn writes_to(&self, node: &NodeId) -> Vec<PlaneValue> {
        self.writes
            .lock()
            .iter()
            .filter(|(n, _)| n == node.as_str())
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Position of the first accepted write to a node in the history.
    pub fn write_position(&self, node: &NodeId) -> Option<usize> {
        self.writes
            .lock()
            .iter()
            .position(|(n, _)| n == node.as_str())
    }

    /// Subscribed node ids, in order.
    pub fn subscribed(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    /// Number of restore calls observed.
    pub fn restore_count(&self) -> u32 {
        self.restores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn read(&self, node: &NodeId) -> Option<PlaneValue> {
        self.nodes.read().get(node.as_str()).cloned()
    }

    async fn write(&self, node: &NodeId, value: PlaneValue) -> bool {
        if self
            .rejected
            .read()
            .contains(&(node.as_str().to_string(), value.type_name()))
        {
            return false;
        }

        self.writes
            .lock()
            .push((node.as_str().to_string(), value.clone()));
        self.nodes.write().insert(node.as_str().to_string(), value);
        true
    }

    async fn browse(&self, node: &NodeId) -> PlaneResult<Vec<BrowsedNode>> {
        Ok(self
            .children
            .read()
            .get(node.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn subscribe(&self, node: &NodeId) -> PlaneResult<()> {
        self.subscriptions.lock().push(node.as_str().to_string());
        Ok(())
    }

    async fn restore_subscriptions(&self) -> PlaneResult<()> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// MemorySink
// =============================================================================

/// An event sink that records every published batch.
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<(Vec<MacManEnvelope>, EnvelopeMetadata)>>,
    fail: RwLock<Option<String>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail.
    pub fn fail_publishes(&self, message: Option<&str>) {
        *self.fail.write() = message.map(|m| m.to_string());
    }

    /// All recorded batches.
    pub fn batches(&self) -> Vec<(Vec<MacManEnvelope>, EnvelopeMetadata)> {
        self.batches.lock().clone()
    }

    /// Batches published for one measurement type.
    pub fn batches_for(&self, measurement_type: &str) -> Vec<Vec<MacManEnvelope>> {
        self.batches
            .lock()
            .iter()
            .filter(|(_, m)| m.measurement_type == measurement_type)
            .map(|(b, _)| b.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(
        &self,
        batch: &[MacManEnvelope],
        metadata: &EnvelopeMetadata,
    ) -> Result<(), SinkError> {
        if let Some(message) = self.fail.read().clone() {
            return Err(SinkError::publish_failed(message));
        }
        self.batches
            .lock()
            .push((batch.to_vec(), metadata.clone()));
        Ok(())
    }
}
