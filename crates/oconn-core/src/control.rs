// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Control-plane seam.
//!
//! The coupling engine consumes the OPC UA client through this narrow trait.
//! The production implementation lives in `oconn-opcua`; tests use an
//! in-memory implementation.
//!
//! # Read/Write semantics
//!
//! - `read` returns `None` on any not-good status. The absence of a node is
//!   information (a machine without a watermark is on its first run), not an
//!   error.
//! - `write` returns only the good-status bit. Callers that need stronger
//!   guarantees (the watermark cascade) try typed fallbacks until one write
//!   is accepted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::address::NodeId;
use crate::error::PlaneResult;
use crate::types::PlaneValue;

// =============================================================================
// Notifications
// =============================================================================

/// A data-change notification delivered by the control plane.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The node that changed.
    pub node: NodeId,
    /// The new value.
    pub value: PlaneValue,
    /// Source timestamp, when the server provided one.
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl Notification {
    /// Creates a notification without a source timestamp.
    pub fn new(node: NodeId, value: PlaneValue) -> Self {
        Self {
            node,
            value,
            source_timestamp: None,
        }
    }
}

/// A child node returned by a hierarchical browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsedNode {
    /// The child's node id.
    pub node: NodeId,
    /// The child's browse name (the path segment).
    pub browse_name: String,
}

impl BrowsedNode {
    /// Creates a browsed node.
    pub fn new(node: NodeId, browse_name: impl Into<String>) -> Self {
        Self {
            node,
            browse_name: browse_name.into(),
        }
    }
}

// =============================================================================
// ControlPlane Trait
// =============================================================================

/// The control-plane operations the coupling engine needs.
///
/// Implementations wrap a single persistent OPC UA session with automatic
/// reconnect. All methods may block on network I/O and must be called from
/// worker tasks, never from the notification delivery path.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Reads the value attribute of a node.
    ///
    /// Returns `None` on any not-good status, including node absence.
    async fn read(&self, node: &NodeId) -> Option<PlaneValue>;

    /// Writes the value attribute of a node.
    ///
    /// Returns the good-status bit of the write response.
    async fn write(&self, node: &NodeId, value: PlaneValue) -> bool;

    /// Forward hierarchical browse with the variable+object node-class mask.
    async fn browse(&self, node: &NodeId) -> PlaneResult<Vec<BrowsedNode>>;

    /// Adds a monitored item for the node at the configured sampling
    /// interval. The node is remembered for [`restore_subscriptions`].
    ///
    /// [`restore_subscriptions`]: ControlPlane::restore_subscriptions
    async fn subscribe(&self, node: &NodeId) -> PlaneResult<()>;

    /// Re-creates monitored items for every node subscribed since startup.
    ///
    /// Invoked after a reconnect; the remembered set persists across
    /// reconnections and is cleared only at final teardown.
    async fn restore_subscriptions(&self) -> PlaneResult<()>;
}

// =============================================================================
// Convenience Helpers
// =============================================================================

/// Reads a node as a trimmed string, treating everything readable as text.
pub async fn read_string(plane: &dyn ControlPlane, node: &NodeId) -> Option<String> {
    let value = plane.read(node).await?;
    let s = match value {
        PlaneValue::String(s) => s,
        other => other.to_string(),
    };
    let trimmed = s.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct OneNode {
        node: NodeId,
        value: PlaneValue,
    }

    #[async_trait]
    impl ControlPlane for OneNode {
        async fn read(&self, node: &NodeId) -> Option<PlaneValue> {
            (node == &self.node).then(|| self.value.clone())
        }

        async fn write(&self, _node: &NodeId, _value: PlaneValue) -> bool {
            true
        }

        async fn browse(&self, _node: &NodeId) -> PlaneResult<Vec<BrowsedNode>> {
            Ok(Vec::new())
        }

        async fn subscribe(&self, _node: &NodeId) -> PlaneResult<()> {
            Ok(())
        }

        async fn restore_subscriptions(&self) -> PlaneResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_read_string_trims() {
        let plane = OneNode {
            node: NodeId::new("n"),
            value: PlaneValue::String("  192.168.1.10  ".into()),
        };
        assert_eq!(
            read_string(&plane, &NodeId::new("n")).await.as_deref(),
            Some("192.168.1.10")
        );
        assert_eq!(read_string(&plane, &NodeId::new("missing")).await, None);
    }

    #[tokio::test]
    async fn test_read_string_empty_is_none() {
        let plane = OneNode {
            node: NodeId::new("n"),
            value: PlaneValue::String("   ".into()),
        };
        assert_eq!(read_string(&plane, &NodeId::new("n")).await, None);
    }
}
