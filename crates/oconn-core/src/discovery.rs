// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Machine and trigger discovery.
//!
//! At startup, and again after a full reconnect, the bridge browses
//! `ns=2;s=Okuma.Machines` to enumerate machines, then each machine's
//! `Data` folder to enumerate field triggers, and subscribes to every
//! trigger node it finds. Nodes with system-like names are not machines and
//! are skipped.
//!
//! Trigger node ids are constructed from the browse names through the path
//! builders; the address space is string-identified, so the constructed ids
//! are exact.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::address::{MachinePaths, NodeId, MACHINES_ROOT};
use crate::control::ControlPlane;
use crate::error::PlaneResult;
use crate::types::MachineName;

/// What discovery found and subscribed.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Machines discovered (system-like names excluded).
    pub machines: Vec<MachineName>,
    /// Every trigger node subscribed.
    pub triggers: Vec<NodeId>,
}

impl DiscoveryReport {
    /// Total subscribed trigger count.
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }
}

/// Browses the machine tree and subscribes to every trigger node.
pub async fn discover_and_subscribe(
    plane: &Arc<dyn ControlPlane>,
) -> PlaneResult<DiscoveryReport> {
    let root = NodeId::new(MACHINES_ROOT);
    let mut report = DiscoveryReport::default();

    let children = plane.browse(&root).await?;
    info!(count = children.len(), "Browsed machines root");

    for child in children {
        let name = MachineName::new(child.browse_name.clone());
        if name.is_system() {
            debug!(node = %child.node, name = %name, "System-like node skipped");
            continue;
        }

        let paths = MachinePaths::new(name.clone());

        // Field triggers come from the Data folder's children.
        match plane.browse(&paths.data()).await {
            Ok(fields) => {
                for field in fields {
                    let trigger = if field.browse_name == "MacManData" {
                        paths.macman_extract()
                    } else {
                        paths.field_extract(&field.browse_name)
                    };
                    subscribe_trigger(plane, &mut report, trigger).await;
                }
            }
            Err(e) => {
                warn!(machine = %name, error = %e, "Data folder browse failed");
            }
        }

        let ctrl = paths.pm_ctrl();
        subscribe_trigger(plane, &mut report, ctrl).await;

        report.machines.push(name);
    }

    info!(
        machines = report.machines.len(),
        triggers = report.trigger_count(),
        "Discovery complete"
    );
    Ok(report)
}

async fn subscribe_trigger(
    plane: &Arc<dyn ControlPlane>,
    report: &mut DiscoveryReport,
    trigger: NodeId,
) {
    match plane.subscribe(&trigger).await {
        Ok(()) => {
            debug!(node = %trigger, "Subscribed trigger");
            report.triggers.push(trigger);
        }
        Err(e) => {
            warn!(node = %trigger, error = %e, "Trigger subscription failed");
        }
    }
}
