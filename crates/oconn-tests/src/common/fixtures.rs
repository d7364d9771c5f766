// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Canned machines, descriptors, and configuration documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use oconn_core::address::{MachinePaths, NodeId, MACHINES_ROOT};
use oconn_core::control::BrowsedNode;
use oconn_core::osp::OspAddress;
use oconn_core::registry::{DataKind, Descriptor, DescriptorOrigin, DescriptorRegistry};
use oconn_core::types::{MachineName, PlaneValue};

use super::mocks::MockControlPlane;

/// The default test machine.
pub const MACHINE: &str = "12345 - MA600";

/// The default test machine's controller IP.
pub const MACHINE_IP: &str = "192.168.1.10";

/// Path builders for a machine, without touching the plane.
pub fn machine_paths(name: &str) -> MachinePaths {
    MachinePaths::new(MachineName::new(name))
}

/// Seeds a machine's `MachineConfig` and trigger nodes on the mock plane.
pub fn seed_machine(plane: &MockControlPlane, name: &str, ip: &str) -> MachinePaths {
    let paths = MachinePaths::new(MachineName::new(name));
    plane.set_node(&paths.config_enabled(), PlaneValue::Bool(true));
    plane.set_node(&paths.config_ip_address(), PlaneValue::String(ip.to_string()));
    plane.set_node(
        &paths.config_machine_id(),
        PlaneValue::String(paths.name().machine_id().as_str().to_string()),
    );
    plane.set_node(&paths.macman_extract(), PlaneValue::Bool(false));
    paths
}

/// Registers machines under the browse root, with `Data` children per
/// machine, so discovery and the scheduler can walk the tree.
pub fn seed_browse_tree(
    plane: &MockControlPlane,
    machines: &[(&str, &[&str])],
) {
    let root = NodeId::new(MACHINES_ROOT);
    let mut root_children = Vec::new();

    for (name, fields) in machines {
        let paths = MachinePaths::new(MachineName::new(*name));
        root_children.push(BrowsedNode::new(paths.root(), *name));

        let mut data_children: Vec<BrowsedNode> = fields
            .iter()
            .map(|field| {
                BrowsedNode::new(
                    NodeId::new(format!("{}.{}", paths.data().as_str(), field)),
                    *field,
                )
            })
            .collect();
        data_children.push(BrowsedNode::new(
            NodeId::new(format!("{}.MacManData", paths.data().as_str())),
            "MacManData",
        ));
        plane.set_children(&paths.data(), data_children);
    }

    plane.set_children(&root, root_children);
}

/// The work-counter descriptor from the standard configuration.
pub fn work_counter_descriptor() -> Descriptor {
    Descriptor {
        api_name: "WorkCounterA".to_string(),
        data_field_name: "WorkCounterA_Counted".to_string(),
        address: OspAddress::new(0, 3066, 0, 0, 8),
        kind: DataKind::Float,
        enabled: true,
        collection_interval_ms: 5000,
        origin: DescriptorOrigin::General,
    }
}

/// A registry holding the given descriptors.
pub fn registry(descriptors: Vec<Descriptor>) -> Arc<DescriptorRegistry> {
    Arc::new(DescriptorRegistry::new(descriptors))
}

/// Builds a MacMan record map from field pairs.
pub fn record(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A multi-kind, multi-series `api_config.json` document.
pub fn api_config_json() -> &'static str {
    r#"{
        "Configurations": {
            "machining-center": {
                "P300": {
                    "General": [
                        {
                            "ApiName": "WorkCounterA",
                            "Type": "Counter",
                            "SubsystemIndex": 0,
                            "MajorIndex": 3066,
                            "MinorIndex": 0,
                            "StyleCode": 8,
                            "Subscript": 0,
                            "DataFieldName": "WorkCounterA_Counted",
                            "DataFieldDescription": "Work counter A",
                            "DataType": "float",
                            "CollectionIntervalMs": 5000,
                            "Enabled": true,
                            "MinimumChangeThreshold": 0.0
                        },
                        {
                            "ApiName": "SpindleSpeed",
                            "SubsystemIndex": 1,
                            "MajorIndex": 140,
                            "MinorIndex": 0,
                            "StyleCode": 8,
                            "Subscript": 0,
                            "DataFieldName": "SpindleSpeed_S1",
                            "DataType": "double",
                            "Enabled": true
                        }
                    ],
                    "Custom": [
                        {
                            "ApiName": "WorkCounterA",
                            "SubsystemIndex": 0,
                            "MajorIndex": 9999,
                            "MinorIndex": 0,
                            "StyleCode": 8,
                            "Subscript": 0,
                            "DataFieldName": "WorkCounterA_Counted",
                            "DataType": "float",
                            "Enabled": true
                        }
                    ]
                }
            },
            "lathe": {
                "LB3000": {
                    "General": [
                        {
                            "ApiName": "TurretPosition",
                            "SubsystemIndex": 1,
                            "MajorIndex": 210,
                            "MinorIndex": 1,
                            "StyleCode": null,
                            "Subscript": 0,
                            "DataFieldName": "",
                            "DataType": "int",
                            "Enabled": false
                        }
                    ]
                }
            }
        }
    }"#
}
