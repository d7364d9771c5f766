// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `api_config.json` document model.
//!
//! ```json
//! {
//!   "Configurations": {
//!     "<kind>": {
//!       "<series>": { "General": [ ... ], "Custom": [ ... ] }
//!     }
//!   }
//! }
//! ```
//!
//! Field names are PascalCase on disk. `BTreeMap` keys keep the kind and
//! series iteration deterministic, which fixes the descriptor resolution
//! order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use oconn_core::osp::OspAddress;
use oconn_core::registry::{DataKind, Descriptor, DescriptorOrigin, DescriptorRegistry};

/// The root document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfigFile {
    /// Kind -> series -> lists.
    #[serde(rename = "Configurations")]
    pub configurations: BTreeMap<String, BTreeMap<String, SeriesApis>>,
}

/// One controller series' API lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesApis {
    /// Series-wide standard APIs.
    #[serde(rename = "General", default)]
    pub general: Vec<ApiItem>,
    /// Site-specific additions.
    #[serde(rename = "Custom", default)]
    pub custom: Vec<ApiItem>,
}

/// One configured API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiItem {
    /// Vendor API name.
    #[serde(rename = "ApiName")]
    pub api_name: String,
    /// Vendor API category.
    #[serde(rename = "Type", default)]
    pub api_type: String,
    /// Subsystem index.
    #[serde(rename = "SubsystemIndex", default)]
    pub subsystem_index: i32,
    /// Major index.
    #[serde(rename = "MajorIndex", default)]
    pub major_index: i32,
    /// Minor index.
    #[serde(rename = "MinorIndex", default)]
    pub minor_index: i32,
    /// Style code; null means 0.
    #[serde(rename = "StyleCode", default)]
    pub style_code: Option<i32>,
    /// Subscript.
    #[serde(rename = "Subscript", default)]
    pub subscript: i32,
    /// Data-field name; the join key when non-empty.
    #[serde(rename = "DataFieldName", default)]
    pub data_field_name: String,
    /// Human-readable description.
    #[serde(rename = "DataFieldDescription", default)]
    pub data_field_description: String,
    /// Declared data type.
    #[serde(rename = "DataType", default)]
    pub data_type: String,
    /// Collection interval hint in milliseconds.
    #[serde(rename = "CollectionIntervalMs", default = "default_interval")]
    pub collection_interval_ms: u64,
    /// Whether the API participates in collection.
    #[serde(rename = "Enabled", default = "default_enabled")]
    pub enabled: bool,
    /// Deadband hint.
    #[serde(rename = "MinimumChangeThreshold", default)]
    pub minimum_change_threshold: f64,
}

fn default_interval() -> u64 {
    1000
}

fn default_enabled() -> bool {
    true
}

impl ApiItem {
    fn to_descriptor(&self, origin: DescriptorOrigin) -> Descriptor {
        Descriptor {
            api_name: self.api_name.clone(),
            data_field_name: self.data_field_name.clone(),
            address: OspAddress::new(
                self.subsystem_index,
                self.major_index,
                self.subscript,
                self.minor_index,
                self.style_code.unwrap_or(0),
            ),
            kind: DataKind::parse(&self.data_type),
            enabled: self.enabled,
            collection_interval_ms: self.collection_interval_ms,
            origin,
        }
    }
}

impl ApiConfigFile {
    /// Flattens the document into a registry: all General lists across
    /// kinds and series first, then all Custom lists.
    pub fn build_registry(&self) -> DescriptorRegistry {
        let mut items = Vec::new();

        for series_map in self.configurations.values() {
            for series in series_map.values() {
                items.extend(
                    series
                        .general
                        .iter()
                        .map(|i| i.to_descriptor(DescriptorOrigin::General)),
                );
            }
        }
        for series_map in self.configurations.values() {
            for series in series_map.values() {
                items.extend(
                    series
                        .custom
                        .iter()
                        .map(|i| i.to_descriptor(DescriptorOrigin::Custom)),
                );
            }
        }

        DescriptorRegistry::new(items)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
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
                        }
                    ],
                    "Custom": [
                        {
                            "ApiName": "SpindleLoad",
                            "SubsystemIndex": 1,
                            "MajorIndex": 120,
                            "MinorIndex": 2,
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
    }"#;

    #[test]
    fn test_parse_sample() {
        let file: ApiConfigFile = serde_json::from_str(SAMPLE).unwrap();
        let series = &file.configurations["machining-center"]["P300"];
        assert_eq!(series.general.len(), 1);
        assert_eq!(series.custom.len(), 1);

        let counter = &series.general[0];
        assert_eq!(counter.style_code, Some(8));
        assert_eq!(counter.collection_interval_ms, 5000);

        // Defaults kick in for omitted fields; null style collapses to 0.
        let spindle = &series.custom[0];
        assert_eq!(spindle.style_code, None);
        assert_eq!(spindle.collection_interval_ms, 1000);
        assert!(!spindle.enabled);
    }

    #[test]
    fn test_build_registry() {
        let file: ApiConfigFile = serde_json::from_str(SAMPLE).unwrap();
        let registry = file.build_registry();
        assert_eq!(registry.len(), 2);

        let counter = registry.resolve("WorkCounterA_Counted").unwrap();
        assert_eq!(counter.address, OspAddress::new(0, 3066, 0, 0, 8));
        assert_eq!(counter.kind, DataKind::Float);

        // Empty DataFieldName joins by ApiName; null style is 0.
        let spindle = registry.resolve("SpindleLoad").unwrap();
        assert_eq!(spindle.field_name(), "SpindleLoad");
        assert_eq!(spindle.address.style, 0);
        assert!(!spindle.enabled);
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let file: ApiConfigFile = serde_json::from_str(SAMPLE).unwrap();
        let serialized = serde_json::to_string(&file).unwrap();
        let reparsed: ApiConfigFile = serde_json::from_str(&serialized).unwrap();

        assert_eq!(file, reparsed);
        assert_eq!(
            file.build_registry().keys(),
            reparsed.build_registry().keys()
        );
    }
}
