// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading against realistic documents.

use oconn_config::{load_registry, ApiConfigFile};
use oconn_core::registry::{DataKind, DescriptorOrigin};
use oconn_tests::common::api_config_json;

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("api_config.json");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn general_list_wins_over_custom_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, api_config_json());

    let registry = load_registry(&path);
    assert_eq!(registry.len(), 4);

    // The custom duplicate (major 9999) loses to the general entry.
    let counter = registry.resolve("WorkCounterA_Counted").unwrap();
    assert_eq!(counter.origin, DescriptorOrigin::General);
    assert_eq!(counter.address.major, 3066);
    assert_eq!(counter.kind, DataKind::Float);
}

#[test]
fn descriptors_resolve_across_kinds_and_series() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, api_config_json());
    let registry = load_registry(&path);

    // Lathe-series descriptor with no DataFieldName joins by ApiName.
    let turret = registry.resolve("TurretPosition").unwrap();
    assert_eq!(turret.field_name(), "TurretPosition");
    assert_eq!(turret.kind, DataKind::Int);
    assert!(!turret.enabled);
    assert_eq!(turret.address.style, 0);

    assert!(registry.resolve("SpindleSpeed_S1").is_some());
    assert!(registry.resolve("Unknown_Field").is_none());
}

#[test]
fn broken_configuration_substitutes_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "{\"Configurations\": [1, 2, 3]}");

    let registry = load_registry(&path);
    assert_eq!(registry.len(), 1);

    let fallback = registry.resolve("WorkCounterA_Counted").unwrap();
    assert_eq!(fallback.address.style, 8);
    assert_eq!(fallback.kind, DataKind::Float);
    assert_eq!(fallback.collection_interval_ms, 5000);
    assert!(fallback.enabled);
}

#[test]
fn reserialized_configuration_yields_the_same_descriptor_set() {
    let file: ApiConfigFile = serde_json::from_str(api_config_json()).unwrap();
    let reparsed: ApiConfigFile =
        serde_json::from_str(&serde_json::to_string_pretty(&file).unwrap()).unwrap();

    assert_eq!(file, reparsed);

    let original = file.build_registry();
    let round_tripped = reparsed.build_registry();
    assert_eq!(original.keys(), round_tripped.keys());
    assert_eq!(original.descriptors(), round_tripped.descriptors());
}
