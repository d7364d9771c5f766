// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! End-to-end general collection: trigger in, controller read, write-back.

use std::sync::Arc;

use oconn_core::registry::Descriptor;
use oconn_core::types::{MachineName, PlaneValue};
use oconn_core::{GeneralCollector, OspAddress, SessionPool};
use oconn_osp::SimConnector;
use oconn_tests::common::*;

struct Rig {
    plane: Arc<MockControlPlane>,
    connector: Arc<SimConnector>,
    pool: Arc<SessionPool>,
}

fn rig() -> Rig {
    let plane = Arc::new(MockControlPlane::new());
    seed_machine(&plane, MACHINE, MACHINE_IP);
    let connector = Arc::new(SimConnector::new());
    let pool = Arc::new(SessionPool::new(connector.clone(), plane.clone()));
    Rig {
        plane,
        connector,
        pool,
    }
}

fn collector(rig: &Rig, descriptors: Vec<Descriptor>) -> GeneralCollector {
    GeneralCollector::new(rig.plane.clone(), rig.pool.clone(), registry(descriptors))
}

fn machine() -> MachineName {
    MachineName::new(MACHINE)
}

#[tokio::test]
async fn happy_path_converts_and_writes_back() {
    let rig = rig();
    let state = rig.connector.controller(MACHINE_IP);
    state.set_value(OspAddress::new(0, 3066, 0, 0, 8), "  42.50  ");

    let collector = collector(&rig, vec![work_counter_descriptor()]);
    collector
        .collect(&machine(), "WorkCounterA_Counted")
        .await
        .unwrap();

    let paths = machine_paths(MACHINE);
    let extract = paths.field_extract("WorkCounterA_Counted");
    let value = paths.field_value("WorkCounterA_Counted");
    let lastupdated = paths.field_lastupdated("WorkCounterA_Counted");

    assert_eq!(rig.plane.node(&extract), Some(PlaneValue::Bool(false)));
    assert_eq!(
        rig.plane.writes_to(&value),
        vec![PlaneValue::Double(42.5)]
    );

    match rig.plane.node(&lastupdated) {
        Some(PlaneValue::Int32(secs)) => assert!(secs > 1_700_000_000),
        other => panic!("lastupdated should be int32 seconds, got {:?}", other),
    }

    // Trigger reset lands before the value write.
    let extract_pos = rig.plane.write_position(&extract).unwrap();
    let value_pos = rig.plane.write_position(&value).unwrap();
    assert!(extract_pos < value_pos);

    // Opening the session reported the connection.
    match rig.plane.node(&paths.connected()) {
        Some(PlaneValue::Int32(secs)) => assert!(secs > 0),
        other => panic!("Connected mirror missing: {:?}", other),
    }
    assert_eq!(
        rig.plane.node(&paths.disconnected()),
        Some(PlaneValue::Int32(0))
    );
}

#[tokio::test]
async fn disabled_descriptor_resets_trigger_without_value_write() {
    let rig = rig();
    let mut descriptor = work_counter_descriptor();
    descriptor.enabled = false;

    let collector = collector(&rig, vec![descriptor]);
    let result = collector.collect(&machine(), "WorkCounterA_Counted").await;
    assert!(result.is_err());

    let paths = machine_paths(MACHINE);
    assert_eq!(
        rig.plane
            .node(&paths.field_extract("WorkCounterA_Counted")),
        Some(PlaneValue::Bool(false))
    );
    assert!(rig
        .plane
        .writes_to(&paths.field_value("WorkCounterA_Counted"))
        .is_empty());
    assert!(rig
        .plane
        .writes_to(&paths.field_lastupdated("WorkCounterA_Counted"))
        .is_empty());
}

#[tokio::test]
async fn unknown_field_resets_trigger() {
    let rig = rig();
    let collector = collector(&rig, vec![work_counter_descriptor()]);

    let result = collector.collect(&machine(), "NoSuchField").await;
    assert!(result.is_err());

    let paths = machine_paths(MACHINE);
    assert_eq!(
        rig.plane.node(&paths.field_extract("NoSuchField")),
        Some(PlaneValue::Bool(false))
    );
}

#[tokio::test]
async fn native_failure_keeps_session_hot_and_value_unchanged() {
    let rig = rig();
    let state = rig.connector.controller(MACHINE_IP);
    state.set_value(OspAddress::new(0, 3066, 0, 0, 8), "17");
    state.fail_gets(Some("axis unit offline"));

    let collector = collector(&rig, vec![work_counter_descriptor()]);
    let result = collector.collect(&machine(), "WorkCounterA_Counted").await;
    assert!(result.is_err());

    let paths = machine_paths(MACHINE);
    assert!(rig
        .plane
        .writes_to(&paths.field_value("WorkCounterA_Counted"))
        .is_empty());
    assert_eq!(
        rig.plane
            .node(&paths.field_extract("WorkCounterA_Counted")),
        Some(PlaneValue::Bool(false))
    );

    // The session survived the failure and serves the next trigger without
    // a reconnect.
    assert!(rig.pool.get(&machine()).is_some());
    state.fail_gets(None);
    collector
        .collect(&machine(), "WorkCounterA_Counted")
        .await
        .unwrap();
    assert_eq!(state.connect_count(), 1);
    assert_eq!(
        rig.plane.writes_to(&paths.field_value("WorkCounterA_Counted")),
        vec![PlaneValue::Double(17.0)]
    );
}

#[tokio::test]
async fn unparseable_value_collapses_to_zero() {
    let rig = rig();
    let state = rig.connector.controller(MACHINE_IP);
    state.set_value(OspAddress::new(0, 3066, 0, 0, 8), "not-a-number");

    let collector = collector(&rig, vec![work_counter_descriptor()]);
    collector
        .collect(&machine(), "WorkCounterA_Counted")
        .await
        .unwrap();

    let paths = machine_paths(MACHINE);
    assert_eq!(
        rig.plane.writes_to(&paths.field_value("WorkCounterA_Counted")),
        vec![PlaneValue::Double(0.0)]
    );
}
