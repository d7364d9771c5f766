// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dispatcher behaviour: routing, edges, single-flight coalescing.

use std::sync::Arc;
use std::time::Duration;

use oconn_core::control::Notification;
use oconn_core::types::PlaneValue;
use oconn_core::{
    Dispatcher, GeneralCollector, MacManCollector, OspAddress, ProgramExecutor, SessionPool,
};
use oconn_osp::SimConnector;
use oconn_tests::common::*;

struct Rig {
    plane: Arc<MockControlPlane>,
    connector: Arc<SimConnector>,
    dispatcher: Arc<Dispatcher>,
    _dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let plane = Arc::new(MockControlPlane::new());
    seed_machine(&plane, MACHINE, MACHINE_IP);

    let connector = Arc::new(SimConnector::new());
    let pool = Arc::new(SessionPool::new(connector.clone(), plane.clone()));
    let sink = Arc::new(MemorySink::new());
    let dir = tempfile::tempdir().unwrap();

    let general = Arc::new(GeneralCollector::new(
        plane.clone(),
        pool.clone(),
        registry(vec![work_counter_descriptor()]),
    ));
    let macman = Arc::new(MacManCollector::new(plane.clone(), pool.clone(), sink));
    let program = Arc::new(
        ProgramExecutor::new(plane.clone(), pool)
            .with_staging_root(dir.path().join("stage"))
            .with_dump_dir(dir.path()),
    );
    let dispatcher = Arc::new(Dispatcher::new(general, macman, program));

    Rig {
        plane,
        connector,
        dispatcher,
        _dir: dir,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn rising_edge_runs_the_general_collector() {
    let rig = rig();
    rig.connector
        .controller(MACHINE_IP)
        .set_value(OspAddress::new(0, 3066, 0, 0, 8), "5");

    let extract = machine_paths(MACHINE).field_extract("WorkCounterA_Counted");
    rig.dispatcher
        .handle(Notification::new(extract.clone(), PlaneValue::Bool(true)));
    settle().await;

    assert_eq!(
        rig.plane.writes_to(&machine_paths(MACHINE).field_value("WorkCounterA_Counted")),
        vec![PlaneValue::Double(5.0)]
    );
    assert_eq!(rig.plane.node(&extract), Some(PlaneValue::Bool(false)));
}

#[tokio::test]
async fn falling_edge_is_ignored_for_collection_triggers() {
    let rig = rig();
    let extract = machine_paths(MACHINE).field_extract("WorkCounterA_Counted");

    rig.dispatcher
        .handle(Notification::new(extract, PlaneValue::Bool(false)));
    settle().await;

    assert!(rig.plane.write_history().is_empty());
}

#[tokio::test]
async fn non_trigger_nodes_are_dropped() {
    let rig = rig();

    rig.dispatcher.handle(Notification::new(
        machine_paths(MACHINE).connected(),
        PlaneValue::Int32(1),
    ));
    rig.dispatcher.handle(Notification::new(
        machine_paths(MACHINE).field_value("WorkCounterA_Counted"),
        PlaneValue::Double(1.0),
    ));
    settle().await;

    assert!(rig.plane.write_history().is_empty());
}

#[tokio::test]
async fn bouncing_trigger_coalesces_to_one_extra_run() {
    let rig = rig();
    rig.connector
        .controller(MACHINE_IP)
        .set_value(OspAddress::new(0, 3066, 0, 0, 8), "5");

    let extract = machine_paths(MACHINE).field_extract("WorkCounterA_Counted");

    // Three rising edges before the first workflow gets to run: the first
    // starts a flight, the second coalesces, the third drops.
    for _ in 0..3 {
        rig.dispatcher
            .handle(Notification::new(extract.clone(), PlaneValue::Bool(true)));
    }
    settle().await;

    let value_writes = rig
        .plane
        .writes_to(&machine_paths(MACHINE).field_value("WorkCounterA_Counted"));
    assert_eq!(value_writes.len(), 2);
}

#[tokio::test]
async fn program_ctrl_edges_route_to_the_executor() {
    let rig = rig();
    let paths = machine_paths(MACHINE);
    rig.plane
        .set_node(&paths.pm_main_file(), PlaneValue::String("P001.MIN".into()));
    rig.plane
        .set_node(&paths.pm_filepath(), PlaneValue::String(String::new()));

    // Rising edge: the workflow runs (no staging needed, selection issued).
    rig.dispatcher
        .handle(Notification::new(paths.pm_ctrl(), PlaneValue::Bool(true)));
    settle().await;

    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    assert_eq!(
        rig.plane.node(&paths.pm_exception()),
        Some(PlaneValue::String(String::new()))
    );

    // Falling edge: Stat cleared, nothing else.
    rig.dispatcher
        .handle(Notification::new(paths.pm_ctrl(), PlaneValue::Bool(false)));
    settle().await;
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(false)));
}

#[tokio::test]
async fn stopped_dispatcher_drops_new_work() {
    let rig = rig();
    rig.dispatcher.stop_accepting();
    assert!(!rig.dispatcher.is_accepting());

    rig.dispatcher.handle(Notification::new(
        machine_paths(MACHINE).field_extract("WorkCounterA_Counted"),
        PlaneValue::Bool(true),
    ));
    settle().await;

    assert!(rig.plane.write_history().is_empty());
}
