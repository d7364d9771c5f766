// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! End-to-end program management: staging, selection, result write-back.

use std::sync::Arc;

use oconn_core::types::{MachineName, PlaneValue};
use oconn_core::{ProgramExecutor, SessionPool};
use oconn_osp::SimConnector;
use oconn_tests::common::*;

struct Rig {
    plane: Arc<MockControlPlane>,
    connector: Arc<SimConnector>,
    executor: ProgramExecutor,
    dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let plane = Arc::new(MockControlPlane::new());
    seed_machine(&plane, MACHINE, MACHINE_IP);
    let connector = Arc::new(SimConnector::new());
    let pool = Arc::new(SessionPool::new(connector.clone(), plane.clone()));
    let dir = tempfile::tempdir().unwrap();
    let executor = ProgramExecutor::new(plane.clone(), pool)
        .with_staging_root(dir.path().join("stage"))
        .with_dump_dir(dir.path());
    Rig {
        plane,
        connector,
        executor,
        dir,
    }
}

fn machine() -> MachineName {
    MachineName::new(MACHINE)
}

fn set_request(rig: &Rig, filepath: &str, main_file: &str) {
    let paths = machine_paths(MACHINE);
    rig.plane
        .set_node(&paths.pm_filepath(), PlaneValue::String(filepath.to_string()));
    rig.plane
        .set_node(&paths.pm_id(), PlaneValue::String("77".to_string()));
    rig.plane
        .set_node(&paths.pm_main_file(), PlaneValue::String(main_file.to_string()));
}

#[tokio::test]
async fn happy_path_stages_selects_and_reports() {
    let rig = rig();
    let source = rig.dir.path().join("P001.MIN");
    std::fs::write(&source, "G00 X0 Y0\nM30\n").unwrap();
    set_request(&rig, source.to_str().unwrap(), "P001.MIN");

    rig.executor.execute(&machine()).await;

    // Staged copy under the per-IP directory, original name kept.
    let staged = rig.dir.path().join("stage").join(MACHINE_IP).join("P001.MIN");
    assert!(staged.is_file());

    // The controller saw exactly one selection command.
    let state = rig.connector.controller(MACHINE_IP);
    assert_eq!(
        state.select_calls(),
        vec![("P001.MIN".to_string(), String::new(), String::new(), 0)]
    );

    let paths = machine_paths(MACHINE);
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    assert_eq!(
        rig.plane.node(&paths.pm_exception()),
        Some(PlaneValue::String(String::new()))
    );
}

#[tokio::test]
async fn missing_source_reports_and_skips_selection() {
    let rig = rig();
    let missing = rig.dir.path().join("absent.MIN");
    set_request(&rig, missing.to_str().unwrap(), "absent.MIN");

    rig.executor.execute(&machine()).await;

    let paths = machine_paths(MACHINE);
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    assert_eq!(
        rig.plane.node(&paths.pm_exception()),
        Some(PlaneValue::String(format!(
            "File copy failed: Source file does not exist - {}",
            missing.display()
        )))
    );

    let state = rig.connector.controller(MACHINE_IP);
    assert!(state.select_calls().is_empty());
}

#[tokio::test]
async fn empty_filepath_skips_copy_but_still_selects() {
    let rig = rig();
    set_request(&rig, "", "P002.MIN");

    rig.executor.execute(&machine()).await;

    let state = rig.connector.controller(MACHINE_IP);
    assert_eq!(state.select_calls().len(), 1);

    let paths = machine_paths(MACHINE);
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    assert_eq!(
        rig.plane.node(&paths.pm_exception()),
        Some(PlaneValue::String(String::new()))
    );
}

#[tokio::test]
async fn empty_main_file_fails_without_selection() {
    let rig = rig();
    set_request(&rig, "", "");

    rig.executor.execute(&machine()).await;

    let state = rig.connector.controller(MACHINE_IP);
    assert!(state.select_calls().is_empty());

    let paths = machine_paths(MACHINE);
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    match rig.plane.node(&paths.pm_exception()) {
        Some(PlaneValue::String(s)) => assert!(!s.is_empty()),
        other => panic!("Exception should be a string, got {:?}", other),
    }
}

#[tokio::test]
async fn controller_rejection_becomes_the_exception_text() {
    let rig = rig();
    set_request(&rig, "", "P003.MIN");
    let state = rig.connector.controller(MACHINE_IP);
    state.set_select_outcome(3, "spindle running");

    rig.executor.execute(&machine()).await;

    let paths = machine_paths(MACHINE);
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    assert_eq!(
        rig.plane.node(&paths.pm_exception()),
        Some(PlaneValue::String("spindle running".to_string()))
    );
}

#[tokio::test]
async fn unexpected_failure_writes_a_crash_dump() {
    let rig = rig();
    // Make the staging root unusable: a plain file where the directory
    // tree should go.
    std::fs::write(rig.dir.path().join("stage"), "in the way").unwrap();
    set_request(&rig, "", "P004.MIN");

    rig.executor.execute(&machine()).await;

    let paths = machine_paths(MACHINE);
    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(true)));
    match rig.plane.node(&paths.pm_exception()) {
        Some(PlaneValue::String(s)) => {
            assert!(s.starts_with("Unexpected error in ProgramManagement:"), "{}", s)
        }
        other => panic!("Exception should be a string, got {:?}", other),
    }

    let dump = std::fs::read_dir(rig.dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .find(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.starts_with("Exception_") && name.ends_with("_12345.txt")
        });
    assert!(dump.is_some(), "crash dump file missing");
}

#[tokio::test]
async fn falling_edge_clears_stat_only() {
    let rig = rig();
    let paths = machine_paths(MACHINE);
    rig.plane.set_node(&paths.pm_stat(), PlaneValue::Bool(true));

    rig.executor.acknowledge(&machine()).await;

    assert_eq!(rig.plane.node(&paths.pm_stat()), Some(PlaneValue::Bool(false)));
    let state = rig.connector.controller(MACHINE_IP);
    assert!(state.select_calls().is_empty());
}
