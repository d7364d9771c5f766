// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session pool invariants: one session per machine, single-flight opening,
//! status mirror, never-close-on-error.

use std::sync::Arc;
use std::time::Duration;

use oconn_core::types::{MachineName, PlaneValue, SessionState};
use oconn_core::SessionPool;
use oconn_osp::SimConnector;
use oconn_tests::common::*;

fn machine() -> MachineName {
    MachineName::new(MACHINE)
}

fn pool_rig() -> (Arc<MockControlPlane>, Arc<SimConnector>, Arc<SessionPool>) {
    let plane = Arc::new(MockControlPlane::new());
    seed_machine(&plane, MACHINE, MACHINE_IP);
    let connector = Arc::new(SimConnector::new());
    let pool = Arc::new(SessionPool::new(connector.clone(), plane.clone()));
    (plane, connector, pool)
}

#[tokio::test]
async fn acquire_reuses_the_open_session() {
    let (_plane, connector, pool) = pool_rig();

    let first = pool.acquire(&machine()).await.unwrap();
    let second = pool.acquire(&machine()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(connector.controller(MACHINE_IP).connect_count(), 1);
    assert_eq!(pool.state(&machine()), SessionState::Open);
}

#[tokio::test]
async fn concurrent_acquires_collapse_to_one_connect() {
    let (_plane, connector, pool) = pool_rig();
    connector
        .controller(MACHINE_IP)
        .set_connect_latency(Duration::from_millis(50));

    let m = machine();
    let (a, b) = tokio::join!(pool.acquire(&m), pool.acquire(&m));
    let a = a.unwrap();
    let b = b.unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(connector.controller(MACHINE_IP).connect_count(), 1);
}

#[tokio::test]
async fn waiter_sees_the_openers_failure() {
    let (_plane, connector, pool) = pool_rig();
    let state = connector.controller(MACHINE_IP);
    state.set_connect_latency(Duration::from_millis(50));
    state.refuse_connections(true);

    let m = machine();
    let (a, b) = tokio::join!(pool.acquire(&m), pool.acquire(&m));
    assert!(a.is_err());
    assert!(b.is_err());

    // The failed attempt leaves no session behind; the next dispatch
    // retries from scratch.
    assert_eq!(pool.state(&machine()), SessionState::Failed);
    state.refuse_connections(false);
    state.set_connect_latency(Duration::ZERO);
    assert!(pool.acquire(&machine()).await.is_ok());
}

#[tokio::test]
async fn missing_ip_is_an_error_with_disconnected_mirror() {
    let plane = Arc::new(MockControlPlane::new());
    let paths = seed_machine(&plane, MACHINE, MACHINE_IP);
    plane.remove_node(&paths.config_ip_address());

    let connector = Arc::new(SimConnector::new());
    let pool = SessionPool::new(connector.clone(), plane.clone());

    assert!(pool.acquire(&machine()).await.is_err());
    assert_eq!(connector.controller(MACHINE_IP).connect_count(), 0);

    match plane.node(&paths.disconnected()) {
        Some(PlaneValue::Int32(secs)) => assert!(secs > 0),
        other => panic!("DisConnected mirror missing: {:?}", other),
    }
    assert_eq!(plane.node(&paths.connected()), Some(PlaneValue::Int32(0)));
}

#[tokio::test]
async fn mirror_holds_exactly_one_live_timestamp() {
    let (plane, connector, pool) = pool_rig();
    let paths = machine_paths(MACHINE);

    // Refused connect: DisConnected live, Connected zero.
    connector.controller(MACHINE_IP).refuse_connections(true);
    assert!(pool.acquire(&machine()).await.is_err());
    assert!(matches!(plane.node(&paths.disconnected()), Some(PlaneValue::Int32(s)) if s > 0));
    assert_eq!(plane.node(&paths.connected()), Some(PlaneValue::Int32(0)));

    // Successful connect flips the pair.
    connector.controller(MACHINE_IP).refuse_connections(false);
    pool.acquire(&machine()).await.unwrap();
    assert!(matches!(plane.node(&paths.connected()), Some(PlaneValue::Int32(s)) if s > 0));
    assert_eq!(plane.node(&paths.disconnected()), Some(PlaneValue::Int32(0)));
}

#[tokio::test]
async fn disconnect_tears_down_and_reports() {
    let (plane, connector, pool) = pool_rig();
    pool.acquire(&machine()).await.unwrap();

    pool.disconnect(&machine()).await;

    assert!(pool.get(&machine()).is_none());
    assert_eq!(pool.state(&machine()), SessionState::Absent);
    assert_eq!(connector.controller(MACHINE_IP).disconnect_count(), 1);

    let paths = machine_paths(MACHINE);
    assert!(matches!(plane.node(&paths.disconnected()), Some(PlaneValue::Int32(s)) if s > 0));
}

#[tokio::test]
async fn shutdown_closes_every_session() {
    let plane = Arc::new(MockControlPlane::new());
    seed_machine(&plane, MACHINE, MACHINE_IP);
    seed_machine(&plane, "67890 - LB3000 Lathe", "192.168.1.20");

    let connector = Arc::new(SimConnector::new());
    let pool = SessionPool::new(connector.clone(), plane.clone());

    pool.acquire(&machine()).await.unwrap();
    pool.acquire(&MachineName::new("67890 - LB3000 Lathe"))
        .await
        .unwrap();

    pool.shutdown().await;

    assert!(pool.get(&machine()).is_none());
    assert_eq!(connector.controller(MACHINE_IP).disconnect_count(), 1);
    assert_eq!(connector.controller("192.168.1.20").disconnect_count(), 1);
}
