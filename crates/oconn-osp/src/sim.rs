// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Simulated Okuma controller.
//!
//! An in-memory `OspSession` implementation with seedable counter values
//! and MacMan screen records, plus failure injection and call recording.
//! The simulator backs development runs (`OSPAPI_SIMULATE=true`) and every
//! integration test; the production COM binding implements the same seam.
//!
//! Address resolution mirrors the controller: exact five-tuple values are
//! checked first, then the MacMan screen tables. Unknown addresses read as
//! empty strings, which is what an idle controller returns.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use oconn_core::collector::macman::screens::ScreenSpec;
use oconn_core::error::{SessionError, SessionResult};
use oconn_core::osp::{CommandOutcome, OspAddress, OspConnector, OspSession};
use oconn_core::types::{MachineKind, ScreenKind};

use crate::codes::prog_id;

type AddressKey = (i32, i32, i32, i32, i32);

fn key(a: &OspAddress) -> AddressKey {
    (a.subsystem, a.major, a.subscript, a.minor, a.style)
}

// =============================================================================
// SimState
// =============================================================================

/// The state of one simulated controller, shared between the connector and
/// every session opened against it.
#[derive(Default)]
pub struct SimState {
    values: RwLock<HashMap<AddressKey, String>>,
    screens: RwLock<HashMap<ScreenKind, Vec<BTreeMap<String, String>>>>,

    refuse_connections: AtomicBool,
    fail_gets: RwLock<Option<String>>,
    select_outcome: Mutex<CommandOutcome>,
    get_latency: RwLock<Duration>,
    connect_latency: RwLock<Duration>,

    connects: AtomicU64,
    disconnects: AtomicU64,
    update_cycles: AtomicU64,
    get_calls: AtomicU64,
    select_calls: Mutex<Vec<(String, String, String, i32)>>,
}

impl SimState {
    /// Creates a fresh controller state. Commands succeed until configured
    /// otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw value at an exact address.
    pub fn set_value(&self, address: OspAddress, value: impl Into<String>) {
        self.values.write().insert(key(&address), value.into());
    }

    /// Seeds a screen's records, newest first. Each record is a map of
    /// field name (including the screen's date/time names) to raw string.
    pub fn seed_screen(&self, screen: ScreenKind, records: Vec<BTreeMap<String, String>>) {
        self.screens.write().insert(screen, records);
    }

    /// Makes subsequent connect attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    /// Makes every `GetByString` fail with the given binding message.
    pub fn fail_gets(&self, message: Option<&str>) {
        *self.fail_gets.write() = message.map(|m| m.to_string());
    }

    /// Sets the outcome of the next `SelectMainProgram` calls.
    pub fn set_select_outcome(&self, result: i32, error_message: &str) {
        *self.select_outcome.lock() = CommandOutcome::new(result, error_message);
    }

    /// Simulated latency per `GetByString` call.
    pub fn set_get_latency(&self, latency: Duration) {
        *self.get_latency.write() = latency;
    }

    /// Simulated latency per connect.
    pub fn set_connect_latency(&self, latency: Duration) {
        *self.connect_latency.write() = latency;
    }

    /// Number of connects served.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of disconnects served.
    pub fn disconnect_count(&self) -> u64 {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Number of update cycles run.
    pub fn update_cycle_count(&self) -> u64 {
        self.update_cycles.load(Ordering::SeqCst)
    }

    /// Number of `GetByString` calls served.
    pub fn get_call_count(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Recorded `SelectMainProgram` calls.
    pub fn select_calls(&self) -> Vec<(String, String, String, i32)> {
        self.select_calls.lock().clone()
    }

    /// Resolves an address against the seeded state.
    fn resolve(&self, address: &OspAddress) -> String {
        if let Some(v) = self.values.read().get(&key(address)) {
            return v.clone();
        }

        let screens = self.screens.read();

        // Count probes may be shared between screens (the machining report
        // and the alarm history read the same counter); report the largest
        // matching ledger.
        let mut probe_hit = false;
        let mut probe_max = 0usize;
        for kind in ScreenKind::ALL {
            let spec = ScreenSpec::of(kind);
            if spec.count_probe.as_ref() == Some(address) {
                probe_hit = true;
                probe_max = probe_max.max(screens.get(&kind).map_or(0, Vec::len));
            }
        }
        if probe_hit {
            return probe_max.to_string();
        }

        if address.subsystem == 1 && address.minor == 0 && address.style == 9 {
            for kind in ScreenKind::ALL {
                let spec = ScreenSpec::of(kind);
                let name = if address.major == spec.date.date_major {
                    Some(spec.date.date_name)
                } else if spec.date.time.map(|(_, m)| m) == Some(address.major) {
                    spec.date.time.map(|(n, _)| n)
                } else {
                    spec.fields
                        .iter()
                        .find(|f| f.major == address.major)
                        .map(|f| f.name)
                };

                if let Some(name) = name {
                    return screens
                        .get(&kind)
                        .and_then(|records| records.get(address.subscript as usize))
                        .and_then(|record| record.get(name))
                        .cloned()
                        .unwrap_or_default();
                }
            }
        }

        String::new()
    }
}

// =============================================================================
// SimSession
// =============================================================================

/// A session handle onto a simulated controller.
pub struct SimSession {
    state: Arc<SimState>,
}

#[async_trait]
impl OspSession for SimSession {
    async fn get_by_string(&mut self, address: &OspAddress) -> SessionResult<String> {
        self.state.get_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.state.get_latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = self.state.fail_gets.read().clone() {
            return Err(SessionError::native(message));
        }

        Ok(self.state.resolve(address))
    }

    async fn start_update(&mut self, _group: i32, _part: i32) -> SessionResult<()> {
        Ok(())
    }

    async fn wait_update_end(&mut self) -> SessionResult<()> {
        self.state.update_cycles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn select_main_program(
        &mut self,
        main_file: &str,
        sub_file: &str,
        program_name: &str,
        mode: i32,
    ) -> SessionResult<CommandOutcome> {
        self.state.select_calls.lock().push((
            main_file.to_string(),
            sub_file.to_string(),
            program_name.to_string(),
            mode,
        ));
        Ok(self.state.select_outcome.lock().clone())
    }

    async fn disconnect(&mut self) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// SimConnector
// =============================================================================

/// Opens sessions onto per-IP simulated controllers. Controllers are
/// created on first reference, so tests can seed them before the first
/// connect.
#[derive(Default)]
pub struct SimConnector {
    controllers: DashMap<String, Arc<SimState>>,
}

impl SimConnector {
    /// Creates an empty fleet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns (creating if needed) the controller state for an IP.
    pub fn controller(&self, ip: &str) -> Arc<SimState> {
        self.controllers
            .entry(ip.to_string())
            .or_insert_with(|| Arc::new(SimState::new()))
            .clone()
    }
}

#[async_trait]
impl OspConnector for SimConnector {
    async fn connect(&self, kind: MachineKind, ip: &str) -> SessionResult<Box<dyn OspSession>> {
        let state = self.controller(ip);

        let latency = *state.connect_latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if state.refuse_connections.load(Ordering::SeqCst) {
            return Err(SessionError::connect_failed(
                oconn_core::types::MachineName::new(ip),
                format!("{}: connection refused", prog_id(kind)),
            ));
        }

        state.connects.fetch_add(1, Ordering::SeqCst);
        debug!(%ip, prog_id = prog_id(kind), "Simulated controller connected");
        Ok(Box::new(SimSession { state }))
    }

    fn name(&self) -> &str {
        "sim"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_exact_values() {
        let connector = SimConnector::new();
        let state = connector.controller("10.0.0.1");
        state.set_value(OspAddress::new(0, 3066, 0, 0, 8), "  42.50  ");

        let mut session = connector
            .connect(MachineKind::MachiningCenter, "10.0.0.1")
            .await
            .unwrap();
        let v = session
            .get_by_string(&OspAddress::new(0, 3066, 0, 0, 8))
            .await
            .unwrap();
        assert_eq!(v, "  42.50  ");
        assert_eq!(state.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_screen_resolution() {
        let connector = SimConnector::new();
        let state = connector.controller("10.0.0.1");
        state.seed_screen(
            ScreenKind::AlarmHistory,
            vec![
                record(&[("Date", "20250901"), ("Time", "080000"), ("AlarmNumber", "803")]),
                record(&[("Date", "20250830"), ("Time", "090000"), ("AlarmNumber", "121")]),
            ],
        );

        let mut session = connector
            .connect(MachineKind::MachiningCenter, "10.0.0.1")
            .await
            .unwrap();

        // Count probe sees the alarm ledger.
        let count = session
            .get_by_string(&OspAddress::new(1, 2094, 0, 0, 9))
            .await
            .unwrap();
        assert_eq!(count, "2");

        // Index 1 is the older record.
        let date = session
            .get_by_string(&OspAddress::new(1, 5063, 1, 0, 9))
            .await
            .unwrap();
        assert_eq!(date, "20250830");

        let alarm = session
            .get_by_string(&OspAddress::new(1, 5070, 0, 0, 9))
            .await
            .unwrap();
        assert_eq!(alarm, "803");

        // Out-of-range and unseeded reads are empty, like an idle controller.
        let beyond = session
            .get_by_string(&OspAddress::new(1, 5063, 9, 0, 9))
            .await
            .unwrap();
        assert_eq!(beyond, "");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let connector = SimConnector::new();
        let state = connector.controller("10.0.0.2");
        state.fail_gets(Some("axis unit offline"));

        let mut session = connector
            .connect(MachineKind::Lathe, "10.0.0.2")
            .await
            .unwrap();
        let err = session
            .get_by_string(&OspAddress::new(0, 1, 0, 0, 8))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("axis unit offline"));

        state.refuse_connections(true);
        assert!(connector.connect(MachineKind::Lathe, "10.0.0.2").await.is_err());
    }

    #[tokio::test]
    async fn test_select_recording() {
        let connector = SimConnector::new();
        let state = connector.controller("10.0.0.3");

        let mut session = connector
            .connect(MachineKind::MachiningCenter, "10.0.0.3")
            .await
            .unwrap();
        let outcome = session
            .select_main_program("P001.MIN", "", "", 0)
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            state.select_calls(),
            vec![("P001.MIN".to_string(), String::new(), String::new(), 0)]
        );
    }
}
