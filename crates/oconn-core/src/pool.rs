// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Machine session pool.
//!
//! One persistent native session per machine, opened lazily on first use and
//! closed only at shutdown or on an explicit disconnect. The pool enforces
//! three invariants:
//!
//! - at most one session exists per machine at any moment;
//! - concurrent acquisitions for one machine collapse to a single open
//!   attempt (a sentinel entry in the map makes observers back off);
//! - every call through a session is serialized by that machine's mutex.
//!
//! Transient data-call failures never close a session. Reconnect churn is
//! the primary destabilizer of these controllers, so a session, once open,
//! stays hot until teardown.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex as PlainMutex;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::address::MachinePaths;
use crate::control::{read_string, ControlPlane};
use crate::error::{SessionError, SessionResult};
use crate::osp::{OspConnector, OspSession};
use crate::types::{MachineName, PlaneValue, SessionState};

/// How long an observer backs off before re-checking a `Connecting` sentinel.
const SENTINEL_BACKOFF: Duration = Duration::from_millis(100);

// =============================================================================
// MachineSession
// =============================================================================

/// A pooled session for one machine.
///
/// All native calls go through [`lock`], which serializes access per
/// machine. Different machines run in parallel; operations on the same
/// machine never overlap.
///
/// [`lock`]: MachineSession::lock
pub struct MachineSession {
    name: MachineName,
    ip: String,
    inner: Mutex<Box<dyn OspSession>>,
}

impl MachineSession {
    fn new(name: MachineName, ip: String, session: Box<dyn OspSession>) -> Self {
        Self {
            name,
            ip,
            inner: Mutex::new(session),
        }
    }

    /// Returns the machine name.
    pub fn machine(&self) -> &MachineName {
        &self.name
    }

    /// Returns the controller IP the session was opened against.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Acquires the per-machine mutex, yielding exclusive access to the
    /// native session. Hold the guard for the whole unit of work: a single
    /// `GetByString` for a general collection, the full screen sweep for
    /// MacMan.
    pub async fn lock(&self) -> MutexGuard<'_, Box<dyn OspSession>> {
        self.inner.lock().await
    }
}

impl std::fmt::Debug for MachineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineSession")
            .field("machine", &self.name)
            .field("ip", &self.ip)
            .finish()
    }
}

// =============================================================================
// SessionPool
// =============================================================================

enum PoolSlot {
    /// An open attempt is in flight; observers back off and re-check.
    Connecting,
    /// The machine's one open session.
    Open(Arc<MachineSession>),
}

/// The pool of native sessions, keyed by machine name.
pub struct SessionPool {
    connector: Arc<dyn OspConnector>,
    plane: Arc<dyn ControlPlane>,
    // Short-held lock: only map bookkeeping happens under it, never a
    // native call.
    slots: PlainMutex<HashMap<String, PoolSlot>>,
    // Machines whose last open attempt failed. A failed open leaves the
    // session map unchanged; the next dispatch that needs the machine
    // retries.
    failed: PlainMutex<HashSet<String>>,
}

impl SessionPool {
    /// Creates an empty pool.
    pub fn new(connector: Arc<dyn OspConnector>, plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            connector,
            plane,
            slots: PlainMutex::new(HashMap::new()),
            failed: PlainMutex::new(HashSet::new()),
        }
    }

    /// Returns the existing open session, or opens one.
    ///
    /// A second caller arriving during an open attempt waits on the
    /// sentinel and then sees the first attempt's result: the opened
    /// session, or a connect error.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoAddress`] when `MachineConfig.IPAddress` is empty
    ///   or unreadable; the disconnected mirror is updated.
    /// - [`SessionError::ConnectFailed`] when the native connect fails; the
    ///   pool is left unchanged and the next dispatch retries.
    pub async fn acquire(&self, machine: &MachineName) -> SessionResult<Arc<MachineSession>> {
        loop {
            enum Plan {
                Use(Arc<MachineSession>),
                Wait,
                Open,
            }

            let plan = {
                let mut slots = self.slots.lock();
                match slots.get(machine.as_str()) {
                    Some(PoolSlot::Open(session)) => Plan::Use(session.clone()),
                    Some(PoolSlot::Connecting) => Plan::Wait,
                    None => {
                        slots.insert(machine.as_str().to_string(), PoolSlot::Connecting);
                        Plan::Open
                    }
                }
            };

            match plan {
                Plan::Use(session) => return Ok(session),
                Plan::Wait => {
                    tokio::time::sleep(SENTINEL_BACKOFF).await;
                    // Re-check: the opener resolved the sentinel one way or
                    // the other. If the slot is gone, the open failed and
                    // this caller sees that result.
                    let resolved = {
                        let slots = self.slots.lock();
                        match slots.get(machine.as_str()) {
                            Some(PoolSlot::Open(session)) => Some(Ok(session.clone())),
                            Some(PoolSlot::Connecting) => None,
                            None => Some(Err(SessionError::connect_failed(
                                machine.clone(),
                                "concurrent connect attempt failed",
                            ))),
                        }
                    };
                    if let Some(result) = resolved {
                        return result;
                    }
                    // Still connecting; keep waiting.
                }
                Plan::Open => {
                    let result = self.open(machine).await;
                    let mut slots = self.slots.lock();
                    match result {
                        Ok(session) => {
                            slots.insert(
                                machine.as_str().to_string(),
                                PoolSlot::Open(session.clone()),
                            );
                            self.failed.lock().remove(machine.as_str());
                            return Ok(session);
                        }
                        Err(e) => {
                            slots.remove(machine.as_str());
                            self.failed.lock().insert(machine.as_str().to_string());
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Non-blocking lookup; never opens.
    pub fn get(&self, machine: &MachineName) -> Option<Arc<MachineSession>> {
        let slots = self.slots.lock();
        match slots.get(machine.as_str()) {
            Some(PoolSlot::Open(session)) => Some(session.clone()),
            _ => None,
        }
    }

    /// Returns the pool state of a machine.
    pub fn state(&self, machine: &MachineName) -> SessionState {
        let slots = self.slots.lock();
        match slots.get(machine.as_str()) {
            Some(PoolSlot::Open(_)) => SessionState::Open,
            Some(PoolSlot::Connecting) => SessionState::Connecting,
            None if self.failed.lock().contains(machine.as_str()) => SessionState::Failed,
            None => SessionState::Absent,
        }
    }

    /// Tears down one machine's session. Used only at shutdown and for the
    /// program-management forced reset.
    pub async fn disconnect(&self, machine: &MachineName) {
        let removed = {
            let mut slots = self.slots.lock();
            slots.remove(machine.as_str())
        };

        if let Some(PoolSlot::Open(session)) = removed {
            session.lock().await.disconnect().await;
            self.mirror_disconnected(machine).await;
            info!(machine = %machine, "Disconnected machine session");
        }
    }

    /// Tears down every session. Called once at process shutdown.
    pub async fn shutdown(&self) {
        let names: Vec<MachineName> = {
            let slots = self.slots.lock();
            slots.keys().map(|k| MachineName::new(k.clone())).collect()
        };
        for name in names {
            self.disconnect(&name).await;
        }
    }

    /// Opens a session: reads the machine's IP, invokes the native connect
    /// for its kind, and updates the connection-status mirror either way.
    async fn open(&self, machine: &MachineName) -> SessionResult<Arc<MachineSession>> {
        let paths = MachinePaths::new(machine.clone());

        let ip = match read_string(self.plane.as_ref(), &paths.config_ip_address()).await {
            Some(ip) => ip,
            None => {
                warn!(machine = %machine, "MachineConfig.IPAddress is empty or unreadable");
                self.mirror_disconnected(machine).await;
                return Err(SessionError::no_address(machine.clone()));
            }
        };

        let kind = machine.kind();
        debug!(machine = %machine, %ip, %kind, connector = self.connector.name(), "Opening native session");

        match self.connector.connect(kind, &ip).await {
            Ok(session) => {
                self.mirror_connected(machine).await;
                info!(machine = %machine, %ip, "Native session open");
                Ok(Arc::new(MachineSession::new(machine.clone(), ip, session)))
            }
            Err(e) => {
                // Release any half-open handle is the connector's concern;
                // the pool only records the failure.
                warn!(machine = %machine, %ip, error = %e, "Native connect failed");
                self.mirror_disconnected(machine).await;
                Err(e)
            }
        }
    }

    /// On any state change exactly one mirror node holds the current Unix
    /// second and the other holds 0.
    async fn mirror_connected(&self, machine: &MachineName) {
        let paths = MachinePaths::new(machine.clone());
        let now = Utc::now().timestamp() as i32;
        if !self.plane.write(&paths.connected(), PlaneValue::Int32(now)).await {
            warn!(machine = %machine, "Failed to write Connected mirror");
        }
        if !self.plane.write(&paths.disconnected(), PlaneValue::Int32(0)).await {
            warn!(machine = %machine, "Failed to write DisConnected mirror");
        }
    }

    async fn mirror_disconnected(&self, machine: &MachineName) {
        let paths = MachinePaths::new(machine.clone());
        let now = Utc::now().timestamp() as i32;
        if !self.plane.write(&paths.disconnected(), PlaneValue::Int32(now)).await {
            warn!(machine = %machine, "Failed to write DisConnected mirror");
        }
        if !self.plane.write(&paths.connected(), PlaneValue::Int32(0)).await {
            warn!(machine = %machine, "Failed to write Connected mirror");
        }
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("SessionPool")
            .field("machines", &slots.len())
            .finish()
    }
}
