// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Notification dispatcher.
//!
//! Turns control-plane change notifications into typed work items and
//! routes them to the collectors. Classification order and edge semantics
//! live in [`crate::trigger`]; this module owns scheduling:
//!
//! - work runs on spawned tasks, never on the notification delivery path;
//! - per trigger node, at most one workflow runs at a time (single-flight);
//! - a rising edge arriving mid-flight coalesces into exactly one follow-up
//!   run; further edges during the same flight are dropped. Triggers bounce
//!   during write-back, and this absorbs the bounce.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::address::NodeId;
use crate::collector::{GeneralCollector, MacManCollector, ProgramExecutor};
use crate::control::Notification;
use crate::trigger::Trigger;
use crate::types::MachineName;

// =============================================================================
// Work Items
// =============================================================================

/// A routed unit of work. Re-runnable: a coalesced edge re-executes the
/// same item.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkItem {
    General { machine: MachineName, field: String },
    MacMan { machine: MachineName },
    Program { machine: MachineName },
}

#[derive(Default)]
struct FlightState {
    running: bool,
    pending: bool,
}

type FlightTable = Arc<DashMap<String, FlightState>>;

/// Marks the node in flight. Returns `false` when a flight exists; in that
/// case one follow-up run is recorded and extra edges drop.
fn begin(flights: &FlightTable, key: &str) -> bool {
    let mut state = flights.entry(key.to_string()).or_default();
    if state.running {
        state.pending = true;
        false
    } else {
        state.running = true;
        true
    }
}

/// Finishes a run. Returns `true` when a coalesced edge asks for one more
/// run.
fn rearm(flights: &FlightTable, key: &str) -> bool {
    let Some(mut state) = flights.get_mut(key) else {
        return false;
    };
    if state.pending {
        state.pending = false;
        true
    } else {
        state.running = false;
        false
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes notifications into collector workflows with per-node
/// single-flight.
pub struct Dispatcher {
    general: Arc<GeneralCollector>,
    macman: Arc<MacManCollector>,
    program: Arc<ProgramExecutor>,
    flights: FlightTable,
    accepting: AtomicBool,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(
        general: Arc<GeneralCollector>,
        macman: Arc<MacManCollector>,
        program: Arc<ProgramExecutor>,
    ) -> Self {
        Self {
            general,
            macman,
            program,
            flights: Arc::new(DashMap::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Stops accepting new work. In-flight workflows finish on their own.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while new notifications are accepted.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Handles one change notification. Cheap; the actual workflow is
    /// spawned.
    pub fn handle(&self, notification: Notification) {
        if !self.is_accepting() {
            debug!(node = %notification.node, "Shutting down, notification dropped");
            return;
        }

        let Some(trigger) = Trigger::classify(&notification.node) else {
            debug!(node = %notification.node, "Not a trigger node, dropped");
            return;
        };

        let rising = notification.value.as_bool() == Some(true);

        match trigger {
            Trigger::ProgramCtrl { machine } => {
                if rising {
                    self.launch(notification.node, WorkItem::Program { machine });
                } else {
                    // Falling edge acknowledges: Stat := false, nothing else.
                    let program = self.program.clone();
                    tokio::spawn(async move {
                        program.acknowledge(&machine).await;
                    });
                }
            }
            Trigger::MacMan { machine } => {
                if rising {
                    self.launch(notification.node, WorkItem::MacMan { machine });
                }
            }
            Trigger::General { machine, field } => {
                if rising {
                    self.launch(notification.node, WorkItem::General { machine, field });
                }
            }
        }
    }

    /// Starts a workflow under single-flight, or coalesces into the one
    /// already running.
    fn launch(&self, node: NodeId, item: WorkItem) {
        let key = node.as_str().to_string();

        if !begin(&self.flights, &key) {
            debug!(node = %node, "Workflow already in flight, coalesced");
            return;
        }

        let flights = self.flights.clone();
        let general = self.general.clone();
        let macman = self.macman.clone();
        let program = self.program.clone();

        tokio::spawn(async move {
            loop {
                run_item(&general, &macman, &program, &item).await;
                if !rearm(&flights, &key) {
                    break;
                }
                debug!(node = %key, "Re-running coalesced trigger");
            }
        });
    }
}

async fn run_item(
    general: &GeneralCollector,
    macman: &MacManCollector,
    program: &ProgramExecutor,
    item: &WorkItem,
) {
    match item {
        WorkItem::General { machine, field } => {
            if let Err(e) = general.collect(machine, field).await {
                warn!(machine = %machine, field = %field, error = %e, "General collection failed");
            }
        }
        WorkItem::MacMan { machine } => {
            if let Err(e) = macman.collect(machine).await {
                warn!(machine = %machine, error = %e, "MacMan collection failed");
            }
        }
        WorkItem::Program { machine } => {
            // The executor records its own outcome into Stat/Exception.
            program.execute(machine).await;
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("accepting", &self.is_accepting())
            .field("tracked_nodes", &self.flights.len())
            .finish()
    }
}
