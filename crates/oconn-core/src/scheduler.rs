// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Extract scheduler.
//!
//! Periodically raises every machine's `Data.MacManData.extract` trigger,
//! driving the MacMan pipeline on a wall-clock cadence. Ticks are
//! fire-and-forget: each tick's work runs on its own task, so a slow fleet
//! pass never delays the next tick. A zero interval disables the scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::address::{MachinePaths, NodeId, MACHINES_ROOT};
use crate::control::ControlPlane;
use crate::types::{MachineName, PlaneValue};

/// The periodic MacMan trigger scheduler.
pub struct ExtractScheduler {
    plane: Arc<dyn ControlPlane>,
    interval: Duration,
}

impl ExtractScheduler {
    /// Creates a scheduler. A zero `interval` disables it.
    pub fn new(plane: Arc<dyn ControlPlane>, interval: Duration) -> Self {
        Self { plane, interval }
    }

    /// Starts the tick loop. Returns `None` when disabled.
    pub fn start(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if self.interval.is_zero() {
            info!("Extract scheduler disabled (zero interval)");
            return None;
        }

        info!(interval_secs = self.interval.as_secs(), "Extract scheduler started");

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first interval tick fires immediately; skip it so the
            // first trigger lands one full period after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let scheduler = self.clone();
                tokio::spawn(async move {
                    scheduler.fire().await;
                });
            }
        }))
    }

    /// One tick: raise every machine's MacMan trigger.
    pub async fn fire(&self) {
        let root = NodeId::new(MACHINES_ROOT);
        let machines = match self.plane.browse(&root).await {
            Ok(children) => children,
            Err(e) => {
                warn!(error = %e, "Scheduler browse failed, skipping tick");
                return;
            }
        };

        let mut fired = 0usize;
        for child in machines {
            let name = MachineName::new(child.browse_name);
            if name.is_system() {
                continue;
            }
            if self.fire_machine(&name).await {
                fired += 1;
            }
        }
        debug!(fired, "Extract tick complete");
    }

    /// Validates the trigger node and writes `true` to it. The node must be
    /// readable and boolean-like; anything else is skipped.
    async fn fire_machine(&self, machine: &MachineName) -> bool {
        let extract = MachinePaths::new(machine.clone()).macman_extract();

        match self.plane.read(&extract).await {
            Some(value) if value.is_boolean_like() => {
                if self.plane.write(&extract, PlaneValue::Bool(true)).await {
                    debug!(machine = %machine, "MacMan trigger raised");
                    true
                } else {
                    warn!(machine = %machine, "MacMan trigger write failed");
                    false
                }
            }
            Some(value) => {
                warn!(
                    machine = %machine,
                    type_name = value.type_name(),
                    "MacMan trigger is not boolean-like, skipped"
                );
                false
            }
            None => {
                debug!(machine = %machine, "MacMan trigger unreadable, skipped");
                false
            }
        }
    }
}
