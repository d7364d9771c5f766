// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! General collector: one trigger, one controller value, one write-back.
//!
//! A rising edge on `...<M>.Data.<Field>.extract` resolves `<Field>` against
//! the descriptor registry, reads the value through the machine's session,
//! and writes back `value`, `lastupdated`, and the trigger reset.
//!
//! Write order is extract reset, then `lastupdated`, then `value`.
//! Individual write failures are logged and do not abort the remaining
//! writes.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::address::MachinePaths;
use crate::control::ControlPlane;
use crate::error::{CollectError, CollectResult};
use crate::pool::SessionPool;
use crate::registry::DescriptorRegistry;
use crate::types::{MachineName, PlaneValue};

/// Executes general collections.
pub struct GeneralCollector {
    plane: Arc<dyn ControlPlane>,
    pool: Arc<SessionPool>,
    registry: Arc<DescriptorRegistry>,
}

impl GeneralCollector {
    /// Creates a collector.
    pub fn new(
        plane: Arc<dyn ControlPlane>,
        pool: Arc<SessionPool>,
        registry: Arc<DescriptorRegistry>,
    ) -> Self {
        Self {
            plane,
            pool,
            registry,
        }
    }

    /// Runs one collection for a rising-edge trigger.
    ///
    /// The trigger is reset on every exit path; it is the one thing this
    /// workflow owns unconditionally.
    pub async fn collect(&self, machine: &MachineName, field: &str) -> CollectResult<()> {
        let paths = MachinePaths::new(machine.clone());
        let extract = paths.field_extract(field);

        let descriptor = match self.registry.resolve(field) {
            Some(d) => d.clone(),
            None => {
                warn!(machine = %machine, field, "No API descriptor for trigger field");
                self.reset_trigger(&extract).await;
                return Err(CollectError::unknown_field(field));
            }
        };

        if !descriptor.enabled {
            warn!(machine = %machine, field, "API descriptor is disabled");
            self.reset_trigger(&extract).await;
            return Err(CollectError::disabled(field));
        }

        let session = match self.pool.acquire(machine).await {
            Ok(s) => s,
            Err(e) => {
                self.reset_trigger(&extract).await;
                return Err(e.into());
            }
        };

        let raw = {
            let mut api = session.lock().await;
            api.get_by_string(&descriptor.address).await
        };

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                // The binding reported an error: leave `value` unchanged.
                // The session stays open regardless.
                warn!(machine = %machine, field, error = %e, "GetByString failed");
                self.reset_trigger(&extract).await;
                return Err(e.into());
            }
        };

        let converted = descriptor.kind.convert(&raw);
        debug!(
            machine = %machine,
            field,
            raw = raw.trim(),
            value = %converted,
            "Collected value"
        );

        self.reset_trigger(&extract).await;

        let now = Utc::now().timestamp() as i32;
        if !self
            .plane
            .write(&paths.field_lastupdated(field), PlaneValue::Int32(now))
            .await
        {
            warn!(machine = %machine, field, "Failed to write lastupdated");
        }

        if !self
            .plane
            .write(&paths.field_value(field), converted)
            .await
        {
            warn!(machine = %machine, field, "Failed to write value");
        }

        Ok(())
    }

    async fn reset_trigger(&self, extract: &crate::address::NodeId) {
        if !self.plane.write(extract, PlaneValue::Bool(false)).await {
            warn!(node = %extract, "Failed to reset extract trigger");
        }
    }
}
