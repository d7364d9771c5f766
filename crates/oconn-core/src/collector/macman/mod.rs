// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! MacMan collector: incremental historical collection.
//!
//! A rising edge on `...<M>.Data.MacManData.extract` sweeps the five MacMan
//! screens. Per trigger the collector runs exactly one controller-wide
//! update cycle (`StartUpdate(0,0)` + `WaitUpdateEnd()`), then walks each
//! screen newest-first, stopping at the screen's watermark.
//!
//! Ordering contract per screen: records are processed newest-first, the
//! batch is published before the watermark advances, and the advance is a
//! single write. A publish failure does not hold the watermark back;
//! publishes are best-effort.

pub mod screens;
pub mod watermark;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::address::MachinePaths;
use crate::control::{read_string, ControlPlane};
use crate::envelope::{frame_metadata, frame_record, MacManRecord};
use crate::error::{CollectError, CollectResult};
use crate::osp::OspSession;
use crate::pool::SessionPool;
use crate::sink::EventSink;
use crate::types::{MachineId, MachineName, PlaneValue, ScreenKind};

use screens::ScreenSpec;

/// Per-screen record cap per trigger.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Fallback controller IP when `MachineConfig.IPAddress` is unreadable.
const FALLBACK_IP: &str = "127.0.0.1";

/// Executes MacMan collections.
pub struct MacManCollector {
    plane: Arc<dyn ControlPlane>,
    pool: Arc<SessionPool>,
    sink: Arc<dyn EventSink>,
    batch_size: usize,
}

impl MacManCollector {
    /// Creates a collector with the default batch size.
    pub fn new(
        plane: Arc<dyn ControlPlane>,
        pool: Arc<SessionPool>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            plane,
            pool,
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Overrides the per-screen batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Runs one full sweep for a rising-edge trigger.
    pub async fn collect(&self, machine: &MachineName) -> CollectResult<()> {
        let paths = MachinePaths::new(machine.clone());
        let extract = paths.macman_extract();

        let ip = read_string(self.plane.as_ref(), &paths.config_ip_address())
            .await
            .unwrap_or_else(|| FALLBACK_IP.to_string());
        let machine_id = read_string(self.plane.as_ref(), &paths.config_machine_id())
            .await
            .map(MachineId::new)
            .unwrap_or_else(|| machine.machine_id());

        let session = match self.pool.acquire(machine).await {
            Ok(s) => s,
            Err(e) => {
                self.reset_trigger(&extract).await;
                return Err(e.into());
            }
        };

        // Watermarks are read up front, before the session mutex is taken.
        let mut watermarks = HashMap::new();
        for screen in ScreenKind::ALL {
            let wm = watermark::read(self.plane.as_ref(), &paths.watermark(screen)).await;
            watermarks.insert(screen, wm);
        }

        {
            let mut api = session.lock().await;

            // One update cycle for the whole sweep. Warnings do not abort.
            if let Err(e) = api.start_update(0, 0).await {
                warn!(machine = %machine, error = %e, "StartUpdate reported a warning");
            }
            if let Err(e) = api.wait_update_end().await {
                warn!(machine = %machine, error = %e, "WaitUpdateEnd reported a warning");
            }

            for screen in ScreenKind::ALL {
                let spec = ScreenSpec::of(screen);
                let wm = watermarks[&screen];

                match self.collect_screen(&mut **api, spec, wm).await {
                    Ok(records) if !records.is_empty() => {
                        // Publish, then advance. Max() exists since the
                        // batch is non-empty.
                        let newest = records.iter().map(|r| r.timestamp).max().unwrap_or(wm);

                        let envelopes: Vec<_> = records
                            .iter()
                            .map(|r| frame_record(machine, &machine_id, &ip, r))
                            .collect();
                        let metadata = frame_metadata(machine, &machine_id, &ip, screen);

                        if let Err(e) = self.sink.publish(&envelopes, &metadata).await {
                            warn!(
                                machine = %machine,
                                %screen,
                                error = %e,
                                "Event-stream publish failed, continuing"
                            );
                        }

                        watermark::advance(
                            self.plane.as_ref(),
                            &paths.watermark(screen),
                            newest,
                        )
                        .await;

                        debug!(
                            machine = %machine,
                            %screen,
                            records = records.len(),
                            watermark = %newest,
                            "Screen collected"
                        );
                    }
                    Ok(_) => {
                        debug!(machine = %machine, %screen, "No new records");
                    }
                    Err(e) => {
                        warn!(machine = %machine, %screen, error = %e, "Screen collection failed");
                    }
                }
            }
        }

        self.reset_trigger(&extract).await;
        Ok(())
    }

    /// Collects one screen, newest-first, honoring its comparator.
    ///
    /// The update cycle already ran for the sweep, so the screen routine
    /// only reads. A native read error or an unparseable date stops the
    /// screen immediately; whatever was collected up to that point still
    /// publishes.
    async fn collect_screen(
        &self,
        api: &mut dyn OspSession,
        spec: &ScreenSpec,
        wm: chrono::DateTime<chrono::Local>,
    ) -> CollectResult<Vec<MacManRecord>> {
        let available = match spec.count_probe {
            Some(probe) => {
                let raw = api.get_by_string(&probe).await.map_err(|e| {
                    CollectError::screen_aborted(spec.kind, format!("count probe: {}", e))
                })?;
                raw.trim().parse::<i64>().unwrap_or(0)
            }
            None => 1,
        };

        let take = available.clamp(0, self.batch_size as i64);
        let mut records = Vec::new();

        // Index 0 is the newest record.
        'records: for index in 0..take {
            let i = index as i32;

            let date_raw = match api
                .get_by_string(&ScreenSpec::field_address(spec.date.date_major, i))
                .await
            {
                Ok(v) => v.trim().to_string(),
                Err(e) => {
                    warn!(screen = %spec.kind, index = i, error = %e, "Date read failed, stopping screen");
                    break 'records;
                }
            };

            let time_raw = match spec.date.time {
                Some((_, major)) => {
                    match api
                        .get_by_string(&ScreenSpec::field_address(major, i))
                        .await
                    {
                        Ok(v) => Some(v.trim().to_string()),
                        Err(e) => {
                            warn!(screen = %spec.kind, index = i, error = %e, "Time read failed, stopping screen");
                            break 'records;
                        }
                    }
                }
                None => None,
            };

            let Some(ts) = watermark::parse_datetime(&date_raw, time_raw.as_deref()) else {
                warn!(
                    screen = %spec.kind,
                    index = i,
                    date = %date_raw,
                    "Unparseable record date, stopping screen"
                );
                break 'records;
            };

            if !spec.rule.accepts(ts, wm) {
                break 'records;
            }

            let mut fields = BTreeMap::new();
            fields.insert(spec.date.date_name.to_string(), date_raw);
            if let (Some((time_name, _)), Some(time_raw)) = (spec.date.time, time_raw) {
                fields.insert(time_name.to_string(), time_raw);
            }
            fields.insert(
                "ProcessedDate".to_string(),
                ts.format(watermark::WATERMARK_FORMAT).to_string(),
            );

            for field in spec.fields {
                match api
                    .get_by_string(&ScreenSpec::field_address(field.major, i))
                    .await
                {
                    Ok(v) => {
                        fields.insert(field.name.to_string(), v.trim().to_string());
                    }
                    Err(e) => {
                        // A single field failure loses the field, not the
                        // record, and never the session.
                        warn!(screen = %spec.kind, field = field.name, index = i, error = %e, "Field read failed");
                    }
                }
            }

            records.push(MacManRecord::new(spec.kind, ts, fields));
        }

        Ok(records)
    }

    async fn reset_trigger(&self, extract: &crate::address::NodeId) {
        if !self.plane.write(extract, PlaneValue::Bool(false)).await {
            warn!(node = %extract, "Failed to reset MacMan extract trigger");
        }
    }
}
