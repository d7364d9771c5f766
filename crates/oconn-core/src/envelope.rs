// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event-stream envelope framing.
//!
//! Each MacMan record is framed as one UTF-8 JSON envelope. Two timestamps
//! live in the envelope and they deliberately differ:
//!
//! - `timestamp` is event time: the record's parsed date, converted to UTC.
//!   The operating report carries no usable event time and always uses the
//!   current wall clock.
//! - `ProcessedDate` at the envelope root is provenance: always the current
//!   wall clock at send.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{MachineId, MachineName, ScreenKind};

/// Record fields that never appear in the envelope's `fields` object. The
/// date/time pair becomes `timestamp`, the program names become tags.
const EXCLUDED_FIELDS: [&str; 7] = [
    "StartDay",
    "StartTime",
    "Date",
    "Time",
    "ProcessedDate",
    "MainProgramName",
    "ProgramName",
];

// =============================================================================
// MacManRecord
// =============================================================================

/// One record read off a MacMan screen, before framing.
#[derive(Debug, Clone, PartialEq)]
pub struct MacManRecord {
    /// The screen the record came from.
    pub screen: ScreenKind,
    /// The record's parsed timestamp, in controller-local time.
    pub timestamp: DateTime<Local>,
    /// All raw fields by name, including the date/time strings.
    pub fields: BTreeMap<String, String>,
}

impl MacManRecord {
    /// Creates a record.
    pub fn new(
        screen: ScreenKind,
        timestamp: DateTime<Local>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            screen,
            timestamp,
            fields,
        }
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// The per-record JSON envelope published to the event stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MacManEnvelope {
    /// Numeric machine id (0 when the id is not numeric).
    pub machine_id: i64,
    /// Controller IP address.
    pub machine_ip: String,
    /// Event time, UTC, `yyyy-MM-ddTHH:mm:ss.fffZ`.
    pub timestamp: String,
    /// The screen name.
    pub measurement_type: String,
    /// Dimension tags: machine name plus program names when present.
    pub tags: BTreeMap<String, String>,
    /// Measured fields; numeric strings are published as numbers.
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Provenance: current wall-clock UTC at send.
    #[serde(rename = "ProcessedDate")]
    pub processed_date: String,
}

/// Metadata properties attached to the event alongside the body.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeMetadata {
    /// Numeric machine id.
    pub machine_id: i64,
    /// Controller IP address.
    pub machine_ip: String,
    /// Full machine name.
    pub machine_name: String,
    /// The screen name.
    pub measurement_type: String,
}

/// Formats a UTC instant as the envelope timestamp format.
fn format_utc(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Frames one record into its envelope.
///
/// The envelope `timestamp` is the record's parsed time in UTC, except for
/// the operating report which always carries the current wall clock.
pub fn frame_record(
    machine: &MachineName,
    machine_id: &MachineId,
    machine_ip: &str,
    record: &MacManRecord,
) -> MacManEnvelope {
    let now = Utc::now();

    let timestamp = match record.screen {
        ScreenKind::OperatingReport => now,
        _ => record.timestamp.with_timezone(&Utc),
    };

    let mut tags = BTreeMap::new();
    tags.insert("machine_name".to_string(), machine.as_str().to_string());
    for key in ["MainProgramName", "ProgramName"] {
        if let Some(v) = record.fields.get(key) {
            tags.insert(key.to_string(), v.clone());
        }
    }

    let fields = record
        .fields
        .iter()
        .filter(|(name, _)| !EXCLUDED_FIELDS.contains(&name.as_str()))
        .map(|(name, raw)| (name.clone(), field_value(raw)))
        .collect();

    MacManEnvelope {
        machine_id: machine_id.as_number(),
        machine_ip: machine_ip.to_string(),
        timestamp: format_utc(timestamp),
        measurement_type: record.screen.as_str().to_string(),
        tags,
        fields,
        processed_date: format_utc(now),
    }
}

/// Builds the metadata properties for a batch.
pub fn frame_metadata(
    machine: &MachineName,
    machine_id: &MachineId,
    machine_ip: &str,
    screen: ScreenKind,
) -> EnvelopeMetadata {
    EnvelopeMetadata {
        machine_id: machine_id.as_number(),
        machine_ip: machine_ip.to_string(),
        machine_name: machine.as_str().to_string(),
        measurement_type: screen.as_str().to_string(),
    }
}

/// Numeric strings become JSON numbers; everything else stays text.
fn field_value(raw: &str) -> serde_json::Value {
    let t = raw.trim();
    if let Ok(n) = t.parse::<i64>() {
        return serde_json::Value::from(n);
    }
    if let Ok(n) = t.parse::<f64>() {
        if n.is_finite() {
            return serde_json::Value::from(n);
        }
    }
    serde_json::Value::from(raw)
}

// =============================================================================
// Tests
// =============================================================================
