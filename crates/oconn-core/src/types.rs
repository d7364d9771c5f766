// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for OCONN.
//!
//! This module provides the machine identity types, the MacMan screen
//! enumeration, and the tagged value union that crosses the OPC UA boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Machine Identity
// =============================================================================

/// The full browse name of a machine under `Okuma.Machines`.
///
/// Machine names are free-form strings; by convention they carry a
/// space-dash-space separator between the numeric machine id and the model
/// designation (e.g. `"12345 - MA600"`).
///
/// # Examples
///
/// ```
/// use oconn_core::types::MachineName;
///
/// let name = MachineName::new("12345 - MA600");
/// assert_eq!(name.machine_id().as_str(), "12345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineName(String);

impl MachineName {
    /// Creates a new machine name.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the conventional machine id: the prefix of the name before
    /// the first `" - "` separator, or the whole name if no separator exists.
    pub fn machine_id(&self) -> MachineId {
        match self.0.split_once(" - ") {
            Some((id, _)) => MachineId::new(id.trim()),
            None => MachineId::new(self.0.trim()),
        }
    }

    /// Derives the machine kind from the name.
    ///
    /// The kind only selects the native ProgID, so the mapping is a
    /// case-insensitive keyword match: `lathe` wins over `grind`, everything
    /// else is a machining center.
    pub fn kind(&self) -> MachineKind {
        let lower = self.0.to_lowercase();
        if lower.contains("lathe") {
            MachineKind::Lathe
        } else if lower.contains("grind") {
            MachineKind::Grinder
        } else {
            MachineKind::MachiningCenter
        }
    }

    /// Returns `true` if the name looks like a system node rather than a
    /// machine. System-like tokens are matched anywhere, case-insensitive.
    pub fn is_system(&self) -> bool {
        const SYSTEM_TOKENS: [&str; 4] = ["system", "config", "global", "server"];
        let lower = self.0.to_lowercase();
        SYSTEM_TOKENS.iter().any(|t| lower.contains(t))
    }
}

impl fmt::Display for MachineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MachineName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MachineName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for MachineName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The short machine identifier used in status reporting and event metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    /// Creates a new machine id.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id as an integer, or 0 when the id is not numeric.
    ///
    /// The event-stream envelope carries the machine id as an integer.
    pub fn as_number(&self) -> i64 {
        self.0.trim().parse().unwrap_or(0)
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of controller behind a machine, used to select the native ProgID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineKind {
    /// Machining center controller.
    MachiningCenter,
    /// Lathe controller.
    Lathe,
    /// Grinder controller.
    Grinder,
}

impl MachineKind {
    /// Returns the kind as a short string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineKind::MachiningCenter => "machining-center",
            MachineKind::Lathe => "lathe",
            MachineKind::Grinder => "grinder",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine attributes read from the `MachineConfig` folder of the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Whether collection is enabled for this machine.
    pub enabled: bool,
    /// Controller IP address; empty when unconfigured.
    pub ip_address: String,
    /// The short machine id.
    pub machine_id: MachineId,
}

// =============================================================================
// MacMan Screens
// =============================================================================

/// The five MacMan screen types collected by the historical pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenKind {
    /// Alarm occurrence ledger.
    AlarmHistory,
    /// Per-period machining report.
    MachiningReport,
    /// NC state snapshots captured at alarm time.
    NcStatusAtAlarm,
    /// Single-record operating summary.
    OperatingReport,
    /// Operator action ledger.
    OperationHistory,
}

impl ScreenKind {
    /// All screens, in collection order.
    pub const ALL: [ScreenKind; 5] = [
        ScreenKind::AlarmHistory,
        ScreenKind::MachiningReport,
        ScreenKind::NcStatusAtAlarm,
        ScreenKind::OperatingReport,
        ScreenKind::OperationHistory,
    ];

    /// Returns the screen name as it appears in the control-plane address
    /// space and the event-stream `measurement_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenKind::AlarmHistory => "ALARM_HISTORY_DISPLAY",
            ScreenKind::MachiningReport => "MACHINING_REPORT_DISPLAY",
            ScreenKind::NcStatusAtAlarm => "NC_STATUS_AT_ALARM_DISPLAY",
            ScreenKind::OperatingReport => "OPERATING_REPORT_DISPLAY",
            ScreenKind::OperationHistory => "OPERATION_HISTORY_DISPLAY",
        }
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Plane Values
// =============================================================================

/// A dynamically-typed value crossing the OPC UA boundary.
///
/// The control plane only ever carries this small union; the typed-fallback
/// write cascade for watermarks is a loop over these variants.
///
/// # Examples
///
/// ```
/// use oconn_core::types::PlaneValue;
///
/// let v = PlaneValue::Double(42.5);
/// assert_eq!(v.as_f64(), Some(42.5));
/// assert_eq!(v.type_name(), "double");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PlaneValue {
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Date and time (UTC).
    DateTime(DateTime<Utc>),
}

impl PlaneValue {
    /// Returns the type name of this value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            PlaneValue::Bool(_) => "bool",
            PlaneValue::Int32(_) => "int32",
            PlaneValue::Int64(_) => "int64",
            PlaneValue::Double(_) => "double",
            PlaneValue::String(_) => "string",
            PlaneValue::DateTime(_) => "datetime",
        }
    }

    /// Attempts to interpret this value as a boolean.
    ///
    /// Integers follow the non-zero convention.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlaneValue::Bool(v) => Some(*v),
            PlaneValue::Int32(v) => Some(*v != 0),
            PlaneValue::Int64(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Returns `true` if this value can safely hold a trigger flag: an
    /// actual boolean, or an integer restricted to 0/1.
    pub fn is_boolean_like(&self) -> bool {
        matches!(
            self,
            PlaneValue::Bool(_) | PlaneValue::Int32(0 | 1) | PlaneValue::Int64(0 | 1)
        )
    }

    /// Attempts to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PlaneValue::Bool(v) => Some(if *v { 1 } else { 0 }),
            PlaneValue::Int32(v) => Some(*v as i64),
            PlaneValue::Int64(v) => Some(*v),
            PlaneValue::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Attempts to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PlaneValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            PlaneValue::Int32(v) => Some(*v as f64),
            PlaneValue::Int64(v) => Some(*v as f64),
            PlaneValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get this value as a string reference.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlaneValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to get this value as a datetime.
    #[inline]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            PlaneValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PlaneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaneValue::Bool(v) => write!(f, "{}", v),
            PlaneValue::Int32(v) => write!(f, "{}", v),
            PlaneValue::Int64(v) => write!(f, "{}", v),
            PlaneValue::Double(v) => write!(f, "{}", v),
            PlaneValue::String(v) => write!(f, "{}", v),
            PlaneValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<bool> for PlaneValue {
    fn from(v: bool) -> Self {
        PlaneValue::Bool(v)
    }
}

impl From<i32> for PlaneValue {
    fn from(v: i32) -> Self {
        PlaneValue::Int32(v)
    }
}

impl From<i64> for PlaneValue {
    fn from(v: i64) -> Self {
        PlaneValue::Int64(v)
    }
}

impl From<f64> for PlaneValue {
    fn from(v: f64) -> Self {
        PlaneValue::Double(v)
    }
}

impl From<&str> for PlaneValue {
    fn from(v: &str) -> Self {
        PlaneValue::String(v.to_string())
    }
}

impl From<String> for PlaneValue {
    fn from(v: String) -> Self {
        PlaneValue::String(v)
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a machine's native session in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session exists for the machine.
    #[default]
    Absent,
    /// A connect attempt is in flight; observers back off.
    Connecting,
    /// The session is open and serving calls.
    Open,
    /// The last connect attempt failed; re-attempted on next dispatch.
    Failed,
}

impl SessionState {
    /// Returns `true` if the session is open.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Absent => write!(f, "Absent"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Open => write!(f, "Open"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_name_id() {
        assert_eq!(MachineName::new("12345 - MA600").machine_id().as_str(), "12345");
        assert_eq!(MachineName::new("MA600").machine_id().as_str(), "MA600");
        assert_eq!(MachineName::new("12345 - MA600").machine_id().as_number(), 12345);
        assert_eq!(MachineName::new("MA600").machine_id().as_number(), 0);
    }

    #[test]
    fn test_machine_kind_from_name() {
        assert_eq!(MachineName::new("12 - LB3000 Lathe").kind(), MachineKind::Lathe);
        assert_eq!(MachineName::new("7 - GA26 Grinder").kind(), MachineKind::Grinder);
        assert_eq!(MachineName::new("12345 - MA600").kind(), MachineKind::MachiningCenter);
    }

    #[test]
    fn test_system_name_filter() {
        assert!(MachineName::new("SystemStatus").is_system());
        assert!(MachineName::new("GlobalConfig").is_system());
        assert!(MachineName::new("opc SERVER node").is_system());
        assert!(!MachineName::new("12345 - MA600").is_system());
    }

    #[test]
    fn test_screen_names() {
        assert_eq!(ScreenKind::AlarmHistory.as_str(), "ALARM_HISTORY_DISPLAY");
        assert_eq!(ScreenKind::MachiningReport.as_str(), "MACHINING_REPORT_DISPLAY");
        assert_eq!(ScreenKind::ALL.len(), 5);
    }

    #[test]
    fn test_plane_value_bool() {
        assert_eq!(PlaneValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PlaneValue::Int32(1).as_bool(), Some(true));
        assert_eq!(PlaneValue::Int32(0).as_bool(), Some(false));
        assert_eq!(PlaneValue::String("x".into()).as_bool(), None);
    }

    #[test]
    fn test_plane_value_boolean_like() {
        assert!(PlaneValue::Bool(false).is_boolean_like());
        assert!(PlaneValue::Int32(1).is_boolean_like());
        assert!(!PlaneValue::Int32(7).is_boolean_like());
        assert!(!PlaneValue::Double(1.0).is_boolean_like());
    }

    #[test]
    fn test_plane_value_conversions() {
        assert_eq!(PlaneValue::Int32(42).as_i64(), Some(42));
        assert_eq!(PlaneValue::Double(42.5).as_f64(), Some(42.5));
        assert_eq!(PlaneValue::String("abc".into()).as_str(), Some("abc"));
        assert_eq!(PlaneValue::Double(1.5).type_name(), "double");
    }

    #[test]
    fn test_session_state() {
        assert!(SessionState::Open.is_open());
        assert!(!SessionState::Connecting.is_open());
        assert_eq!(SessionState::default(), SessionState::Absent);
    }
}
