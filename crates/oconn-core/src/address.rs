// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Control-plane address space.
//!
//! The OPC UA server exposes the whole fleet under a single string-identifier
//! namespace rooted at `ns=2;s=Okuma.Machines`. This module provides the
//! `NodeId` newtype and typed builders for every path the bridge consumes,
//! so nothing else in the codebase concatenates address strings by hand.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{MachineName, ScreenKind};

/// The browse root for machine discovery.
pub const MACHINES_ROOT: &str = "ns=2;s=Okuma.Machines";

/// String prefix shared by all node identifiers in the machines namespace.
const STRING_ID_PREFIX: &str = "ns=2;s=";

// =============================================================================
// NodeId
// =============================================================================

/// An OPC UA node identifier in its string form, e.g.
/// `ns=2;s=Okuma.Machines.12345 - MA600.Data.MacManData.extract`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from its full string form.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the full string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the string identifier without the `ns=2;s=` prefix, or the
    /// whole string when the prefix is absent.
    pub fn identifier(&self) -> &str {
        self.0.strip_prefix(STRING_ID_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Path Builders
// =============================================================================

/// Typed builders for one machine's subtree of the address space.
///
/// # Examples
///
/// ```
/// use oconn_core::address::MachinePaths;
/// use oconn_core::types::{MachineName, ScreenKind};
///
/// let paths = MachinePaths::new(MachineName::new("12345 - MA600"));
/// assert_eq!(
///     paths.macman_extract().as_str(),
///     "ns=2;s=Okuma.Machines.12345 - MA600.Data.MacManData.extract"
/// );
/// assert_eq!(
///     paths.watermark(ScreenKind::AlarmHistory).as_str(),
///     "ns=2;s=Okuma.Machines.12345 - MA600.Data.MacManData.LastProcessed.ALARM_HISTORY_DISPLAY"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MachinePaths {
    name: MachineName,
}

impl MachinePaths {
    /// Creates path builders for a machine.
    pub fn new(name: MachineName) -> Self {
        Self { name }
    }

    /// Returns the machine name.
    pub fn name(&self) -> &MachineName {
        &self.name
    }

    fn node(&self, suffix: &str) -> NodeId {
        NodeId::new(format!("{}.{}.{}", MACHINES_ROOT, self.name.as_str(), suffix))
    }

    /// The machine's root node.
    pub fn root(&self) -> NodeId {
        NodeId::new(format!("{}.{}", MACHINES_ROOT, self.name.as_str()))
    }

    /// `MachineConfig.Enabled` (read).
    pub fn config_enabled(&self) -> NodeId {
        self.node("MachineConfig.Enabled")
    }

    /// `MachineConfig.IPAddress` (read).
    pub fn config_ip_address(&self) -> NodeId {
        self.node("MachineConfig.IPAddress")
    }

    /// `MachineConfig.MachineId` (read).
    pub fn config_machine_id(&self) -> NodeId {
        self.node("MachineConfig.MachineId")
    }

    /// `Connected` status mirror (written as 32-bit Unix seconds).
    pub fn connected(&self) -> NodeId {
        self.node("Connected")
    }

    /// `DisConnected` status mirror (written as 32-bit Unix seconds).
    pub fn disconnected(&self) -> NodeId {
        self.node("DisConnected")
    }

    /// `Data` folder root.
    pub fn data(&self) -> NodeId {
        self.node("Data")
    }

    /// `Data.<Field>.extract` trigger.
    pub fn field_extract(&self, field: &str) -> NodeId {
        self.node(&format!("Data.{}.extract", field))
    }

    /// `Data.<Field>.value` destination slot.
    pub fn field_value(&self, field: &str) -> NodeId {
        self.node(&format!("Data.{}.value", field))
    }

    /// `Data.<Field>.lastupdated` (written as 32-bit Unix seconds).
    pub fn field_lastupdated(&self, field: &str) -> NodeId {
        self.node(&format!("Data.{}.lastupdated", field))
    }

    /// `Data.MacManData.extract` trigger.
    pub fn macman_extract(&self) -> NodeId {
        self.node("Data.MacManData.extract")
    }

    /// `Data.MacManData.LastProcessed.<SCREEN>` watermark.
    pub fn watermark(&self, screen: ScreenKind) -> NodeId {
        self.node(&format!("Data.MacManData.LastProcessed.{}", screen.as_str()))
    }

    /// `ProgramManagement` folder root.
    pub fn program_management(&self) -> NodeId {
        self.node("ProgramManagement")
    }

    /// `ProgramManagement.Ctrl` trigger.
    pub fn pm_ctrl(&self) -> NodeId {
        self.node("ProgramManagement.Ctrl")
    }

    /// `ProgramManagement.Stat` result flag.
    pub fn pm_stat(&self) -> NodeId {
        self.node("ProgramManagement.Stat")
    }

    /// `ProgramManagement.Exception` result text.
    pub fn pm_exception(&self) -> NodeId {
        self.node("ProgramManagement.Exception")
    }

    /// `ProgramManagement.Filepath` parameter.
    pub fn pm_filepath(&self) -> NodeId {
        self.node("ProgramManagement.Filepath")
    }

    /// `ProgramManagement.Id` parameter.
    pub fn pm_id(&self) -> NodeId {
        self.node("ProgramManagement.Id")
    }

    /// `ProgramManagement.MainFile` parameter.
    pub fn pm_main_file(&self) -> NodeId {
        self.node("ProgramManagement.MainFile")
    }
}

/// Extracts the machine name segment from a node identifier under the
/// machines root, if there is one.
///
/// Machine names may contain spaces and dashes but never a `.`, which is the
/// segment separator of this address space.
pub fn machine_segment(node: &NodeId) -> Option<MachineName> {
    let id = node.identifier();
    let rest = id.strip_prefix("Okuma.Machines.")?;
    let segment = rest.split('.').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(MachineName::new(segment))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> MachinePaths {
        MachinePaths::new(MachineName::new("12345 - MA600"))
    }

    #[test]
    fn test_node_id_identifier() {
        let n = NodeId::new("ns=2;s=Okuma.Machines.X.Connected");
        assert_eq!(n.identifier(), "Okuma.Machines.X.Connected");
        let n = NodeId::new("Okuma.Machines.X");
        assert_eq!(n.identifier(), "Okuma.Machines.X");
    }

    #[test]
    fn test_machine_paths() {
        let p = paths();
        assert_eq!(p.root().as_str(), "ns=2;s=Okuma.Machines.12345 - MA600");
        assert_eq!(
            p.config_ip_address().as_str(),
            "ns=2;s=Okuma.Machines.12345 - MA600.MachineConfig.IPAddress"
        );
        assert_eq!(
            p.field_extract("WorkCounterA_Counted").as_str(),
            "ns=2;s=Okuma.Machines.12345 - MA600.Data.WorkCounterA_Counted.extract"
        );
        assert_eq!(
            p.pm_ctrl().as_str(),
            "ns=2;s=Okuma.Machines.12345 - MA600.ProgramManagement.Ctrl"
        );
    }

    #[test]
    fn test_watermark_path() {
        let p = paths();
        assert_eq!(
            p.watermark(ScreenKind::OperatingReport).as_str(),
            "ns=2;s=Okuma.Machines.12345 - MA600.Data.MacManData.LastProcessed.OPERATING_REPORT_DISPLAY"
        );
    }

    #[test]
    fn test_machine_segment() {
        let n = paths().field_extract("SpindleLoad");
        assert_eq!(
            machine_segment(&n),
            Some(MachineName::new("12345 - MA600"))
        );

        let outside = NodeId::new("ns=2;s=Server.Status");
        assert_eq!(machine_segment(&outside), None);
    }
}
