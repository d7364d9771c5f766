// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Native OSPAPI conventions.
//!
//! The vendor binding signals connect success through three channels at
//! once: absence of an exception, an empty error message, and a result
//! string that is empty or `"0"`. Every connector implementation applies
//! [`connect_succeeded`] so the rule lives in one place.

use oconn_core::types::MachineKind;

/// Applies the native connect-success convention to the binding's error
/// message and result string.
pub fn connect_succeeded(error_message: &str, result: &str) -> bool {
    let result = result.trim();
    error_message.trim().is_empty() && (result.is_empty() || result == "0")
}

/// Returns the COM ProgID of the data API for a machine kind.
pub fn prog_id(kind: MachineKind) -> &'static str {
    match kind {
        MachineKind::MachiningCenter => "Okuma.MacMan.MC.DataAPI",
        MachineKind::Lathe => "Okuma.MacMan.Lathe.DataAPI",
        MachineKind::Grinder => "Okuma.MacMan.Grinder.DataAPI",
    }
}

// =============================================================================
// Tests
// =============================================================================
