// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Trigger-node classification.
//!
//! Change notifications arrive as bare node ids; this module decides which
//! workflow a notification belongs to. Classification is by pattern match on
//! the node id suffix, in a fixed order:
//!
//! 1. suffix `.ProgramManagement.Ctrl` → program management
//! 2. contains `Data.MacManData` and suffix `.extract` → MacMan collection
//! 3. contains `.Data.` and suffix `.extract` → general collection
//! 4. otherwise → not a trigger
//!
//! The order matters: the MacMan trigger also matches the general pattern.

use crate::address::{machine_segment, NodeId};
use crate::types::MachineName;

/// A classified trigger node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// `…<M>.ProgramManagement.Ctrl`
    ProgramCtrl {
        /// The machine the workflow targets.
        machine: MachineName,
    },
    /// `…<M>.Data.MacManData.extract`
    MacMan {
        /// The machine to collect from.
        machine: MachineName,
    },
    /// `…<M>.Data.<Field>.extract`
    General {
        /// The machine to collect from.
        machine: MachineName,
        /// The data-field segment, the join key into the descriptor registry.
        field: String,
    },
}

impl Trigger {
    /// Classifies a node id, returning `None` for nodes that are not
    /// triggers (callers log and drop those).
    pub fn classify(node: &NodeId) -> Option<Trigger> {
        let id = node.identifier();

        if id.ends_with(".ProgramManagement.Ctrl") {
            let machine = machine_segment(node)?;
            return Some(Trigger::ProgramCtrl { machine });
        }

        if !id.ends_with(".extract") {
            return None;
        }

        if id.contains("Data.MacManData") {
            let machine = machine_segment(node)?;
            return Some(Trigger::MacMan { machine });
        }

        if id.contains(".Data.") {
            let machine = machine_segment(node)?;
            let field = field_segment(id)?;
            return Some(Trigger::General { machine, field });
        }

        None
    }

    /// Returns the machine this trigger targets.
    pub fn machine(&self) -> &MachineName {
        match self {
            Trigger::ProgramCtrl { machine } => machine,
            Trigger::MacMan { machine } => machine,
            Trigger::General { machine, .. } => machine,
        }
    }
}

/// Extracts `<Field>` from `...Data.<Field>.extract`.
fn field_segment(id: &str) -> Option<String> {
    let without_suffix = id.strip_suffix(".extract")?;
    let field = without_suffix.rsplit('.').next()?;
    if field.is_empty() {
        return None;
    }
    Some(field.to_string())
}

// =============================================================================
// Tests
// =============================================================================
