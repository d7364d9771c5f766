// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `version` command.

/// Prints version information.
pub fn execute() {
    println!("oconn {}", oconn_core::VERSION);
}
