// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data-plane seam: the native OSPAPI session.
//!
//! The Okuma controllers are driven through a vendor binding that exposes a
//! five-argument `GetByString`, a controller-wide update cycle, and the
//! program-selection command. The engine consumes the binding through this
//! trait; `oconn-osp` provides the simulated implementation, and the
//! production COM binding plugs into the same seam out of tree.
//!
//! The binding is not safe under concurrent entry. The session pool wraps
//! every implementation in a per-machine mutex; implementations may assume
//! serialized access.

use async_trait::async_trait;
use std::fmt;

use crate::error::SessionResult;
use crate::types::MachineKind;

// =============================================================================
// OspAddress
// =============================================================================

/// The five-index tuple addressing one value on the controller.
///
/// Argument order matches the native `GetByString(subsystem, major,
/// subscript, minor, style)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OspAddress {
    /// Subsystem index.
    pub subsystem: i32,
    /// Major index.
    pub major: i32,
    /// Subscript (record index for MacMan screens).
    pub subscript: i32,
    /// Minor index.
    pub minor: i32,
    /// Style code.
    pub style: i32,
}

impl OspAddress {
    /// Creates an address.
    pub const fn new(subsystem: i32, major: i32, subscript: i32, minor: i32, style: i32) -> Self {
        Self {
            subsystem,
            major,
            subscript,
            minor,
            style,
        }
    }

    /// Returns a copy with a different subscript. MacMan screens iterate
    /// record indices through this.
    pub const fn at(self, subscript: i32) -> Self {
        Self { subscript, ..self }
    }
}

impl fmt::Display for OspAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.subsystem, self.major, self.subscript, self.minor, self.style
        )
    }
}

// =============================================================================
// Command Outcome
// =============================================================================

/// Raw outcome of a controller command. The default is success: result 0
/// with no error message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// Native result code; non-zero is a failure.
    pub result: i32,
    /// The machine's error message, possibly empty.
    pub error_message: String,
}

impl CommandOutcome {
    /// Creates an outcome.
    pub fn new(result: i32, error_message: impl Into<String>) -> Self {
        Self {
            result,
            error_message: error_message.into(),
        }
    }

    /// Returns `true` if the command succeeded.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.result == 0
    }
}

// =============================================================================
// OspSession Trait
// =============================================================================

/// A live native session to one machine.
///
/// # Lifetime
///
/// Sessions are long-lived by design: they are opened once per machine and
/// closed only on process shutdown or an explicit disconnect. A failing
/// data call must never close the session.
#[async_trait]
pub trait OspSession: Send {
    /// Reads one value as a string.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Native`] carrying the binding's error message
    /// when the binding reports one. The session stays usable.
    ///
    /// [`SessionError::Native`]: crate::error::SessionError::Native
    async fn get_by_string(&mut self, address: &OspAddress) -> SessionResult<String>;

    /// Begins a controller-wide MacMan update cycle.
    async fn start_update(&mut self, group: i32, part: i32) -> SessionResult<()>;

    /// Blocks until the update cycle started by [`start_update`] completes.
    ///
    /// [`start_update`]: OspSession::start_update
    async fn wait_update_end(&mut self) -> SessionResult<()>;

    /// Issues the program-selection command.
    ///
    /// Returns the raw native outcome; interpreting a non-zero result is the
    /// caller's concern.
    async fn select_main_program(
        &mut self,
        main_file: &str,
        sub_file: &str,
        program_name: &str,
        mode: i32,
    ) -> SessionResult<CommandOutcome>;

    /// Tears the session down. Called only from pool shutdown or an explicit
    /// disconnect command.
    async fn disconnect(&mut self);
}

// =============================================================================
// OspConnector Trait
// =============================================================================

/// Opens native sessions.
///
/// Connect success is defined by the native conventions: no exception, an
/// empty error message, and a result string that is empty or `"0"`.
/// Implementations apply that rule and surface everything else as
/// [`SessionError::ConnectFailed`].
///
/// [`SessionError::ConnectFailed`]: crate::error::SessionError::ConnectFailed
#[async_trait]
pub trait OspConnector: Send + Sync {
    /// Opens a session to the controller at `ip` using the ProgID for `kind`.
    async fn connect(&self, kind: MachineKind, ip: &str) -> SessionResult<Box<dyn OspSession>>;

    /// A short name for logging (e.g. `"sim"`).
    fn name(&self) -> &str;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_at() {
        let a = OspAddress::new(1, 5063, 0, 0, 9);
        let b = a.at(7);
        assert_eq!(b.subscript, 7);
        assert_eq!(b.major, 5063);
        assert_eq!(format!("{}", b), "(1, 5063, 7, 0, 9)");
    }

    #[test]
    fn test_command_outcome() {
        assert!(CommandOutcome::new(0, "").is_success());
        assert!(!CommandOutcome::new(3, "busy").is_success());
    }
}
