// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # oconn-core
//!
//! The coupling engine of OCONN, the Okuma fleet data-plane bridge. It ties
//! two independent external surfaces together:
//!
//! - the OPC UA **control plane**: machine configuration, trigger flags,
//!   watermarks, connection-status mirrors, and result slots;
//! - the per-machine native OSPAPI **data plane**: live counters, MacMan
//!   history screens, and program-selection commands.
//!
//! This crate owns machine discovery, the long-lived session pool, trigger
//! dispatch, the incremental MacMan collection protocol, the
//! program-management workflow, the extract scheduler, and the event-stream
//! envelope framing. The external surfaces are consumed through three
//! narrow seams: [`control::ControlPlane`], [`osp::OspSession`] (with
//! [`osp::OspConnector`]), and [`sink::EventSink`].

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod address;
pub mod error;
pub mod types;

// =============================================================================
// Seams
// =============================================================================

pub mod control;
pub mod osp;
pub mod sink;

// =============================================================================
// Engine Modules
// =============================================================================

pub mod collector;
pub mod discovery;
pub mod dispatch;
pub mod envelope;
pub mod pool;
pub mod registry;
pub mod scheduler;
pub mod trigger;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use address::{machine_segment, MachinePaths, NodeId, MACHINES_ROOT};
pub use collector::{GeneralCollector, MacManCollector, ProgramExecutor};
pub use control::{BrowsedNode, ControlPlane, Notification};
pub use discovery::{discover_and_subscribe, DiscoveryReport};
pub use dispatch::Dispatcher;
pub use envelope::{EnvelopeMetadata, MacManEnvelope, MacManRecord};
pub use error::{
    BridgeError, BridgeResult, CollectError, ConfigError, PlaneError, ProgramError,
    SessionError, SinkError,
};
pub use osp::{CommandOutcome, OspAddress, OspConnector, OspSession};
pub use pool::{MachineSession, SessionPool};
pub use registry::{DataKind, Descriptor, DescriptorOrigin, DescriptorRegistry};
pub use scheduler::ExtractScheduler;
pub use sink::{EventSink, NoopSink, TracingSink};
pub use trigger::Trigger;
pub use types::{
    MachineConfig, MachineId, MachineKind, MachineName, PlaneValue, ScreenKind, SessionState,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
