// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # oconn-opcua
//!
//! The OPC UA control-plane client for OCONN: a transport trait with a
//! production implementation over the `opcua` crate, wrapped by
//! [`ControlPlaneClient`] which implements the engine's `ControlPlane` seam
//! and owns subscription restore across reconnects.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod certificate;
pub mod client;
pub mod real;
pub mod transport;
pub mod types;

pub use certificate::{prepare_pki, SubjectLog};
pub use client::ControlPlaneClient;
pub use real::RealOpcUaTransport;
pub use transport::{OpcUaTransport, ReadOutcome, TransportState};
pub use types::{OpcUaConfig, SubscriptionSettings};
