// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # oconn-osp
//!
//! Data-plane support for the native Okuma OSPAPI.
//!
//! The binding itself is an external collaborator reached through the
//! [`OspSession`]/[`OspConnector`] seams in `oconn-core`. This crate holds
//! what the bridge owns on that side of the seam:
//!
//! - the native result conventions ([`codes`]);
//! - the simulated controller ([`sim`]) used by development runs and tests.
//!
//! [`OspSession`]: oconn_core::osp::OspSession
//! [`OspConnector`]: oconn_core::osp::OspConnector

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codes;
pub mod sim;

pub use codes::{connect_succeeded, prog_id};
pub use sim::{SimConnector, SimSession, SimState};
