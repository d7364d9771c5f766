// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # oconn-config
//!
//! Configuration for the OCONN bridge:
//!
//! - [`envfile`]: `.env` discovery and loading;
//! - [`settings`]: the environment variable table with defaults;
//! - [`schema`]/[`registry`]: the `api_config.json` document model and the
//!   descriptor registry built from it.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod envfile;
pub mod registry;
pub mod schema;
pub mod settings;

pub use registry::{load_registry, try_load_registry};
pub use schema::{ApiConfigFile, ApiItem, SeriesApis};
pub use settings::Settings;
