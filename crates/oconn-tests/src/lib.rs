// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # oconn-tests
//!
//! Shared mocks, fixtures, and harness utilities for OCONN integration
//! tests. The tests themselves live under `tests/`.

pub mod common;
