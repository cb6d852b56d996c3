// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presentation layer: HTTP surface for the memory substrate.

pub mod api;

pub use api::{router, AppState};
