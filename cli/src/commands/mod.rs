// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! CLI command handlers.

pub mod admin;
pub mod daemon;
pub mod memory;

pub use admin::AdminCommand;
pub use daemon::DaemonCommand;
pub use memory::{SaveArgs, SearchArgs, ShowArgs, StatsArgs};
