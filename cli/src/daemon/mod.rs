// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Daemon mode: HTTP service wiring plus the client used by CLI commands
//! to delegate to a running daemon.

pub mod client;
pub mod server;

pub use client::DaemonClient;
pub use server::start_daemon;
