// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # somasim-observability
//!
//! Logging setup shared by every somasim binary and test harness, with
//! per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: rolling log files in timestamped run folders

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use init::*;

/// Known somasim crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "somasim",
    "somasim-neural",
    "somasim-engine",
    "somasim-config",
    "somasim-observability",
];

/// Tracing target of a crate (`somasim-engine` logs under `somasim_engine`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
