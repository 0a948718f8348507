// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Somasim Compartment Models
//!
//! Platform-agnostic definitions shared by the solver engine and its kernels:
//! - **Types**: models, identities, state vectors, time windows, trajectories, errors
//! - **Models**: compartment dynamics (Hodgkin-Huxley)
//!
//! Nothing here touches a compute device. Kernels live in `somasim-engine`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod models;
pub mod types;

// Re-export types
pub use types::{
    Error, HHState, Model, ModelId, Result, SolverError, StateVector, TimeWindow, Trajectory,
};

// Re-export compartment models
pub use models::{
    vtrap, CompartmentModel, GateRates, HHConstants, HodgkinHuxleyModel, ModelParameters,
};
