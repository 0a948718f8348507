// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Solver Types Module
//!
//! Core type definitions shared by the solver engine and its kernels.

pub mod error;
pub mod model;
pub mod trajectory;
pub mod window;

// Re-export commonly used types
pub use error::{Error, Result, SolverError};
pub use model::{HHState, Model, ModelId, StateVector};
pub use trajectory::Trajectory;
pub use window::TimeWindow;
