// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compartment Model Architecture
//!
//! Trait-based model system: each compartment kind pairs a [`StateVector`]
//! with a [`CompartmentModel`] that advances it.
//!
//! ## Adding a New Compartment Model
//!
//! 1. Define the state struct and implement `StateVector` for it
//! 2. Create `src/models/your_model.rs` and implement `CompartmentModel`
//! 3. Add tests
//! 4. Export in `mod.rs`
//!
//! [`StateVector`]: crate::types::StateVector

pub mod hodgkin_huxley;
pub mod traits;

// Re-export core types
pub use hodgkin_huxley::{vtrap, GateRates, HHConstants, HodgkinHuxleyModel};
pub use traits::{CompartmentModel, ModelParameters};
