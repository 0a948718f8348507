// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Traits implemented by every compartment model kind.

use crate::types::StateVector;

/// Dynamics of one compartment kind.
///
/// Kernels are generic over this trait: the CPU kernel calls
/// [`CompartmentModel::integrate_step`] per model and per step, and a device
/// kernel implements the same arithmetic in its shader language.
pub trait CompartmentModel: Send + Sync {
    /// State-variable set this model advances
    type State: StateVector;

    /// Physical constants of the model
    type Parameters: ModelParameters;

    /// Human-readable model name (for logging)
    fn model_name(&self) -> &'static str;

    fn parameters(&self) -> &Self::Parameters;

    /// Time derivative of every state variable under stimulus current `stimulus`
    fn derivatives(&self, state: &Self::State, stimulus: f32) -> Self::State;

    /// Advance `state` by one step of length `dt`
    fn integrate_step(&self, state: &Self::State, stimulus: f32, dt: f32) -> Self::State;

    /// Steady state with no stimulus applied
    fn resting_state(&self) -> Self::State;
}

/// Parameter set of a compartment model
pub trait ModelParameters: Copy + Send + Sync {
    /// Validate parameter ranges
    fn validate(&self) -> Result<(), &'static str>;

    /// Number of scalar parameters
    fn parameter_count() -> usize;
}
