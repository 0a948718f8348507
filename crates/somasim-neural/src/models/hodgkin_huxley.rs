// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hodgkin-Huxley Compartment Model
//!
//! Four-state squid-axon membrane, with the membrane potential measured
//! relative to rest (mV) and time in ms.
//!
//! ## Model Dynamics
//!
//! ```text
//! dV/dt = I - g_K n⁴ (V - E_K) - g_Na m³ h (V - E_Na) - g_L (V - E_L)
//! dx/dt = α_x(V) (1 - x) - β_x(V) x          for x in {n, m, h}
//!
//! α_n = 0.01 (10 - V) / (exp((10 - V) / 10) - 1)    β_n = 0.125 exp(-V / 80)
//! α_m = 0.1  (25 - V) / (exp((25 - V) / 10) - 1)    β_m = 4 exp(-V / 18)
//! α_h = 0.07 exp(-V / 20)                           β_h = 1 / (exp((30 - V) / 10) + 1)
//! ```
//!
//! `α_n` and `α_m` have removable singularities at `V = 10` and `V = 25`;
//! [`vtrap`] evaluates them through their limit.
//!
//! Integration is forward Euler, one step per call.

use super::traits::{CompartmentModel, ModelParameters};
use crate::types::HHState;

/// Ratio below which `x / (exp(x / y) - 1)` is replaced by its series expansion
const VTRAP_EPSILON: f32 = 1e-4;

/// `x / (exp(x / y) - 1)`, continuous through `x = 0` (limit `y`)
#[inline(always)]
pub fn vtrap(x: f32, y: f32) -> f32 {
    let ratio = x / y;
    if ratio.abs() < VTRAP_EPSILON {
        y * (1.0 - ratio / 2.0)
    } else {
        x / (ratio.exp() - 1.0)
    }
}

/// Voltage-dependent opening/closing rates of the three gates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateRates {
    pub alpha_n: f32,
    pub beta_n: f32,
    pub alpha_m: f32,
    pub beta_m: f32,
    pub alpha_h: f32,
    pub beta_h: f32,
}

impl GateRates {
    #[inline(always)]
    pub fn at(v: f32) -> Self {
        Self {
            alpha_n: 0.01 * vtrap(10.0 - v, 10.0),
            beta_n: 0.125 * (-v / 80.0).exp(),
            alpha_m: 0.1 * vtrap(25.0 - v, 10.0),
            beta_m: 4.0 * (-v / 18.0).exp(),
            alpha_h: 0.07 * (-v / 20.0).exp(),
            beta_h: 1.0 / (((30.0 - v) / 10.0).exp() + 1.0),
        }
    }

    /// Steady-state gate values `(n∞, m∞, h∞)`
    pub fn steady_state(&self) -> (f32, f32, f32) {
        (
            self.alpha_n / (self.alpha_n + self.beta_n),
            self.alpha_m / (self.alpha_m + self.beta_m),
            self.alpha_h / (self.alpha_h + self.beta_h),
        )
    }
}

/// Conductances (mS/cm²) and reversal potentials (mV relative to rest)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HHConstants {
    pub g_k: f32,
    pub g_na: f32,
    pub g_leak: f32,
    pub e_k: f32,
    pub e_na: f32,
    pub e_leak: f32,
}

impl HHConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(
        g_k: f32,
        g_na: f32,
        g_leak: f32,
        e_k: f32,
        e_na: f32,
        e_leak: f32,
    ) -> Self {
        Self {
            g_k,
            g_na,
            g_leak,
            e_k,
            e_na,
            e_leak,
        }
    }
}

impl Default for HHConstants {
    fn default() -> Self {
        Self {
            g_k: 36.0,
            g_na: 120.0,
            g_leak: 0.3,
            e_k: -12.0,
            e_na: 115.0,
            e_leak: 10.613,
        }
    }
}

impl ModelParameters for HHConstants {
    fn validate(&self) -> Result<(), &'static str> {
        let all = [
            self.g_k,
            self.g_na,
            self.g_leak,
            self.e_k,
            self.e_na,
            self.e_leak,
        ];
        if all.iter().any(|value| !value.is_finite()) {
            return Err("HH: constants must be finite");
        }
        if self.g_k < 0.0 || self.g_na < 0.0 || self.g_leak < 0.0 {
            return Err("HH: conductances must be non-negative");
        }
        Ok(())
    }

    fn parameter_count() -> usize {
        6
    }
}

/// Hodgkin-Huxley membrane with fixed constants
#[derive(Debug, Clone, Copy, Default)]
pub struct HodgkinHuxleyModel {
    constants: HHConstants,
}

impl HodgkinHuxleyModel {
    pub fn new(constants: HHConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &HHConstants {
        &self.constants
    }

    /// Sum of the three ionic currents flowing out of the membrane
    #[inline(always)]
    pub fn ionic_current(&self, state: &HHState) -> f32 {
        let c = &self.constants;
        let n4 = state.n * state.n * state.n * state.n;
        let m3 = state.m * state.m * state.m;
        c.g_k * n4 * (state.v - c.e_k)
            + c.g_na * m3 * state.h * (state.v - c.e_na)
            + c.g_leak * (state.v - c.e_leak)
    }
}

impl CompartmentModel for HodgkinHuxleyModel {
    type State = HHState;
    type Parameters = HHConstants;

    fn model_name(&self) -> &'static str {
        "Hodgkin-Huxley"
    }

    fn parameters(&self) -> &HHConstants {
        &self.constants
    }

    #[inline(always)]
    fn derivatives(&self, state: &HHState, stimulus: f32) -> HHState {
        let rates = GateRates::at(state.v);
        HHState {
            v: stimulus - self.ionic_current(state),
            n: rates.alpha_n * (1.0 - state.n) - rates.beta_n * state.n,
            m: rates.alpha_m * (1.0 - state.m) - rates.beta_m * state.m,
            h: rates.alpha_h * (1.0 - state.h) - rates.beta_h * state.h,
        }
    }

    #[inline(always)]
    fn integrate_step(&self, state: &HHState, stimulus: f32, dt: f32) -> HHState {
        let d = self.derivatives(state, stimulus);
        HHState {
            v: state.v + dt * d.v,
            n: state.n + dt * d.n,
            m: state.m + dt * d.m,
            h: state.h + dt * d.h,
        }
    }

    fn resting_state(&self) -> HHState {
        let (n, m, h) = GateRates::at(0.0).steady_state();
        HHState::new(0.0, n, m, h)
    }
}
