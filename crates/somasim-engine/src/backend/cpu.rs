// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # CPU Kernel
//!
//! Reference kernel: integrates every model on the host, one rayon task per
//! model, then scatters the per-model series into the time-major result layout.

use rayon::prelude::*;

use super::{ComputeKernel, KernelOutput, KernelRequest};
use crate::marshal::output_index;
use somasim_neural::models::{CompartmentModel, HHConstants, HodgkinHuxleyModel};
use somasim_neural::types::{Result, SolverError, StateVector};

/// Rayon-parallel CPU kernel for any compartment model
pub struct CpuKernel<M: CompartmentModel = HodgkinHuxleyModel> {
    /// Kernel name for logging
    name: String,

    /// Compartment dynamics with their fixed constants
    model: M,
}

impl<M: CompartmentModel> CpuKernel<M> {
    pub fn new(model: M) -> Self {
        Self {
            name: format!("CPU (rayon) - {}", model.model_name()),
            model,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl CpuKernel<HodgkinHuxleyModel> {
    /// Hodgkin-Huxley kernel with the given constants
    pub fn hodgkin_huxley(constants: HHConstants) -> Self {
        Self::new(HodgkinHuxleyModel::new(constants))
    }
}

impl Default for CpuKernel<HodgkinHuxleyModel> {
    fn default() -> Self {
        Self::hodgkin_huxley(HHConstants::default())
    }
}

impl<M: CompartmentModel> ComputeKernel<M::State> for CpuKernel<M> {
    fn kernel_name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, request: &KernelRequest<'_, M::State>) -> Result<KernelOutput> {
        let model_count = request.model_count();
        let step_count = request.step_count;
        let dt = request.step_length;

        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::KernelFailure(format!(
                "step length must be positive and finite, got {}",
                dt
            )));
        }

        let inputs = request.inputs;
        let model = &self.model;

        // Phase 1: integrate each model independently
        let series: Vec<Vec<M::State>> = (0..model_count)
            .into_par_iter()
            .map(|position| {
                let stimulus = inputs.stimulus()[position];
                let mut state = inputs.state_at(position);
                let mut series = Vec::with_capacity(step_count);
                for _ in 0..step_count {
                    state = model.integrate_step(&state, stimulus, dt);
                    series.push(state);
                }
                series
            })
            .collect();

        // Phase 2: scatter into time-major, model-minor arrays
        let mut fields = vec![vec![0.0f32; model_count * step_count]; M::State::field_count()];
        for (position, states) in series.iter().enumerate() {
            for (step, state) in states.iter().enumerate() {
                let index = output_index(step + 1, position, model_count);
                state.visit_fields(|field, value| fields[field][index] = value);
            }
        }

        Ok(KernelOutput::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::pack;
    use somasim_neural::types::{HHState, Model};

    fn kernel() -> CpuKernel {
        CpuKernel::default()
    }

    #[test]
    fn test_cpu_kernel_creation() {
        let kernel = kernel();
        assert_eq!(kernel.kernel_name(), "CPU (rayon) - Hodgkin-Huxley");
    }

    #[test]
    fn test_cpu_kernel_layout_matches_sequential_integration() {
        let models = vec![
            Model::hodgkin_huxley(0u32, -10.0, 0.0, 0.0, 1.0, 0.0),
            Model::hodgkin_huxley(1u32, 0.0, 0.3, 0.05, 0.6, 10.0),
        ];
        let packed = pack(&models).unwrap();
        let mut kernel = kernel();
        let output = kernel.run(&KernelRequest::new(0.01, 5, &packed)).unwrap();
        assert_eq!(output.fields().len(), 4);
        assert!(output.fields().iter().all(|field| field.len() == 10));

        let hh = HodgkinHuxleyModel::default();
        let mut state = models[1].state;
        for step in 1..=5 {
            state = hh.integrate_step(&state, 10.0, 0.01);
            let index = output_index(step, 1, 2);
            let stored = HHState::from_fn(|field| output.fields()[field][index]);
            assert_eq!(stored, state);
        }
    }

    #[test]
    fn test_cpu_kernel_is_deterministic() {
        let models: Vec<Model> = (0..64u32)
            .map(|i| Model::hodgkin_huxley(i, -(i as f32) * 0.25, 0.0, 0.0, 1.0, 0.0))
            .collect();
        let packed = pack(&models).unwrap();
        let mut kernel = kernel();
        let request = KernelRequest::new(0.01, 50, &packed);
        let first = kernel.run(&request).unwrap();
        let second = kernel.run(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cpu_kernel_rejects_bad_step_length() {
        let models = vec![Model::hodgkin_huxley(0u32, 0.0, 0.0, 0.0, 0.0, 0.0)];
        let packed = pack(&models).unwrap();
        let mut kernel = kernel();
        let result = kernel.run(&KernelRequest::new(f32::NAN, 5, &packed));
        assert!(matches!(result, Err(SolverError::KernelFailure(_))));
    }
}
