// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stub kernels shared by the integration tests.

#![allow(dead_code)]

use somasim_engine::{
    output_index, ComputeKernel, CpuKernel, HHState, KernelOutput, KernelRequest, Model, Result,
    SolverError,
};

/// Writes each array's flat index into V; gates are zero
pub struct IndexKernel;

impl ComputeKernel<HHState> for IndexKernel {
    fn kernel_name(&self) -> &str {
        "index stub"
    }

    fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
        let len = request.output_len();
        let v: Vec<f32> = (0..len).map(|i| i as f32).collect();
        Ok(KernelOutput::new(vec![
            v,
            vec![0.0; len],
            vec![0.0; len],
            vec![0.0; len],
        ]))
    }
}

/// Repeats every input state at every step
pub struct EchoKernel;

impl ComputeKernel<HHState> for EchoKernel {
    fn kernel_name(&self) -> &str {
        "echo stub"
    }

    fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
        let n = request.model_count();
        let mut fields = vec![vec![0.0; request.output_len()]; 4];
        for p in 0..n {
            let state = request.inputs.state_at(p);
            for t in 1..=request.step_count {
                let index = output_index(t, p, n);
                fields[0][index] = state.v;
                fields[1][index] = state.n;
                fields[2][index] = state.m;
                fields[3][index] = state.h;
            }
        }
        Ok(KernelOutput::new(fields))
    }
}

/// Returns arrays one element short
pub struct TruncatingKernel;

impl ComputeKernel<HHState> for TruncatingKernel {
    fn kernel_name(&self) -> &str {
        "truncating stub"
    }

    fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
        let len = request.output_len().saturating_sub(1);
        Ok(KernelOutput::new(vec![vec![0.0; len]; 4]))
    }
}

/// CPU kernel that fails on its `fail_on`-th call (0-based)
pub struct FailingKernel {
    inner: CpuKernel,
    calls: usize,
    fail_on: usize,
}

impl FailingKernel {
    pub fn new(fail_on: usize) -> Self {
        Self {
            inner: cpu_kernel(),
            calls: 0,
            fail_on,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ComputeKernel<HHState> for FailingKernel {
    fn kernel_name(&self) -> &str {
        "failing stub"
    }

    fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
        let call = self.calls;
        self.calls += 1;
        if call == self.fail_on {
            return Err(SolverError::KernelFailure(format!(
                "device lost on call {}",
                call
            )));
        }
        self.inner.run(request)
    }
}

pub fn cpu_kernel() -> CpuKernel {
    CpuKernel::default()
}

/// `count` identical models at the reference starting point (-10, 0, 0, 1), I = 0
pub fn reference_batch(count: u32) -> Vec<Model> {
    (0..count)
        .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, 0.0))
        .collect()
}
