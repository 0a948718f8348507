// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Solver
//!
//! Caller-facing entry points. A [`Solver`] owns one kernel and runs either a
//! single window (`solve`) or a chain of windows (`solve_chained`,
//! `solve_horizon`). It keeps no state between calls beyond the counters of
//! the last chain.
//!
//! A horizon split by the kernel limit or the byte budget holds every model's
//! initial stimulus across the split, so it reproduces the single-window
//! result.

use std::time::Instant;

use crate::backend::{ComputeKernel, KernelRequest};
use crate::chain::{empty_trajectories, ChainError, ChainStats, HoldInitialStimulus, StimulusProtocol, WindowChainer};
use crate::marshal::{pack, unpack};
use somasim_neural::types::{Model, Result, SolverError, StateVector, TimeWindow, Trajectory};
use tracing::{debug, info};

/// Partition `total` so each window's result buffers fit `max_window_bytes`.
///
/// Result buffers take `fields x model_count x step_count x 4` bytes. Every
/// window except the last is a multiple of the sample period.
///
/// # Errors
/// - `InvalidBatch` if `model_count` is zero
/// - `InvalidWindow` if not even one sample period fits the budget
pub fn plan_windows<S: StateVector>(
    total: &TimeWindow,
    model_count: usize,
    max_window_bytes: u64,
) -> Result<Vec<TimeWindow>> {
    if model_count == 0 {
        return Err(SolverError::InvalidBatch(
            "cannot plan windows for an empty batch".to_string(),
        ));
    }
    let bytes_per_step = (S::field_count() * model_count * core::mem::size_of::<f32>()) as u64;
    let max_steps = (max_window_bytes / bytes_per_step) as usize;
    if max_steps < total.sample_period() {
        return Err(SolverError::InvalidWindow(format!(
            "a window budget of {} bytes fits {} steps for {} models, \
             less than one sample period of {} steps",
            max_window_bytes,
            max_steps,
            model_count,
            total.sample_period()
        )));
    }
    total.partition(max_steps)
}

/// Batch solver over one compute kernel
pub struct Solver<K> {
    kernel: K,
    max_window_bytes: Option<u64>,
    last_chain_stats: ChainStats,
}

impl<K> Solver<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            max_window_bytes: None,
            last_chain_stats: ChainStats::default(),
        }
    }

    /// Cap the result memory of any window run by `solve_horizon`
    pub fn with_max_window_bytes(mut self, max_window_bytes: u64) -> Self {
        self.max_window_bytes = Some(max_window_bytes);
        self
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn into_kernel(self) -> K {
        self.kernel
    }

    /// Counters of the most recent chained run
    pub fn last_chain_stats(&self) -> ChainStats {
        self.last_chain_stats
    }

    /// Integrate one window and return one trajectory per model, in batch order
    pub fn solve<S>(&mut self, batch: &[Model<S>], window: &TimeWindow) -> Result<Vec<Trajectory<S>>>
    where
        S: StateVector,
        K: ComputeKernel<S>,
    {
        let packed = pack(batch)?;
        let request = KernelRequest::new(window.step_length(), window.step_count(), &packed);

        info!(
            "Solving {} models for {} steps of {} ms on {}",
            batch.len(),
            window.step_count(),
            window.step_length(),
            self.kernel.kernel_name()
        );
        debug!(
            "Device memory: {} bytes of inputs, {} bytes of results",
            packed.byte_len(),
            request.output_byte_len()
        );

        let start = Instant::now();
        let output = self.kernel.run(&request)?;
        info!("Kernel finished in {:?}", start.elapsed());

        unpack(output.fields(), batch, window)
    }

    /// Run consecutive windows, carrying final states forward
    pub fn solve_chained<S, P>(
        &mut self,
        batch: &[Model<S>],
        windows: &[TimeWindow],
        protocol: &mut P,
    ) -> std::result::Result<Vec<Trajectory<S>>, ChainError<S>>
    where
        S: StateVector,
        K: ComputeKernel<S>,
        P: StimulusProtocol<S> + ?Sized,
    {
        let mut chainer = WindowChainer::new(&mut self.kernel);
        let result = chainer.run(batch, windows, protocol);
        self.last_chain_stats = chainer.stats();
        result
    }

    /// Run `total` as a chain of windows sized to the kernel and byte budget.
    ///
    /// Each model keeps its initial stimulus in every planned window, so the
    /// result equals `solve(batch, total)` whenever that fits in one window.
    pub fn solve_horizon<S>(
        &mut self,
        batch: &[Model<S>],
        total: &TimeWindow,
    ) -> std::result::Result<Vec<Trajectory<S>>, ChainError<S>>
    where
        S: StateVector,
        K: ComputeKernel<S>,
    {
        let windows = self
            .plan_chain::<S>(batch.len(), std::slice::from_ref(total))
            .map_err(|source| ChainError {
                window: 0,
                partial: empty_trajectories(batch, 0),
                source,
            })?;
        debug!("Horizon of {} steps planned as {} windows", total.step_count(), windows.len());
        let mut protocol = HoldInitialStimulus::new(batch);
        self.solve_chained(batch, &windows, &mut protocol)
    }

    /// Split each window of a chain so none exceeds the kernel limit or byte budget.
    ///
    /// Sub-windows of a chain-safe window are chain safe, so a valid chain
    /// stays valid. Window boundaries of the input are kept.
    pub fn plan_chain<S>(&self, model_count: usize, windows: &[TimeWindow]) -> Result<Vec<TimeWindow>>
    where
        S: StateVector,
        K: ComputeKernel<S>,
    {
        let mut planned = Vec::with_capacity(windows.len());
        for window in windows {
            planned.extend(self.plan_for::<S>(model_count, window)?);
        }
        Ok(planned)
    }

    fn plan_for<S>(&self, model_count: usize, total: &TimeWindow) -> Result<Vec<TimeWindow>>
    where
        S: StateVector,
        K: ComputeKernel<S>,
    {
        if model_count == 0 {
            return Err(SolverError::InvalidBatch(
                "cannot solve an empty batch".to_string(),
            ));
        }
        let mut windows = vec![*total];
        if let Some(max_steps) = self.kernel.max_steps_per_window(model_count) {
            if max_steps < total.step_count() {
                windows = total.partition(max_steps)?;
            }
        }
        if let Some(budget) = self.max_window_bytes {
            let largest = windows.iter().map(TimeWindow::step_count).max().unwrap_or(0);
            let planned = plan_windows::<S>(total, model_count, budget)?;
            let planned_largest = planned.iter().map(TimeWindow::step_count).max().unwrap_or(0);
            if planned_largest < largest {
                windows = planned;
            }
        }
        Ok(windows)
    }
}
