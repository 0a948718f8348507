// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Window Chainer
//!
//! Runs a long horizon as a sequence of bounded windows. The last sampled
//! snapshot of each model in window `k - 1` becomes that model's input for
//! window `k`, after the caller's [`StimulusProtocol`] has had a chance to set
//! its stimulus.
//!
//! ## Carry-forward rule
//!
//! The carried state is the last *sampled* state. It is only the last
//! *simulated* state when the sample period divides the window's step count,
//! so every window except the last must satisfy that. Violations are rejected
//! with `InvalidWindow` before anything is dispatched.

use std::time::{Duration, Instant};

use crate::backend::{ComputeKernel, KernelRequest};
use crate::marshal::{pack, unpack};
use somasim_neural::types::{HHState, Model, Result, SolverError, StateVector, TimeWindow, Trajectory};
use tracing::{debug, info};

/// Hook that sets the stimulus of carried models before window `k > 0`
pub trait StimulusProtocol<S: StateVector = HHState> {
    fn apply(&mut self, window_index: usize, models: &mut [Model<S>]);
}

/// Leave carried snapshots at `I = 0`
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroStimulus;

impl<S: StateVector> StimulusProtocol<S> for ZeroStimulus {
    fn apply(&mut self, _window_index: usize, _models: &mut [Model<S>]) {}
}

/// Re-apply each position's initial stimulus to every window
#[derive(Debug, Clone, Default)]
pub struct HoldInitialStimulus {
    stimulus: Vec<f32>,
}

impl HoldInitialStimulus {
    pub fn new<S: StateVector>(initial: &[Model<S>]) -> Self {
        Self {
            stimulus: initial.iter().map(|model| model.stimulus).collect(),
        }
    }
}

impl<S: StateVector> StimulusProtocol<S> for HoldInitialStimulus {
    fn apply(&mut self, _window_index: usize, models: &mut [Model<S>]) {
        for (model, stimulus) in models.iter_mut().zip(&self.stimulus) {
            model.stimulus = *stimulus;
        }
    }
}

impl<S: StateVector, F: FnMut(usize, &mut [Model<S>])> StimulusProtocol<S> for F {
    fn apply(&mut self, window_index: usize, models: &mut [Model<S>]) {
        self(window_index, models)
    }
}

/// A chain aborted in window `window`
///
/// `partial` always holds one trajectory per input model, in batch order,
/// with the samples of windows `0..window`. A chain rejected before any
/// dispatch, or failing in window 0, has empty trajectories.
#[derive(Debug, thiserror::Error)]
#[error("Window chain failed in window {window}: {source}")]
pub struct ChainError<S: StateVector = HHState> {
    pub window: usize,
    pub partial: Vec<Trajectory<S>>,
    #[source]
    pub source: SolverError,
}

/// Per-chain counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChainStats {
    pub windows_completed: usize,
    pub steps_simulated: usize,
    pub samples_retained: usize,
    /// Time spent inside `ComputeKernel::run`, excluding pack and unpack
    pub kernel_time: Duration,
}

/// Check the carry-forward rule without touching a kernel
pub fn validate_chain(windows: &[TimeWindow]) -> Result<()> {
    if windows.is_empty() {
        return Err(SolverError::InvalidWindow(
            "a chain needs at least one window".to_string(),
        ));
    }
    let carried = windows.len() - 1;
    for (index, window) in windows[..carried].iter().enumerate() {
        if !window.is_chain_safe() {
            return Err(SolverError::InvalidWindow(format!(
                "window {} carries state forward but sample_period {} does not divide step_count {}",
                index,
                window.sample_period(),
                window.step_count()
            )));
        }
    }
    Ok(())
}

/// Runs consecutive windows on one kernel, threading final states between them
pub struct WindowChainer<'k, K: ?Sized> {
    kernel: &'k mut K,
    stats: ChainStats,
}

impl<'k, K: ?Sized> WindowChainer<'k, K> {
    pub fn new(kernel: &'k mut K) -> Self {
        Self {
            kernel,
            stats: ChainStats::default(),
        }
    }

    /// Counters of the most recent run
    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// Run `windows` in order starting from `initial`.
    ///
    /// Returns one trajectory per initial model, in batch order, holding the
    /// samples of every window back to back.
    pub fn run<S, P>(
        &mut self,
        initial: &[Model<S>],
        windows: &[TimeWindow],
        protocol: &mut P,
    ) -> std::result::Result<Vec<Trajectory<S>>, ChainError<S>>
    where
        S: StateVector,
        K: ComputeKernel<S>,
        P: StimulusProtocol<S> + ?Sized,
    {
        self.stats = ChainStats::default();

        let fail = |window: usize, partial: Vec<Trajectory<S>>, source: SolverError| ChainError {
            window,
            partial,
            source,
        };

        if initial.is_empty() {
            return Err(fail(
                0,
                Vec::new(),
                SolverError::InvalidBatch("cannot chain an empty batch".to_string()),
            ));
        }
        if let Err(source) = validate_chain(windows) {
            let window = windows
                .iter()
                .position(|w| !w.is_chain_safe())
                .unwrap_or(0);
            return Err(fail(window, empty_trajectories(initial, 0), source));
        }

        let total_samples: usize = windows.iter().map(TimeWindow::retained_samples).sum();
        let mut trajectories = empty_trajectories(initial, total_samples);
        let mut inputs: Vec<Model<S>> = initial.to_vec();
        let chain_start = Instant::now();

        for (index, window) in windows.iter().enumerate() {
            if index > 0 {
                protocol.apply(index, &mut inputs);
            }

            let (window_trajectories, elapsed) = match self.run_window(&inputs, window) {
                Ok(result) => result,
                Err(source) => return Err(fail(index, trajectories, source)),
            };

            if index + 1 < windows.len() {
                let carried: Option<Vec<Model<S>>> = window_trajectories
                    .iter()
                    .map(|trajectory| trajectory.last().cloned())
                    .collect();
                match carried {
                    Some(carried) => inputs = carried,
                    None => {
                        let source = SolverError::InvalidWindow(format!(
                            "window {} retained no samples to carry forward",
                            index
                        ));
                        return Err(fail(index, trajectories, source));
                    }
                }
            }

            for (global, local) in trajectories.iter_mut().zip(window_trajectories) {
                global.extend_from(local);
            }

            self.stats.windows_completed += 1;
            self.stats.steps_simulated += window.step_count();
            self.stats.samples_retained += window.retained_samples();
            self.stats.kernel_time += elapsed;

            debug!(
                "Window {}/{}: {} steps, {} samples per model, kernel {:?}",
                index + 1,
                windows.len(),
                window.step_count(),
                window.retained_samples(),
                elapsed
            );
        }

        info!(
            "Chain complete: {} windows, {} models, {} steps, {} samples per model in {:?}",
            self.stats.windows_completed,
            initial.len(),
            self.stats.steps_simulated,
            self.stats.samples_retained,
            chain_start.elapsed()
        );

        Ok(trajectories)
    }

    /// pack → run → unpack for a single window; also returns the kernel time
    fn run_window<S>(
        &mut self,
        inputs: &[Model<S>],
        window: &TimeWindow,
    ) -> Result<(Vec<Trajectory<S>>, Duration)>
    where
        S: StateVector,
        K: ComputeKernel<S>,
    {
        let packed = pack(inputs)?;
        let request = KernelRequest::new(window.step_length(), window.step_count(), &packed);
        let kernel_start = Instant::now();
        let output = self.kernel.run(&request)?;
        let elapsed = kernel_start.elapsed();
        Ok((unpack(output.fields(), inputs, window)?, elapsed))
    }
}

/// One empty trajectory per model, in batch order
pub(crate) fn empty_trajectories<S: StateVector>(
    models: &[Model<S>],
    capacity: usize,
) -> Vec<Trajectory<S>> {
    models
        .iter()
        .map(|model| Trajectory::with_capacity(model.id.clone(), capacity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::KernelOutput;
    use crate::marshal::output_index;

    /// Adds one to V at every step; other fields are copied through
    struct CountingKernel {
        calls: usize,
        fail_on_call: Option<usize>,
    }

    impl CountingKernel {
        fn new() -> Self {
            Self {
                calls: 0,
                fail_on_call: None,
            }
        }
    }

    impl ComputeKernel<HHState> for CountingKernel {
        fn kernel_name(&self) -> &str {
            "counting"
        }

        fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on_call == Some(call) {
                return Err(SolverError::KernelFailure("injected".to_string()));
            }
            let n = request.model_count();
            let mut fields = vec![vec![0.0; request.output_len()]; 4];
            for p in 0..n {
                let state = request.inputs.state_at(p);
                let stimulus = request.inputs.stimulus()[p];
                for t in 1..=request.step_count {
                    let index = output_index(t, p, n);
                    fields[0][index] = state.v + t as f32;
                    fields[1][index] = state.n;
                    fields[2][index] = stimulus;
                    fields[3][index] = state.h;
                }
            }
            Ok(KernelOutput::new(fields))
        }
    }

    fn models() -> Vec<Model> {
        vec![
            Model::hodgkin_huxley("a", 0.0, 0.0, 0.0, 1.0, 5.0),
            Model::hodgkin_huxley("b", 100.0, 0.0, 0.0, 1.0, 7.0),
        ]
    }

    #[test]
    fn test_chain_carries_last_sample() {
        let mut kernel = CountingKernel::new();
        let windows = vec![TimeWindow::new(0.1, 4, 2).unwrap(); 3];
        let mut chainer = WindowChainer::new(&mut kernel);
        let result = chainer.run(&models(), &windows, &mut ZeroStimulus).unwrap();

        assert_eq!(result[0].voltages(), vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
        assert_eq!(result[1].voltages(), vec![102.0, 104.0, 106.0, 108.0, 110.0, 112.0]);
        assert_eq!(result[1].model_id.as_str(), "b");

        let stats = chainer.stats();
        assert_eq!(stats.windows_completed, 3);
        assert_eq!(stats.steps_simulated, 12);
        assert_eq!(stats.samples_retained, 6);
    }

    #[test]
    fn test_stimulus_protocols() {
        let windows = vec![TimeWindow::new(0.1, 2, 1).unwrap(); 2];

        // Zero: the kernel echoes I into m, so window 1 sees 0
        let mut kernel = CountingKernel::new();
        let zero = WindowChainer::new(&mut kernel)
            .run(&models(), &windows, &mut ZeroStimulus)
            .unwrap();
        assert_eq!(zero[0].field_series("m"), Some(vec![5.0, 5.0, 0.0, 0.0]));

        let mut kernel = CountingKernel::new();
        let held = WindowChainer::new(&mut kernel)
            .run(&models(), &windows, &mut HoldInitialStimulus::new(&models()))
            .unwrap();
        assert_eq!(held[1].field_series("m"), Some(vec![7.0, 7.0, 7.0, 7.0]));

        let mut kernel = CountingKernel::new();
        let mut scripted = |k: usize, batch: &mut [Model]| {
            for model in batch.iter_mut() {
                model.stimulus = 10.0 * k as f32;
            }
        };
        let custom = WindowChainer::new(&mut kernel)
            .run(&models(), &windows, &mut scripted)
            .unwrap();
        assert_eq!(custom[0].field_series("m"), Some(vec![5.0, 5.0, 10.0, 10.0]));
    }

    #[test]
    fn test_rejects_unsafe_carried_window() {
        let mut kernel = CountingKernel::new();
        let windows = vec![
            TimeWindow::new(0.1, 4, 2).unwrap(),
            TimeWindow::new(0.1, 5, 2).unwrap(),
            TimeWindow::new(0.1, 5, 2).unwrap(),
        ];
        let err = WindowChainer::new(&mut kernel)
            .run(&models(), &windows, &mut ZeroStimulus)
            .unwrap_err();
        assert_eq!(err.window, 1);
        assert!(matches!(err.source, SolverError::InvalidWindow(_)));
        assert_eq!(kernel.calls, 0);

        // Same shape as a failure in window 0: one empty trajectory per model
        assert_eq!(err.partial.len(), 2);
        assert!(err.partial.iter().all(Trajectory::is_empty));
        assert_eq!(err.partial[1].model_id.as_str(), "b");
    }

    #[test]
    fn test_last_window_may_drop_tail() {
        let windows = vec![
            TimeWindow::new(0.1, 4, 2).unwrap(),
            TimeWindow::new(0.1, 5, 2).unwrap(),
        ];
        assert!(validate_chain(&windows).is_ok());
        assert!(validate_chain(&[]).is_err());
    }

    #[test]
    fn test_failure_returns_partial_results() {
        let mut kernel = CountingKernel::new();
        kernel.fail_on_call = Some(2);
        let windows = vec![TimeWindow::new(0.1, 3, 1).unwrap(); 4];
        let err = WindowChainer::new(&mut kernel)
            .run(&models(), &windows, &mut ZeroStimulus)
            .unwrap_err();
        assert_eq!(err.window, 2);
        assert_eq!(err.partial.len(), 2);
        assert!(err.partial.iter().all(|t| t.len() == 6));
        assert_eq!(err.source, SolverError::KernelFailure("injected".to_string()));
        assert_eq!(kernel.calls, 3);
    }

    /// Sleeps inside `run` so kernel time dominates the window
    struct SlowKernel(CountingKernel);

    impl ComputeKernel<HHState> for SlowKernel {
        fn kernel_name(&self) -> &str {
            "slow"
        }

        fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
            std::thread::sleep(Duration::from_millis(20));
            self.0.run(request)
        }
    }

    #[test]
    fn test_kernel_time_counts_kernel_calls() {
        let mut kernel = SlowKernel(CountingKernel::new());
        let windows = vec![TimeWindow::new(0.1, 2, 1).unwrap(); 3];
        let mut chainer = WindowChainer::new(&mut kernel);
        chainer.run(&models(), &windows, &mut ZeroStimulus).unwrap();

        let kernel_time = chainer.stats().kernel_time;
        assert!(kernel_time >= Duration::from_millis(60));

        // A failing kernel adds nothing for the failed window
        let mut kernel = CountingKernel::new();
        kernel.fail_on_call = Some(0);
        let mut chainer = WindowChainer::new(&mut kernel);
        assert!(chainer.run(&models(), &windows, &mut ZeroStimulus).is_err());
        assert_eq!(chainer.stats().kernel_time, Duration::ZERO);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let mut kernel = CountingKernel::new();
        let windows = vec![TimeWindow::new(0.1, 3, 1).unwrap()];
        let empty: Vec<Model> = Vec::new();
        let err = WindowChainer::new(&mut kernel)
            .run(&empty, &windows, &mut ZeroStimulus)
            .unwrap_err();
        assert_eq!(err.window, 0);
        assert!(matches!(err.source, SolverError::InvalidBatch(_)));
    }
}
