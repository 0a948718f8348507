// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Time Windows
//!
//! A [`TimeWindow`] describes one bounded kernel invocation: how long each
//! integration step is, how many steps run, and which steps are retained.
//!
//! ## Sampling policy
//!
//! Steps are numbered from 1. Step `t` is retained when `t % sample_period == 0`,
//! so a window keeps `floor(step_count / sample_period)` samples and silently
//! drops the trailing `step_count % sample_period` steps. A window whose tail is
//! dropped must not be the source of a carried-forward state (see
//! [`TimeWindow::is_chain_safe`]).

use super::error::{Result, SolverError};

/// Step length, step count and sampling period of one integration run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    step_length: f32,
    step_count: usize,
    sample_period: usize,
}

impl TimeWindow {
    /// Create a validated window.
    ///
    /// # Errors
    /// `InvalidWindow` if `step_length` is not a positive finite number, if
    /// `step_count` is zero, or if `sample_period` is zero.
    pub fn new(step_length: f32, step_count: usize, sample_period: usize) -> Result<Self> {
        if !step_length.is_finite() || step_length <= 0.0 {
            return Err(SolverError::InvalidWindow(format!(
                "step_length must be positive and finite, got {}",
                step_length
            )));
        }
        if step_count == 0 {
            return Err(SolverError::InvalidWindow(
                "step_count must be greater than zero".to_string(),
            ));
        }
        if sample_period == 0 {
            return Err(SolverError::InvalidWindow(
                "sample_period must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            step_length,
            step_count,
            sample_period,
        })
    }

    pub fn step_length(&self) -> f32 {
        self.step_length
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn sample_period(&self) -> usize {
        self.sample_period
    }

    /// Number of samples the window retains per model
    pub fn retained_samples(&self) -> usize {
        self.step_count / self.sample_period
    }

    /// Trailing steps that are simulated but never sampled
    pub fn dropped_tail_steps(&self) -> usize {
        self.step_count % self.sample_period
    }

    /// True when the last simulated step is also the last sampled step.
    ///
    /// Only chain-safe windows may hand their final state to a following window.
    pub fn is_chain_safe(&self) -> bool {
        self.dropped_tail_steps() == 0
    }

    /// Simulated time covered by the window
    pub fn duration(&self) -> f64 {
        self.step_length as f64 * self.step_count as f64
    }

    /// Same step length and sampling, different step count
    pub fn with_step_count(&self, step_count: usize) -> Result<Self> {
        Self::new(self.step_length, step_count, self.sample_period)
    }

    /// Split into `parts` equal consecutive windows.
    ///
    /// # Errors
    /// `InvalidWindow` if `parts` is zero or does not divide `step_count`.
    pub fn split(&self, parts: usize) -> Result<Vec<Self>> {
        if parts == 0 || self.step_count % parts != 0 {
            return Err(SolverError::InvalidWindow(format!(
                "cannot split {} steps into {} equal windows",
                self.step_count, parts
            )));
        }
        let window = self.with_step_count(self.step_count / parts)?;
        Ok(vec![window; parts])
    }

    /// Cover the window with consecutive windows of at most `max_steps` steps.
    ///
    /// Every window except the last holds a multiple of `sample_period` steps,
    /// so all carried windows are chain safe. The last window takes the remainder.
    ///
    /// # Errors
    /// `InvalidWindow` if `max_steps` is smaller than `sample_period`.
    pub fn partition(&self, max_steps: usize) -> Result<Vec<Self>> {
        if max_steps < self.sample_period {
            return Err(SolverError::InvalidWindow(format!(
                "max_steps ({}) is smaller than sample_period ({})",
                max_steps, self.sample_period
            )));
        }
        let chunk = max_steps - max_steps % self.sample_period;
        let mut windows = Vec::with_capacity(self.step_count.div_ceil(chunk));
        let mut remaining = self.step_count;
        while remaining > 0 {
            let steps = remaining.min(chunk);
            windows.push(self.with_step_count(steps)?);
            remaining -= steps;
        }
        Ok(windows)
    }
}
