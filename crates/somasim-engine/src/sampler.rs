// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Result Sampler
//!
//! Decides which simulated steps are retained. Steps are numbered from 1 and
//! step `t` is kept exactly when `t` is a multiple of the sample period.
//!
//! Trailing steps after the last multiple are simulated and discarded. The
//! window chainer refuses to carry state out of a window that drops a tail.

/// True iff the 1-based `time_step` is an exact multiple of `sample_period`.
///
/// A zero period or a zero step never samples.
#[inline]
pub fn should_sample(time_step: usize, sample_period: usize) -> bool {
    time_step > 0 && sample_period > 0 && time_step % sample_period == 0
}

/// Retained 1-based steps of a window of `step_count` steps, ascending
pub fn sampled_steps(step_count: usize, sample_period: usize) -> impl Iterator<Item = usize> {
    // An empty range when the period is zero keeps step_by away from a zero stride
    let first = if sample_period == 0 {
        step_count + 1
    } else {
        sample_period
    };
    (first..=step_count).step_by(sample_period.max(1))
}

/// Number of retained steps, `floor(step_count / sample_period)`
#[inline]
pub fn sample_count(step_count: usize, sample_period: usize) -> usize {
    step_count.checked_div(sample_period).unwrap_or(0)
}
