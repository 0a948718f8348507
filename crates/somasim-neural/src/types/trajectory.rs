// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-model time series of sampled snapshots.

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

use super::model::{HHState, Model, ModelId, StateVector};

/// Time-ordered snapshots of one model, one entry per retained step
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct Trajectory<S: StateVector = HHState> {
    pub model_id: ModelId,
    pub samples: Vec<Model<S>>,
}

impl<S: StateVector> Trajectory<S> {
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            samples: Vec::new(),
        }
    }

    pub fn with_capacity(model_id: ModelId, capacity: usize) -> Self {
        Self {
            model_id,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append a snapshot of `state` (stimulus is zero on snapshots)
    pub fn push_state(&mut self, state: S) {
        self.samples
            .push(Model::snapshot(self.model_id.clone(), state));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample, the carry-forward candidate for a following window
    pub fn last(&self) -> Option<&Model<S>> {
        self.samples.last()
    }

    /// Append all samples of a later window, keeping time order
    pub fn extend_from(&mut self, other: Trajectory<S>) {
        self.samples.extend(other.samples);
    }

    /// Values of one named field across all samples
    pub fn field_series(&self, field: &str) -> Option<Vec<f32>> {
        let index = S::field_index(field)?;
        let series = self
            .samples
            .iter()
            .map(|sample| {
                let mut value = 0.0;
                sample.state.visit_fields(|i, v| {
                    if i == index {
                        value = v;
                    }
                });
                value
            })
            .collect();
        Some(series)
    }
}

impl Trajectory<HHState> {
    /// Membrane potential series
    pub fn voltages(&self) -> Vec<f32> {
        self.samples.iter().map(|sample| sample.state.v).collect()
    }

    /// Largest membrane potential reached, if any samples exist
    pub fn peak_voltage(&self) -> Option<f32> {
        self.samples
            .iter()
            .map(|sample| sample.state.v)
            .reduce(f32::max)
    }
}
