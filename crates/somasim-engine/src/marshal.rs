// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Buffer Marshaller
//!
//! Converts a batch of [`Model`]s into flat device buffers and device results
//! back into per-model [`Trajectory`]s.
//!
//! ## Layouts
//!
//! ```text
//! Input  (model-major):              field_in[p]
//! Output (time-major, model-minor):  field_out[(t - 1) * model_count + p]
//!
//!     t = 1-based step, p = position of the model in the batch
//! ```
//!
//! Batch position is the only identity used by buffers. Every index computation
//! goes through [`input_index`], [`output_index`] or [`output_coordinates`].

use core::marker::PhantomData;

use crate::sampler::sampled_steps;
use somasim_neural::types::{HHState, Model, Result, SolverError, StateVector, TimeWindow, Trajectory};

/// Name of the stimulus input buffer
pub const STIMULUS_FIELD: &str = "I";

/// Flat input index of the model at `position`
#[inline(always)]
pub fn input_index(position: usize) -> usize {
    position
}

/// Flat output index of the model at `position` after the 1-based `time_step`
#[inline(always)]
pub fn output_index(time_step: usize, position: usize, model_count: usize) -> usize {
    (time_step - 1) * model_count + position
}

/// Inverse of [`output_index`]: `(time_step, position)` of a flat output index
#[inline(always)]
pub fn output_coordinates(index: usize, model_count: usize) -> (usize, usize) {
    (index / model_count + 1, index % model_count)
}

/// Host-side input buffers of one window: one flat array per state field plus stimulus
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBatch<S: StateVector = HHState> {
    fields: Vec<Vec<f32>>,
    stimulus: Vec<f32>,
    _state: PhantomData<S>,
}

impl<S: StateVector> PackedBatch<S> {
    pub fn model_count(&self) -> usize {
        self.stimulus.len()
    }

    /// State buffers in `S::FIELDS` order
    pub fn state_fields(&self) -> &[Vec<f32>] {
        &self.fields
    }

    pub fn stimulus(&self) -> &[f32] {
        &self.stimulus
    }

    /// Buffer by name: a state field or `"I"` for the stimulus
    pub fn field(&self, name: &str) -> Option<&[f32]> {
        if name == STIMULUS_FIELD {
            return Some(&self.stimulus);
        }
        S::field_index(name).map(|index| self.fields[index].as_slice())
    }

    /// Rebuild the input state of the model at `position`
    pub fn state_at(&self, position: usize) -> S {
        let index = input_index(position);
        S::from_fn(|field| self.fields[field][index])
    }

    /// Bytes the input buffers occupy on the device
    pub fn byte_len(&self) -> usize {
        (self.fields.len() + 1) * self.model_count() * core::mem::size_of::<f32>()
    }

    /// All input buffers back to back, `[field_0 | field_1 | ... | I]`
    pub fn consolidated(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity((self.fields.len() + 1) * self.model_count());
        for field in &self.fields {
            data.extend_from_slice(field);
        }
        data.extend_from_slice(&self.stimulus);
        data
    }
}

/// Pack a batch into parallel flat buffers, one scalar per model in batch order.
///
/// # Errors
/// `InvalidBatch` if `models` is empty.
pub fn pack<S: StateVector>(models: &[Model<S>]) -> Result<PackedBatch<S>> {
    if models.is_empty() {
        return Err(SolverError::InvalidBatch(
            "cannot pack an empty batch".to_string(),
        ));
    }

    let model_count = models.len();
    let mut fields = vec![vec![0.0f32; model_count]; S::field_count()];
    let mut stimulus = vec![0.0f32; model_count];

    for (position, model) in models.iter().enumerate() {
        let index = input_index(position);
        model
            .state
            .visit_fields(|field, value| fields[field][index] = value);
        stimulus[index] = model.stimulus;
    }

    Ok(PackedBatch {
        fields,
        stimulus,
        _state: PhantomData,
    })
}

/// Check kernel output against the layout implied by `model_count` and `window`
pub fn validate_outputs<S: StateVector>(
    outputs: &[Vec<f32>],
    model_count: usize,
    window: &TimeWindow,
) -> Result<()> {
    if outputs.len() != S::field_count() {
        return Err(SolverError::LayoutMismatch {
            field: "field count".to_string(),
            expected: S::field_count(),
            actual: outputs.len(),
        });
    }

    let expected = model_count * window.step_count();
    for (name, values) in S::FIELDS.iter().zip(outputs) {
        if values.len() != expected {
            return Err(SolverError::LayoutMismatch {
                field: (*name).to_string(),
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(())
}

/// Rebuild per-model trajectories from time-major kernel output.
///
/// `models` is the batch that was packed for this window; it supplies the
/// identities and fixes the position of every model. Only steps retained by the
/// window's sample period are read.
///
/// # Errors
/// - `InvalidBatch` if `models` is empty
/// - `LayoutMismatch` if the field count or any field length is wrong
pub fn unpack<S: StateVector>(
    outputs: &[Vec<f32>],
    models: &[Model<S>],
    window: &TimeWindow,
) -> Result<Vec<Trajectory<S>>> {
    if models.is_empty() {
        return Err(SolverError::InvalidBatch(
            "cannot unpack results for an empty batch".to_string(),
        ));
    }
    let model_count = models.len();
    validate_outputs::<S>(outputs, model_count, window)?;

    let retained = window.retained_samples();
    let mut trajectories: Vec<Trajectory<S>> = models
        .iter()
        .map(|model| Trajectory::with_capacity(model.id.clone(), retained))
        .collect();

    for time_step in sampled_steps(window.step_count(), window.sample_period()) {
        for (position, trajectory) in trajectories.iter_mut().enumerate() {
            let index = output_index(time_step, position, model_count);
            trajectory.push_state(S::from_fn(|field| outputs[field][index]));
        }
    }

    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Vec<Model> {
        vec![
            Model::hodgkin_huxley("a", -10.0, 0.1, 0.2, 0.3, 1.0),
            Model::hodgkin_huxley("b", -20.0, 0.4, 0.5, 0.6, 2.0),
            Model::hodgkin_huxley("c", -30.0, 0.7, 0.8, 0.9, 3.0),
        ]
    }

    #[test]
    fn test_index_functions() {
        assert_eq!(input_index(4), 4);
        assert_eq!(output_index(1, 0, 3), 0);
        assert_eq!(output_index(2, 0, 3), 3);
        assert_eq!(output_index(10, 2, 3), 29);
        for index in 0..30 {
            let (t, p) = output_coordinates(index, 3);
            assert_eq!(output_index(t, p, 3), index);
        }
    }

    #[test]
    fn test_pack_preserves_batch_order() {
        let packed = pack(&batch()).unwrap();
        assert_eq!(packed.model_count(), 3);
        assert_eq!(packed.field("V").unwrap(), &[-10.0, -20.0, -30.0]);
        assert_eq!(packed.field("h").unwrap(), &[0.3, 0.6, 0.9]);
        assert_eq!(packed.field("I").unwrap(), &[1.0, 2.0, 3.0]);
        assert!(packed.field("x").is_none());
        assert_eq!(packed.state_at(1), HHState::new(-20.0, 0.4, 0.5, 0.6));
        assert_eq!(packed.byte_len(), 5 * 3 * 4);
        assert_eq!(packed.consolidated().len(), 15);
        assert_eq!(packed.consolidated()[12..], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_pack_rejects_empty_batch() {
        let empty: Vec<Model> = Vec::new();
        assert!(matches!(pack(&empty), Err(SolverError::InvalidBatch(_))));
    }

    #[test]
    fn test_unpack_rejects_short_field() {
        let models = batch();
        let window = TimeWindow::new(0.01, 4, 1).unwrap();
        let mut outputs = vec![vec![0.0; 12]; 4];
        outputs[2].pop();
        let err = unpack(&outputs, &models, &window).unwrap_err();
        assert_eq!(
            err,
            SolverError::LayoutMismatch {
                field: "m".to_string(),
                expected: 12,
                actual: 11
            }
        );
    }

    #[test]
    fn test_unpack_rejects_wrong_field_count() {
        let models = batch();
        let window = TimeWindow::new(0.01, 4, 1).unwrap();
        let outputs = vec![vec![0.0; 12]; 3];
        assert!(matches!(
            unpack(&outputs, &models, &window),
            Err(SolverError::LayoutMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_unpack_reads_every_field() {
        let models = batch();
        let window = TimeWindow::new(0.01, 2, 1).unwrap();
        // value = 1000 * field + flat index
        let outputs: Vec<Vec<f32>> = (0..4)
            .map(|field| (0..6).map(|i| (1000 * field + i) as f32).collect())
            .collect();
        let trajectories = unpack(&outputs, &models, &window).unwrap();
        let second = &trajectories[1].samples[1];
        assert_eq!(second.id.as_str(), "b");
        assert_eq!(second.state, HHState::new(4.0, 1004.0, 2004.0, 3004.0));
        assert_eq!(second.stimulus, 0.0);
    }
}
