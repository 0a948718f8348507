// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Compartment model entity and state-variable sets.
//!
//! A [`Model`] is one simulated compartment: a caller-assigned identity, a state
//! vector and an external stimulus current. Buffer code never looks at concrete
//! state fields; it goes through [`StateVector`], which names the fields in the
//! order they appear in flat buffers.

use core::fmt;
use std::sync::Arc;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Opaque, caller-assigned model identity.
///
/// Only used to correlate output with input. Never used for ordering: batch
/// position is the identity the solver relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "std", serde(transparent))]
pub struct ModelId(Arc<str>);

impl ModelId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<u32> for ModelId {
    fn from(id: u32) -> Self {
        Self::new(id.to_string())
    }
}

impl From<u64> for ModelId {
    fn from(id: u64) -> Self {
        Self::new(id.to_string())
    }
}

impl From<usize> for ModelId {
    fn from(id: usize) -> Self {
        Self::new(id.to_string())
    }
}

/// A set of real-valued state variables that can cross the host/device boundary.
///
/// Implementors define the field order used by every flat buffer. Adding a new
/// compartment kind means adding a new `StateVector` (and a kernel for it);
/// the marshaller and the chainer stay unchanged.
pub trait StateVector: Copy + fmt::Debug + Send + Sync + 'static {
    /// Field names, in flat-buffer order
    const FIELDS: &'static [&'static str];

    /// Visit every field as `(field_index, value)` in buffer order
    fn visit_fields<F: FnMut(usize, f32)>(&self, visit: F);

    /// Build a state from one value per field, requested by field index
    fn from_fn<F: FnMut(usize) -> f32>(value: F) -> Self;

    /// Number of tracked fields
    fn field_count() -> usize {
        Self::FIELDS.len()
    }

    /// Buffer index of a named field
    fn field_index(name: &str) -> Option<usize> {
        Self::FIELDS.iter().position(|field| *field == name)
    }
}

/// Hodgkin-Huxley compartment state: membrane potential and the three gating variables.
///
/// Potentials are in mV relative to rest; gates are dimensionless in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct HHState {
    #[cfg_attr(feature = "std", serde(rename = "V"))]
    pub v: f32,
    pub n: f32,
    pub m: f32,
    pub h: f32,
}

impl HHState {
    pub fn new(v: f32, n: f32, m: f32, h: f32) -> Self {
        Self { v, n, m, h }
    }

    /// True when every variable is a finite number
    pub fn is_finite(&self) -> bool {
        self.v.is_finite() && self.n.is_finite() && self.m.is_finite() && self.h.is_finite()
    }
}

impl StateVector for HHState {
    const FIELDS: &'static [&'static str] = &["V", "n", "m", "h"];

    #[inline]
    fn visit_fields<F: FnMut(usize, f32)>(&self, mut visit: F) {
        visit(0, self.v);
        visit(1, self.n);
        visit(2, self.m);
        visit(3, self.h);
    }

    #[inline]
    fn from_fn<F: FnMut(usize) -> f32>(mut value: F) -> Self {
        Self {
            v: value(0),
            n: value(1),
            m: value(2),
            h: value(3),
        }
    }
}

/// One simulated compartment
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct Model<S: StateVector = HHState> {
    pub id: ModelId,
    pub state: S,
    /// External stimulus current `I`
    pub stimulus: f32,
}

impl<S: StateVector> Model<S> {
    pub fn new(id: impl Into<ModelId>, state: S, stimulus: f32) -> Self {
        Self {
            id: id.into(),
            state,
            stimulus,
        }
    }

    /// Sampled output state. Snapshots carry no stimulus (`I = 0`).
    pub fn snapshot(id: ModelId, state: S) -> Self {
        Self {
            id,
            state,
            stimulus: 0.0,
        }
    }

    pub fn with_stimulus(mut self, stimulus: f32) -> Self {
        self.stimulus = stimulus;
        self
    }
}

impl Model<HHState> {
    /// Hodgkin-Huxley compartment from `(V, n, m, h, I)`
    pub fn hodgkin_huxley(id: impl Into<ModelId>, v: f32, n: f32, m: f32, h: f32, i: f32) -> Self {
        Self::new(id, HHState::new(v, n, m, h), i)
    }

    pub fn v(&self) -> f32 {
        self.state.v
    }
}
