// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Somasim Engine
//!
//! Batched integration of independent compartment models on a compute device.
//!
//! ## Data flow
//! ```text
//! caller ─► WindowChainer ─► pack ─► ComputeKernel::run ─► unpack (+ sampler) ─┐
//!              ▲                                                                │
//!              └──────────── carry last sample forward ◄────────────────────────┘
//! ```
//!
//! ## Architecture
//! - Flat `f32` buffers: model-major inputs, time-major/model-minor outputs
//! - Integer sampling (`t % period == 0`, 1-based steps)
//! - Rayon CPU kernel always available, WGPU kernel behind the `gpu` feature
//! - Device buffers live for one window and are never cached

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod chain;
pub mod marshal;
pub mod sampler;
pub mod solver;

pub use backend::{
    create_kernel, estimate_gpu_speedup, is_gpu_available, select_backend, BackendConfig,
    BackendDecision, BackendType, ComputeKernel, CpuKernel, KernelOutput, KernelRequest,
    ParseBackendError,
};
#[cfg(feature = "gpu")]
pub use backend::WgpuKernel;
pub use chain::{
    validate_chain, ChainError, ChainStats, HoldInitialStimulus, StimulusProtocol, WindowChainer,
    ZeroStimulus,
};
pub use marshal::{
    input_index, output_coordinates, output_index, pack, unpack, PackedBatch, STIMULUS_FIELD,
};
pub use sampler::{sample_count, sampled_steps, should_sample};
pub use solver::{plan_windows, Solver};

// Shared model types
pub use somasim_neural::{
    HHConstants, HHState, Model, ModelId, Result, SolverError, StateVector, TimeWindow, Trajectory,
};
