// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # somasim - Batched Hodgkin-Huxley Compartment Solver
//!
//! Integrates many independent Hodgkin-Huxley compartments in parallel on a
//! CPU thread pool or a GPU, and returns one sampled trajectory per model.
//! Long horizons run as a chain of bounded windows whose final states are
//! carried forward, so device memory never has to hold the whole horizon.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! somasim = "0.1"                                     # CPU kernel
//! somasim = { version = "0.1", features = ["gpu"] }   # + WGPU kernel
//! ```
//!
//! ## Feature Flags
//! - **`gpu`**: WGPU kernel (Metal/Vulkan/DirectX 12)
//! - **`file-logging`**: rolling log files in timestamped run folders
//!
//! ## Usage Examples
//!
//! ### Direct API
//!
//! ```rust,no_run
//! use somasim::prelude::*;
//!
//! let models: Vec<Model> = (0..30u32)
//!     .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, 0.0))
//!     .collect();
//! let window = TimeWindow::new(0.01, 13_000, 10)?;
//!
//! let mut solver = Solver::new(CpuKernel::hodgkin_huxley(HHConstants::default()));
//! let trajectories = solver.solve(&models, &window)?;
//! assert_eq!(trajectories[0].len(), 1_300);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### From a configuration file
//!
//! ```rust,no_run
//! use somasim::prelude::*;
//!
//! let config = somasim::config::load_config(None, None)?;
//! let models: Vec<Model> = (0..1_000u32)
//!     .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, 0.0))
//!     .collect();
//!
//! let mut solver = somasim::build_solver(&config, models.len())?;
//! let trajectories = somasim::solve_from_config(&mut solver, &config.solver, &models)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## License
//!
//! Apache-2.0

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod setup;

// Re-export workspace crates
pub use somasim_config as config;
pub use somasim_engine as engine;
pub use somasim_neural as neural;
pub use somasim_observability as observability;

pub use setup::{
    backend_config_from_config, build_solver, constants_from_config, debug_flags_from_config,
    init_logging_from_config, init_thread_pool, merge_debug_flags, solve_from_config,
    window_from_config, windows_from_config, LogHandle, SomasimError,
};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use somasim_engine::{
        BackendConfig, BackendType, ChainError, ComputeKernel, CpuKernel, HoldInitialStimulus,
        Solver, StimulusProtocol, ZeroStimulus,
    };
    #[cfg(feature = "gpu")]
    pub use somasim_engine::WgpuKernel;
    pub use somasim_neural::{
        CompartmentModel, HHConstants, HHState, HodgkinHuxleyModel, Model, ModelId, SolverError,
        StateVector, TimeWindow, Trajectory,
    };
}
