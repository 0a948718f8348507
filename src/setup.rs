// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bridges from configuration sections to ready-to-run engine types.

use somasim_config::{
    validate_config, BackendSettings, ConfigError, LoggingConfig, ModelConfig, SolverConfig,
    SomasimConfig, SystemConfig,
};
use somasim_engine::{
    create_kernel, BackendConfig, BackendType, ChainError, ComputeKernel, HoldInitialStimulus,
    ParseBackendError, Solver,
};
use somasim_neural::{HHConstants, HHState, Model, SolverError, TimeWindow, Trajectory};
use somasim_observability::CrateDebugFlags;
use tracing::{debug, info};

/// Errors raised while turning a configuration into a solver
#[derive(Debug, thiserror::Error)]
pub enum SomasimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("Unsupported backend in configuration: {0}")]
    Backend(#[from] ParseBackendError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Failed to build the CPU thread pool: {0}")]
    ThreadPool(String),
}

/// The whole configured horizon as one window
pub fn window_from_config(solver: &SolverConfig) -> Result<TimeWindow, SolverError> {
    TimeWindow::new(solver.step_length, solver.step_count, solver.sample_period)
}

/// The configured horizon split into `solver.windows` equal windows
pub fn windows_from_config(solver: &SolverConfig) -> Result<Vec<TimeWindow>, SolverError> {
    window_from_config(solver)?.split(solver.windows)
}

pub fn constants_from_config(model: &ModelConfig) -> HHConstants {
    HHConstants::with_values(
        model.g_k,
        model.g_na,
        model.g_leak,
        model.e_k,
        model.e_na,
        model.e_leak,
    )
}

/// Backend choice and auto-selection settings
///
/// `cpu` is mapped to `force_cpu` so auto-selection can never pick the GPU.
///
/// # Errors
/// `ParseBackendError` for unknown names, and for `wgpu` when the `gpu`
/// feature is not compiled in.
pub fn backend_config_from_config(
    backend: &BackendSettings,
) -> Result<(BackendType, BackendConfig), ParseBackendError> {
    let backend_type: BackendType = backend.backend.parse()?;
    let config = BackendConfig {
        gpu_model_threshold: backend.gpu_model_threshold,
        gpu_memory_fraction: backend.gpu_memory_fraction,
        force_cpu: backend_type == BackendType::Cpu,
        ..BackendConfig::default()
    };
    Ok((backend_type, config))
}

/// Validate `config` and build a solver for a batch of `model_count` models
pub fn build_solver(
    config: &SomasimConfig,
    model_count: usize,
) -> Result<Solver<Box<dyn ComputeKernel<HHState>>>, SomasimError> {
    validate_config(config)?;

    let (backend_type, backend_config) = backend_config_from_config(&config.backend)?;
    let constants = constants_from_config(&config.model);
    let kernel = create_kernel(backend_type, model_count, constants, &backend_config)?;
    info!(
        "Built solver on {} for {} models",
        kernel.kernel_name(),
        model_count
    );

    let solver = Solver::new(kernel);
    Ok(match config.backend.max_window_bytes {
        Some(bytes) => solver.with_max_window_bytes(bytes),
        None => solver,
    })
}

/// Run the configured horizon on `solver`
///
/// The `solver.windows` split is kept and each window is further split to
/// fit the solver's byte budget and kernel limit. Every model holds its
/// initial stimulus for the whole horizon.
pub fn solve_from_config<K>(
    solver: &mut Solver<K>,
    solver_config: &SolverConfig,
    models: &[Model],
) -> Result<Vec<Trajectory>, SomasimError>
where
    K: ComputeKernel<HHState>,
{
    let windows = windows_from_config(solver_config)?;
    let planned = solver.plan_chain::<HHState>(models.len(), &windows)?;
    if planned.len() > windows.len() {
        debug!(
            "{} configured windows split into {} to fit the window budget",
            windows.len(),
            planned.len()
        );
    }
    let mut protocol = HoldInitialStimulus::new(models);
    Ok(solver.solve_chained(models, &planned, &mut protocol)?)
}

/// Debug flags from the command line and environment, widened by `system.debug`
pub fn debug_flags_from_config(system: &SystemConfig) -> CrateDebugFlags {
    merge_debug_flags(system, somasim_observability::parse_debug_flags())
}

/// `system.debug = true` turns on debug output for every crate
pub fn merge_debug_flags(system: &SystemConfig, mut flags: CrateDebugFlags) -> CrateDebugFlags {
    if system.debug {
        flags.enable_all();
    }
    flags
}

/// Size rayon's global pool from `system.max_cores` (0 leaves rayon's default)
///
/// Must run before the first CPU kernel call; the global pool can be built once.
pub fn init_thread_pool(system: &SystemConfig) -> Result<(), SomasimError> {
    if system.max_cores == 0 {
        return Ok(());
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(system.max_cores)
        .build_global()
        .map_err(|e| SomasimError::ThreadPool(e.to_string()))?;
    info!("CPU kernel limited to {} threads", system.max_cores);
    Ok(())
}

/// Keeps file logging alive; drop it at shutdown to flush
pub enum LogHandle {
    Console,
    #[cfg(feature = "file-logging")]
    File(somasim_observability::LoggingGuard),
}

/// Install the global subscriber described by the `[logging]` section
///
/// Without the `file-logging` feature, `file_logging = true` falls back to
/// console output.
pub fn init_logging_from_config(
    logging: &LoggingConfig,
    debug_flags: &CrateDebugFlags,
) -> anyhow::Result<LogHandle> {
    let level = logging.level.to_lowercase();

    #[cfg(feature = "file-logging")]
    if logging.file_logging {
        let guard = somasim_observability::init_logging(
            debug_flags,
            &level,
            &logging.log_dir,
            Some(u64::from(logging.retention_days)),
            None,
        )?;
        info!("Writing logs to {}", guard.log_dir().display());
        return Ok(LogHandle::File(guard));
    }

    somasim_observability::init_console_logging(debug_flags, &level)?;
    #[cfg(not(feature = "file-logging"))]
    if logging.file_logging {
        tracing::warn!("file_logging requested but the 'file-logging' feature is not enabled");
    }
    Ok(LogHandle::Console)
}
