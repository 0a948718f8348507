// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are layered in three tiers:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, SomasimConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "somasim.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "SOMASIM_CONFIG_PATH";

/// Find the somasim configuration file
///
/// Search order:
/// 1. `SOMASIM_CONFIG_PATH` environment variable
/// 2. Current working directory: `./somasim.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML.
/// Values are not validated here; see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SomasimConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: SomasimConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Parse `value` into `target`, leaving it untouched on a parse failure
fn set_parsed<T: FromStr>(target: &mut T, value: &str) {
    if let Ok(parsed) = value.parse::<T>() {
        *target = parsed;
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SOMASIM_MAX_CORES` -> `system.max_cores`
/// - `SOMASIM_DEBUG_MODE` -> `system.debug`
/// - `SOMASIM_STEP_LENGTH` -> `solver.step_length`
/// - `SOMASIM_STEP_COUNT` -> `solver.step_count`
/// - `SOMASIM_SAMPLE_PERIOD` -> `solver.sample_period`
/// - `SOMASIM_WINDOWS` -> `solver.windows`
/// - `SOMASIM_BACKEND` -> `backend.backend`
/// - `SOMASIM_GPU_MODEL_THRESHOLD` -> `backend.gpu_model_threshold`
/// - `SOMASIM_GPU_MEMORY_FRACTION` -> `backend.gpu_memory_fraction`
/// - `SOMASIM_MAX_WINDOW_BYTES` -> `backend.max_window_bytes`
/// - `SOMASIM_LOG_LEVEL` -> `logging.level`
/// - `SOMASIM_LOG_DIR` -> `logging.log_dir`
/// - `SOMASIM_FILE_LOGGING` -> `logging.file_logging`
///
/// `SOMASIM_DEBUG` is reserved for per-crate debug flags.
pub fn apply_environment_overrides(config: &mut SomasimConfig) {
    // System settings
    if let Ok(value) = env::var("SOMASIM_MAX_CORES") {
        set_parsed(&mut config.system.max_cores, &value);
    }
    if let Ok(value) = env::var("SOMASIM_DEBUG_MODE") {
        config.system.debug = parse_flag(&value);
    }

    // Solver settings
    if let Ok(value) = env::var("SOMASIM_STEP_LENGTH") {
        set_parsed(&mut config.solver.step_length, &value);
    }
    if let Ok(value) = env::var("SOMASIM_STEP_COUNT") {
        set_parsed(&mut config.solver.step_count, &value);
    }
    if let Ok(value) = env::var("SOMASIM_SAMPLE_PERIOD") {
        set_parsed(&mut config.solver.sample_period, &value);
    }
    if let Ok(value) = env::var("SOMASIM_WINDOWS") {
        set_parsed(&mut config.solver.windows, &value);
    }

    // Backend settings
    if let Ok(value) = env::var("SOMASIM_BACKEND") {
        config.backend.backend = value;
    }
    if let Ok(value) = env::var("SOMASIM_GPU_MODEL_THRESHOLD") {
        set_parsed(&mut config.backend.gpu_model_threshold, &value);
    }
    if let Ok(value) = env::var("SOMASIM_GPU_MEMORY_FRACTION") {
        set_parsed(&mut config.backend.gpu_memory_fraction, &value);
    }
    if let Ok(value) = env::var("SOMASIM_MAX_WINDOW_BYTES") {
        if let Ok(bytes) = value.parse::<u64>() {
            config.backend.max_window_bytes = Some(bytes);
        }
    }

    // Logging settings
    if let Ok(value) = env::var("SOMASIM_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("SOMASIM_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("SOMASIM_FILE_LOGGING") {
        config.logging.file_logging = parse_flag(&value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"step_count": "2000", "backend": "cpu"}`)
pub fn apply_cli_overrides(config: &mut SomasimConfig, cli_args: &HashMap<String, String>) {
    // System settings
    if let Some(value) = cli_args.get("max_cores") {
        set_parsed(&mut config.system.max_cores, value);
    }
    if let Some(value) = cli_args.get("debug") {
        config.system.debug = parse_flag(value);
    }

    // Solver settings
    if let Some(value) = cli_args.get("step_length") {
        set_parsed(&mut config.solver.step_length, value);
    }
    if let Some(value) = cli_args.get("step_count") {
        set_parsed(&mut config.solver.step_count, value);
    }
    if let Some(value) = cli_args.get("sample_period") {
        set_parsed(&mut config.solver.sample_period, value);
    }
    if let Some(value) = cli_args.get("windows") {
        set_parsed(&mut config.solver.windows, value);
    }

    // Backend settings
    if let Some(value) = cli_args.get("backend") {
        config.backend.backend = value.clone();
    }
    if let Some(value) = cli_args.get("max_window_bytes") {
        if let Ok(bytes) = value.parse::<u64>() {
            config.backend.max_window_bytes = Some(bytes);
        }
    }

    // Logging settings
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = PathBuf::from(value);
    }
}
