// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks that values are within range and consistent with each other before
//! any solver is built. Every violation is collected and reported together.

use crate::{ConfigError, ConfigResult, SomasimConfig};

/// Backend names accepted by `backend.backend`
const BACKEND_NAMES: &[&str] = &["cpu", "wgpu", "gpu", "auto"];

/// Filter levels accepted by `logging.level`
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue { field: String, reason: String },
    Inconsistent { fields: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::Inconsistent { fields, reason } => {
                write!(f, "Inconsistent configuration ({}): {}", fields, reason)
            }
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Solver horizon fields (positive step, counts, period)
/// - Window split consistency (equal windows, sample period divides each)
/// - Physical constants (finite, non-negative conductances)
/// - Backend name, GPU threshold and memory fraction
/// - Log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &SomasimConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_solver(config, &mut errors);
    validate_model(config, &mut errors);
    validate_backend(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_solver(config: &SomasimConfig, errors: &mut Vec<ConfigValidationError>) {
    let solver = &config.solver;

    if !(solver.step_length.is_finite() && solver.step_length > 0.0) {
        errors.push(invalid("solver.step_length", "must be positive and finite"));
    }
    if solver.step_count == 0 {
        errors.push(invalid("solver.step_count", "must be at least 1"));
    }
    if solver.sample_period == 0 {
        errors.push(invalid("solver.sample_period", "must be at least 1"));
    }
    if solver.windows == 0 {
        errors.push(invalid("solver.windows", "must be at least 1"));
    }

    // Cross-field checks only make sense once the fields themselves are valid
    if solver.step_count == 0 || solver.sample_period == 0 || solver.windows <= 1 {
        return;
    }
    if solver.step_count % solver.windows != 0 {
        errors.push(ConfigValidationError::Inconsistent {
            fields: "solver.step_count, solver.windows".to_string(),
            reason: format!(
                "{} steps cannot be split into {} equal windows",
                solver.step_count, solver.windows
            ),
        });
    } else if (solver.step_count / solver.windows) % solver.sample_period != 0 {
        errors.push(ConfigValidationError::Inconsistent {
            fields: "solver.windows, solver.sample_period".to_string(),
            reason: format!(
                "windows of {} steps are not a multiple of the sample period {}",
                solver.step_count / solver.windows,
                solver.sample_period
            ),
        });
    }
}

fn validate_model(config: &SomasimConfig, errors: &mut Vec<ConfigValidationError>) {
    let model = &config.model;
    let values = [
        ("model.g_k", model.g_k, true),
        ("model.g_na", model.g_na, true),
        ("model.g_leak", model.g_leak, true),
        ("model.e_k", model.e_k, false),
        ("model.e_na", model.e_na, false),
        ("model.e_leak", model.e_leak, false),
    ];

    for (field, value, is_conductance) in values {
        if !value.is_finite() {
            errors.push(invalid(field, "must be finite"));
        } else if is_conductance && value < 0.0 {
            errors.push(invalid(field, "conductance must be non-negative"));
        }
    }
}

fn validate_backend(config: &SomasimConfig, errors: &mut Vec<ConfigValidationError>) {
    let backend = &config.backend;

    if !BACKEND_NAMES.contains(&backend.backend.to_lowercase().as_str()) {
        errors.push(invalid(
            "backend.backend",
            format!("'{}' is not one of {}", backend.backend, BACKEND_NAMES.join(", ")),
        ));
    }
    if backend.gpu_model_threshold == 0 {
        errors.push(invalid("backend.gpu_model_threshold", "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&backend.gpu_memory_fraction) {
        errors.push(invalid(
            "backend.gpu_memory_fraction",
            "must be between 0.0 and 1.0",
        ));
    }
    if backend.max_window_bytes == Some(0) {
        errors.push(invalid("backend.max_window_bytes", "must be positive when set"));
    }
}

fn validate_logging(config: &SomasimConfig, errors: &mut Vec<ConfigValidationError>) {
    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(invalid(
            "logging.level",
            format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        ));
    }
}
