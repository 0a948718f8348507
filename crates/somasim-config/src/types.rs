// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `somasim.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SomasimConfig {
    pub system: SystemConfig,
    pub solver: SolverConfig,
    pub model: ModelConfig,
    pub backend: BackendSettings,
    pub logging: LoggingConfig,
}

/// Process-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Worker threads for the CPU kernel (0 = one per core)
    pub max_cores: usize,
    /// Debug logging for every somasim crate
    pub debug: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_cores: 0,
            debug: false,
        }
    }
}

/// Integration horizon and sampling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Integration step in ms
    pub step_length: f32,
    /// Steps in the whole horizon
    pub step_count: usize,
    /// Retain every `sample_period`-th step
    pub sample_period: usize,
    /// Equal windows the horizon is split into (1 = single window)
    pub windows: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            step_length: 0.01,
            step_count: 13_000,
            sample_period: 1,
            windows: 1,
        }
    }
}

/// Hodgkin-Huxley physical constants (rest-at-zero convention, mV and mS/cm^2)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub g_k: f32,
    pub g_na: f32,
    pub g_leak: f32,
    pub e_k: f32,
    pub e_na: f32,
    pub e_leak: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            g_k: 36.0,
            g_na: 120.0,
            g_leak: 0.3,
            e_k: -12.0,
            e_na: 115.0,
            e_leak: 10.613,
        }
    }
}

/// Compute kernel selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// "cpu", "wgpu" or "auto"
    pub backend: String,
    pub gpu_model_threshold: usize,
    pub gpu_memory_fraction: f64,
    /// Cap on result bytes per window; longer horizons are chained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_window_bytes: Option<u64>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            gpu_model_threshold: 10_000,
            gpu_memory_fraction: 0.8,
            max_window_bytes: None,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level (trace, debug, info, warn, error)
    pub level: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    /// Run folders older than this are deleted at startup
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("logs"),
            retention_days: 7,
        }
    }
}
