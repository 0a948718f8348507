// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Configuration to Solver Tests
//!
//! Loads TOML files from disk, builds solvers from them and checks the runs
//! follow the configured horizon, split and sampling.

use std::fs;

use somasim::config::{load_config, ConfigError, SomasimConfig};
use somasim::prelude::*;
use somasim::{build_solver, solve_from_config, windows_from_config, SomasimError};
use tempfile::tempdir;

fn reference_batch(count: u32) -> Vec<Model> {
    (0..count)
        .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, 0.0))
        .collect()
}

fn write_config(text: &str) -> (tempfile::TempDir, SomasimConfig) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("somasim.toml");
    fs::write(&path, text).unwrap();
    let config = load_config(Some(&path), None).unwrap();
    (dir, config)
}

#[test]
fn test_chained_config_matches_single_window() {
    let (_dir, config) = write_config(
        r#"
        [solver]
        step_length = 0.01
        step_count = 1200
        sample_period = 4
        windows = 6

        [backend]
        backend = "cpu"
        "#,
    );

    let models = reference_batch(5);
    let windows = windows_from_config(&config.solver).unwrap();
    assert_eq!(windows.len(), 6);

    let mut solver = build_solver(&config, models.len()).unwrap();
    let chained = solver
        .solve_chained(&models, &windows, &mut ZeroStimulus)
        .unwrap();
    assert!(chained.iter().all(|t| t.len() == 300));

    let single_window = somasim::window_from_config(&config.solver).unwrap();
    let single = solver.solve(&models, &single_window).unwrap();
    assert_eq!(chained, single);
}

#[test]
fn test_byte_budget_chains_horizon() {
    let (_dir, config) = write_config(
        r#"
        [solver]
        step_count = 800
        sample_period = 2

        [backend]
        backend = "cpu"
        max_window_bytes = 12800
        "#,
    );

    // 10 models x 4 fields x 4 bytes = 160 bytes per step, 80 steps per window
    let models = reference_batch(10);
    let total = somasim::window_from_config(&config.solver).unwrap();
    let mut solver = build_solver(&config, models.len()).unwrap();
    let result = solver.solve_horizon(&models, &total).unwrap();

    assert!(result.iter().all(|t| t.len() == 400));
    assert_eq!(solver.last_chain_stats().windows_completed, 10);
}

#[test]
fn test_configured_run_honors_byte_budget() {
    let (_dir, config) = write_config(
        r#"
        [solver]
        step_count = 1200
        sample_period = 4
        windows = 2

        [backend]
        backend = "cpu"
        max_window_bytes = 9600
        "#,
    );

    // 6 models x 16 bytes = 96 bytes per step, 100 steps per window;
    // each configured window of 600 steps becomes 6
    let models: Vec<Model> = (0..6u32)
        .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, 10.0))
        .collect();
    let mut solver = build_solver(&config, models.len()).unwrap();
    let result = solve_from_config(&mut solver, &config.solver, &models).unwrap();

    let stats = solver.last_chain_stats();
    assert_eq!(stats.windows_completed, 12);
    assert_eq!(stats.steps_simulated, 1200);
    assert!(result.iter().all(|t| t.len() == 300));

    // The stimulus is held across every split, matching one unbounded window
    let single_window = somasim::window_from_config(&config.solver).unwrap();
    let single = solver.solve(&models, &single_window).unwrap();
    assert_eq!(result, single);
}

#[test]
fn test_custom_constants_reach_kernel() {
    let (_dir, config) = write_config(
        r#"
        [solver]
        step_count = 1000
        sample_period = 1

        [model]
        g_na = 0.0

        [backend]
        backend = "cpu"
        "#,
    );

    // Without sodium conductance the compartment cannot fire
    let models = reference_batch(2);
    let window = somasim::window_from_config(&config.solver).unwrap();
    let mut solver = build_solver(&config, models.len()).unwrap();
    let result = solver.solve(&models, &window).unwrap();
    assert!(result[0].peak_voltage().unwrap() < 20.0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config) = write_config(
        r#"
        [solver]
        step_count = 1000
        windows = 3
        "#,
    );

    let result = build_solver(&config, 4);
    assert!(matches!(
        result,
        Err(SomasimError::Config(ConfigError::ValidationError(_)))
    ));
}
