// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reference batch runner.
//!
//! Integrates a batch of identical compartments starting at (-10, 0, 0, 1)
//! with the configured horizon, backend and constants, then prints each
//! model's peak voltage and optionally writes all trajectories as JSON.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use somasim::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, ConfigError,
    SomasimConfig,
};
use somasim::observability::debug_flags_help;
use somasim::prelude::*;

struct Args {
    config: Option<PathBuf>,
    models: u32,
    stimulus: f32,
    output: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: solve_reference [--config <path>] [--models <n>] [--stimulus <I>]\n\
         \x20                      [--output <path>] [--set <key>=<value>]...\n\n\
         Defaults:\n\
         - config: SOMASIM_CONFIG_PATH or somasim.toml (built-in defaults if absent)\n\
         - models: 30\n\
         - stimulus: 0.0\n\n\
         Override keys: step_length, step_count, sample_period, windows, backend,\n\
         max_window_bytes, max_cores, log_level, log_dir, debug\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        models: 30,
        stimulus: 0.0,
        output: None,
        overrides: HashMap::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config = Some(PathBuf::from(v));
            }
            "--models" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.models = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--stimulus" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.stimulus = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--output" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.output = Some(PathBuf::from(v));
            }
            "--set" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                let (key, value) = v.split_once('=').unwrap_or_else(|| usage_and_exit());
                parsed.overrides.insert(key.to_string(), value.to_string());
            }
            "-h" | "--help" => usage_and_exit(),
            // Per-crate debug flags are read by parse_debug_flags
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    parsed
}

fn resolve_config(args: &Args) -> Result<SomasimConfig> {
    if let Some(path) = &args.config {
        return Ok(load_config(Some(path), Some(&args.overrides))?);
    }
    match find_config_file() {
        Ok(path) => Ok(load_config(Some(&path), Some(&args.overrides))?),
        Err(ConfigError::FileNotFound(_)) => {
            let mut config = SomasimConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &args.overrides);
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = resolve_config(&args).context("Failed to load configuration")?;

    let debug_flags = somasim::debug_flags_from_config(&config.system);
    let _log_handle = somasim::init_logging_from_config(&config.logging, &debug_flags)?;
    somasim::init_thread_pool(&config.system)?;

    let models: Vec<Model> = (0..args.models)
        .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, args.stimulus))
        .collect();
    let mut solver = somasim::build_solver(&config, models.len())?;

    let start = Instant::now();
    let trajectories = somasim::solve_from_config(&mut solver, &config.solver, &models)?;
    let elapsed = start.elapsed();

    let stats = solver.last_chain_stats();
    println!(
        "{} models, {} windows, {} steps, {} samples per model in {:?} ({:?} in kernel) on {}",
        models.len(),
        stats.windows_completed,
        stats.steps_simulated,
        trajectories.first().map_or(0, |t| t.len()),
        elapsed,
        stats.kernel_time,
        solver.kernel().kernel_name()
    );
    for trajectory in &trajectories {
        match trajectory.peak_voltage() {
            Some(peak) => println!("  model {:>6}: peak {:8.3} mV", trajectory.model_id, peak),
            None => println!("  model {:>6}: no samples", trajectory.model_id),
        }
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string(&trajectories)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Trajectories written to {}", path.display());
    }

    Ok(())
}
