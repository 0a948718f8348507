// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Layout Contract Tests
//!
//! Validates the flat-buffer layout shared by the marshaller and every kernel:
//! model-major inputs, time-major/model-minor outputs, and integer sampling.

mod common;

use common::{reference_batch, EchoKernel, IndexKernel, TruncatingKernel};
use somasim_engine::*;

#[test]
fn test_three_model_layout_scenario() {
    let models = reference_batch(3);
    let window = TimeWindow::new(0.01, 10, 2).unwrap();
    let mut solver = Solver::new(IndexKernel);

    let result = solver.solve(&models, &window).unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].voltages(), vec![3.0, 9.0, 15.0, 21.0, 27.0]);
    assert_eq!(result[1].voltages(), vec![4.0, 10.0, 16.0, 22.0, 28.0]);
    assert_eq!(result[2].voltages(), vec![5.0, 11.0, 17.0, 23.0, 29.0]);
}

#[test]
fn test_ids_follow_batch_position() {
    let models = vec![
        Model::hodgkin_huxley("zeta", 1.0, 0.0, 0.0, 1.0, 0.0),
        Model::hodgkin_huxley("alpha", 2.0, 0.0, 0.0, 1.0, 0.0),
        Model::hodgkin_huxley("mu", 3.0, 0.0, 0.0, 1.0, 0.0),
    ];
    let window = TimeWindow::new(0.01, 6, 3).unwrap();
    let result = Solver::new(EchoKernel).solve(&models, &window).unwrap();

    for (p, trajectory) in result.iter().enumerate() {
        assert_eq!(trajectory.model_id, models[p].id);
        assert!(trajectory.samples.iter().all(|s| s.id == models[p].id));
    }
}

#[test]
fn test_echo_round_trip() {
    let models: Vec<Model> = (0..7u32)
        .map(|i| Model::hodgkin_huxley(i, i as f32 * -1.5, 0.1, 0.2, 0.3, 4.0))
        .collect();
    let window = TimeWindow::new(0.01, 12, 1).unwrap();
    let result = Solver::new(EchoKernel).solve(&models, &window).unwrap();

    for (model, trajectory) in models.iter().zip(&result) {
        assert_eq!(trajectory.len(), 12);
        for sample in &trajectory.samples {
            assert_eq!(sample.state, model.state);
            assert_eq!(sample.stimulus, 0.0);
        }
    }
}

#[test]
fn test_sample_period_one_keeps_every_step() {
    let models = reference_batch(4);
    let window = TimeWindow::new(0.01, 25, 1).unwrap();
    let result = Solver::new(IndexKernel).solve(&models, &window).unwrap();
    assert!(result.iter().all(|t| t.len() == 25));
}

#[test]
fn test_period_longer_than_window_keeps_nothing() {
    let models = reference_batch(2);
    let window = TimeWindow::new(0.01, 10, 11).unwrap();
    let result = Solver::new(IndexKernel).solve(&models, &window).unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|t| t.is_empty()));
}

#[test]
fn test_period_equal_to_window_keeps_last_step() {
    let models = reference_batch(2);
    let window = TimeWindow::new(0.01, 10, 10).unwrap();
    let result = Solver::new(IndexKernel).solve(&models, &window).unwrap();
    // step 10, position p -> flat index 9 * 2 + p
    assert_eq!(result[0].voltages(), vec![18.0]);
    assert_eq!(result[1].voltages(), vec![19.0]);
}

#[test]
fn test_unequal_trajectories_never_occur() {
    let models = reference_batch(5);
    let window = TimeWindow::new(0.01, 17, 4).unwrap();
    let result = Solver::new(IndexKernel).solve(&models, &window).unwrap();
    assert!(result.iter().all(|t| t.len() == 4));
}

#[test]
fn test_short_kernel_output_is_a_layout_mismatch() {
    let models = reference_batch(3);
    let window = TimeWindow::new(0.01, 10, 1).unwrap();
    let err = Solver::new(TruncatingKernel)
        .solve(&models, &window)
        .unwrap_err();
    assert_eq!(
        err,
        SolverError::LayoutMismatch {
            field: "V".to_string(),
            expected: 30,
            actual: 29,
        }
    );
}

#[test]
fn test_empty_batch_is_rejected_before_dispatch() {
    let empty: Vec<Model> = Vec::new();
    let window = TimeWindow::new(0.01, 10, 1).unwrap();
    let err = Solver::new(IndexKernel).solve(&empty, &window).unwrap_err();
    assert!(matches!(err, SolverError::InvalidBatch(_)));
}

#[test]
fn test_trajectories_export_for_plotting() {
    let models = reference_batch(1);
    let window = TimeWindow::new(0.01, 4, 2).unwrap();
    let result = Solver::new(IndexKernel).solve(&models, &window).unwrap();
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"model_id\":\"0\""));
    assert!(json.contains("\"V\":3.0"));
}
