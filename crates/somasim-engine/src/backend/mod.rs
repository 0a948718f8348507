// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Kernel Abstraction
//!
//! Provides a unified interface for the compute devices that integrate a
//! window (CPU, GPU). The marshaller and the window chainer only ever see this
//! trait: flat inputs go in, flat time-major results come out.

mod cpu;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CpuKernel;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuKernel;

use crate::marshal::PackedBatch;
use somasim_neural::models::{HHConstants, ModelParameters};
use somasim_neural::types::{HHState, Result, SolverError, StateVector};
use tracing::info;

/// One window invocation: step length, step count and the packed inputs
#[derive(Debug, Clone, Copy)]
pub struct KernelRequest<'a, S: StateVector = HHState> {
    pub step_length: f32,
    pub step_count: usize,
    pub inputs: &'a PackedBatch<S>,
}

impl<'a, S: StateVector> KernelRequest<'a, S> {
    pub fn new(step_length: f32, step_count: usize, inputs: &'a PackedBatch<S>) -> Self {
        Self {
            step_length,
            step_count,
            inputs,
        }
    }

    /// Derived from the packed inputs
    pub fn model_count(&self) -> usize {
        self.inputs.model_count()
    }

    /// Length every result array must have
    pub fn output_len(&self) -> usize {
        self.model_count() * self.step_count
    }

    /// Bytes the result arrays occupy
    pub fn output_byte_len(&self) -> usize {
        S::field_count() * self.output_len() * core::mem::size_of::<f32>()
    }
}

/// Kernel results: one flat time-major array per state field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KernelOutput {
    fields: Vec<Vec<f32>>,
}

impl KernelOutput {
    pub fn new(fields: Vec<Vec<f32>>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Vec<f32>] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Vec<f32>> {
        self.fields
    }
}

/// Compute kernel trait - integrates one window for a whole batch
///
/// Implementations must be deterministic for identical requests and must
/// return only after the device has finished. Physical constants are fixed
/// per kernel instance. Device errors surface as `KernelFailure`.
pub trait ComputeKernel<S: StateVector = HHState>: Send {
    /// Kernel name for logging/debugging
    fn kernel_name(&self) -> &str;

    /// Integrate `request.step_count` steps for every model in the request
    fn run(&mut self, request: &KernelRequest<'_, S>) -> Result<KernelOutput>;

    /// Largest window this kernel can run for `model_count` models, if bounded
    fn max_steps_per_window(&self, _model_count: usize) -> Option<usize> {
        None
    }
}

impl<S: StateVector, K: ComputeKernel<S> + ?Sized> ComputeKernel<S> for Box<K> {
    fn kernel_name(&self) -> &str {
        (**self).kernel_name()
    }

    fn run(&mut self, request: &KernelRequest<'_, S>) -> Result<KernelOutput> {
        (**self).run(request)
    }

    fn max_steps_per_window(&self, model_count: usize) -> Option<usize> {
        (**self).max_steps_per_window(model_count)
    }
}

/// Error returned when a backend name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown backend '{0}' (expected one of: cpu, wgpu, auto)")]
pub struct ParseBackendError(pub String);

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Rayon-parallel CPU kernel
    Cpu,

    /// GPU via WGPU (Metal/Vulkan/DirectX - cross-platform)
    #[cfg(feature = "gpu")]
    Wgpu,

    /// Auto-select based on batch size and hardware availability
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Cpu => write!(f, "CPU"),
            #[cfg(feature = "gpu")]
            BackendType::Wgpu => write!(f, "WGPU"),
            BackendType::Auto => write!(f, "Auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(BackendType::Cpu),
            #[cfg(feature = "gpu")]
            "wgpu" | "gpu" => Ok(BackendType::Wgpu),
            "auto" => Ok(BackendType::Auto),
            _ => Err(ParseBackendError(s.to_string())),
        }
    }
}

/// Configuration for backend auto-selection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Minimum batch size to consider the GPU (default: 10,000 models)
    pub gpu_model_threshold: usize,

    /// Fraction of the device's storage binding limit a window may use (0.0-1.0)
    pub gpu_memory_fraction: f64,

    /// Force CPU even if GPU would be beneficial
    pub force_cpu: bool,

    /// Force GPU even if CPU would be better (for testing)
    pub force_gpu: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            // Below ~10K models launch and transfer overhead dominate
            gpu_model_threshold: 10_000,
            gpu_memory_fraction: 0.8,
            force_cpu: false,
            force_gpu: false,
        }
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
    pub estimated_speedup: f32,
}

/// Auto-select a backend for a batch of `model_count` models
///
/// Selection priority:
/// 1. Honor force flags (force_cpu, force_gpu)
/// 2. Try WGPU (if compiled in, available and the batch is large enough)
/// 3. Fall back to CPU - always available
pub fn select_backend(model_count: usize, config: &BackendConfig) -> BackendDecision {
    if config.force_cpu {
        return BackendDecision {
            backend_type: BackendType::Cpu,
            reason: "Forced CPU via configuration".to_string(),
            estimated_speedup: 1.0,
        };
    }

    #[cfg(feature = "gpu")]
    if config.force_gpu {
        if is_gpu_available() {
            return BackendDecision {
                backend_type: BackendType::Wgpu,
                reason: "Forced WGPU via configuration".to_string(),
                estimated_speedup: estimate_gpu_speedup(model_count),
            };
        } else {
            info!("WGPU forced but not available, falling back to CPU");
            return BackendDecision {
                backend_type: BackendType::Cpu,
                reason: "WGPU forced but not available, falling back to CPU".to_string(),
                estimated_speedup: 1.0,
            };
        }
    }

    #[cfg(not(feature = "gpu"))]
    if config.force_gpu {
        info!("GPU forced but 'gpu' feature not enabled at compile time, falling back to CPU");
    }

    let _meets_gpu_threshold = model_count >= config.gpu_model_threshold;

    #[cfg(feature = "gpu")]
    {
        if _meets_gpu_threshold && is_gpu_available() {
            let speedup = estimate_gpu_speedup(model_count);

            // Use WGPU if speedup is meaningful (>1.5x)
            if speedup > 1.5 {
                return BackendDecision {
                    backend_type: BackendType::Wgpu,
                    reason: format!("WGPU selected: {} models (cross-platform GPU)", model_count),
                    estimated_speedup: speedup,
                };
            }
        }
    }

    BackendDecision {
        backend_type: BackendType::Cpu,
        reason: format!(
            "CPU selected: {} models (below GPU threshold or GPU not available)",
            model_count
        ),
        estimated_speedup: 1.0,
    }
}

/// Check if a GPU adapter is available
#[cfg(feature = "gpu")]
pub fn is_gpu_available() -> bool {
    use wgpu::Backends;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Always false without the `gpu` feature
#[cfg(not(feature = "gpu"))]
pub fn is_gpu_available() -> bool {
    false
}

/// Estimate GPU speedup for one 1000-step window of `model_count` models
pub fn estimate_gpu_speedup(model_count: usize) -> f32 {
    // Empirical model:
    // - ~150 flops per model-step (six exponentials dominate)
    // - CPU (rayon, 16 cores): ~50 GFLOPS effective on transcendental-heavy code
    // - GPU: ~10 TFLOPS FP32, PCIe 4.0 at ~25 GB/s
    const STEPS: f32 = 1000.0;
    const FLOPS_PER_MODEL_STEP: f32 = 150.0;

    let models = model_count as f32;
    let work = models * STEPS * FLOPS_PER_MODEL_STEP;

    let cpu_us = work / (50_000_000_000.0 / 1_000_000.0);

    // Inputs go up once, every retained step comes back (4 fields x 4 bytes)
    let transfer_bytes = models * 5.0 * 4.0 + models * STEPS * 16.0;
    let transfer_us = transfer_bytes / (25.0 * 1_000_000_000.0) * 1_000_000.0 + 200.0;
    let gpu_us = work / (10_000_000_000_000.0 / 1_000_000.0) + transfer_us;

    (cpu_us / gpu_us).clamp(0.1, 100.0)
}

/// Create a Hodgkin-Huxley kernel of the requested type
///
/// `Auto` is resolved with [`select_backend`] for a batch of `model_count` models.
///
/// # Errors
/// `KernelFailure` if the constants are invalid or the device cannot be opened.
pub fn create_kernel(
    backend_type: BackendType,
    model_count: usize,
    constants: HHConstants,
    config: &BackendConfig,
) -> Result<Box<dyn ComputeKernel<HHState>>> {
    constants
        .validate()
        .map_err(|e| SolverError::KernelFailure(e.to_string()))?;

    let actual_type = if backend_type == BackendType::Auto {
        let decision = select_backend(model_count, config);
        info!(
            "Backend auto-selection: {} ({})",
            decision.backend_type, decision.reason
        );
        if decision.estimated_speedup > 1.0 {
            info!("   Estimated speedup: {:.1}x", decision.estimated_speedup);
        }
        decision.backend_type
    } else {
        backend_type
    };

    match actual_type {
        #[cfg(feature = "gpu")]
        BackendType::Wgpu => {
            info!("Using WGPU kernel (cross-platform GPU)");
            let kernel = WgpuKernel::new(constants)?
                .with_memory_fraction(config.gpu_memory_fraction);
            Ok(Box::new(kernel))
        }
        BackendType::Cpu | BackendType::Auto => {
            info!("Using CPU kernel (rayon)");
            Ok(Box::new(CpuKernel::hodgkin_huxley(constants)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!("cpu".parse::<BackendType>(), Ok(BackendType::Cpu));
        assert_eq!("AUTO".parse::<BackendType>(), Ok(BackendType::Auto));
        assert_eq!(
            "quantum".parse::<BackendType>(),
            Err(ParseBackendError("quantum".to_string()))
        );
        assert_eq!(BackendType::Cpu.to_string(), "CPU");
        assert_eq!(BackendType::default(), BackendType::Auto);
    }

    #[test]
    fn test_request_sizes() {
        let models = vec![somasim_neural::Model::hodgkin_huxley(0u32, 0.0, 0.0, 0.0, 0.0, 0.0); 3];
        let packed = crate::marshal::pack(&models).unwrap();
        let request = KernelRequest::new(0.01, 10, &packed);
        assert_eq!(request.model_count(), 3);
        assert_eq!(request.output_len(), 30);
        assert_eq!(request.output_byte_len(), 4 * 30 * 4);
    }

    #[test]
    fn test_speedup_grows_with_batch() {
        let small = estimate_gpu_speedup(100);
        let large = estimate_gpu_speedup(1_000_000);
        assert!(small < large);
        assert!(small >= 0.1 && large <= 100.0);
    }

    #[test]
    fn test_create_kernel_rejects_bad_constants() {
        let mut constants = HHConstants::default();
        constants.g_leak = -0.3;
        let result = create_kernel(BackendType::Cpu, 1, constants, &BackendConfig::default());
        assert!(matches!(result, Err(SolverError::KernelFailure(_))));
    }

    #[test]
    fn test_create_cpu_kernel() {
        let config = BackendConfig {
            force_cpu: true,
            ..Default::default()
        };
        let kernel = create_kernel(BackendType::Auto, 50_000, HHConstants::default(), &config)
            .unwrap();
        assert!(kernel.kernel_name().starts_with("CPU"));
    }
}
