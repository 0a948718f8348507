// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # WGPU Kernel
//!
//! GPU Hodgkin-Huxley kernel using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows).
//!
//! Every window creates its own buffers and drops them before returning, on
//! success and on every error path. Nothing is cached across windows.

use super::{ComputeKernel, KernelOutput, KernelRequest};
use somasim_neural::models::HHConstants;
use somasim_neural::types::{HHState, Result, SolverError, StateVector};
use tracing::{debug, info};

/// Threads per workgroup (must match `@workgroup_size` in the shader)
const WORKGROUP_SIZE: u32 = 64;

/// Uniform block shared with `hh_integrate.wgsl`
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct IntegrationParams {
    g_k: f32,
    g_na: f32,
    g_leak: f32,
    e_k: f32,
    e_na: f32,
    e_leak: f32,
    step_length: f32,
    step_count: u32,
    model_count: u32,
    _pad: [u32; 3],
}

/// WGPU kernel for GPU integration
pub struct WgpuKernel {
    /// Kernel name for logging
    name: String,

    /// WGPU device
    device: wgpu::Device,

    /// WGPU command queue
    queue: wgpu::Queue,

    /// HH integration pipeline (auto layout from shader)
    pipeline: wgpu::ComputePipeline,

    /// Physical constants uploaded with every window
    constants: HHConstants,

    /// Largest storage binding the device accepts, in bytes
    max_binding_size: u64,

    /// Fraction of `max_binding_size` a window may use for results
    memory_fraction: f64,
}

impl WgpuKernel {
    /// Open the default high-performance adapter and compile the shader
    pub fn new(constants: HHConstants) -> Result<Self> {
        // Initialize WGPU
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Request adapter (GPU)
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| SolverError::KernelFailure("Failed to find WGPU adapter".to_string()))?;

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);
        let adapter_limits = adapter.limits();

        // Request device and queue with the adapter's buffer limits
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Somasim Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_storage_buffer_binding_size: adapter_limits
                        .max_storage_buffer_binding_size,
                    max_buffer_size: adapter_limits.max_buffer_size,
                    ..wgpu::Limits::default()
                },
            },
            None,
        ))
        .map_err(|e| SolverError::KernelFailure(format!("Failed to create device: {}", e)))?;

        let limits = device.limits();
        let max_binding_size =
            (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("HH Integration Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/hh_integrate.wgsl").into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("HH Integration Pipeline"),
            layout: None, // Auto-layout from shader
            module: &shader,
            entry_point: "integrate_hh",
        });

        info!(
            "WGPU kernel ready: {} (max storage binding {} MB)",
            name,
            max_binding_size / (1024 * 1024)
        );

        Ok(Self {
            name,
            device,
            queue,
            pipeline,
            constants,
            max_binding_size,
            memory_fraction: 1.0,
        })
    }

    /// Limit each window's result buffer to a fraction of the binding limit
    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.memory_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn constants(&self) -> &HHConstants {
        &self.constants
    }

    /// Result bytes one window may allocate
    fn result_budget(&self) -> u64 {
        (self.max_binding_size as f64 * self.memory_fraction) as u64
    }

    fn params(&self, request: &KernelRequest<'_, HHState>) -> IntegrationParams {
        let c = &self.constants;
        IntegrationParams {
            g_k: c.g_k,
            g_na: c.g_na,
            g_leak: c.g_leak,
            e_k: c.e_k,
            e_na: c.e_na,
            e_leak: c.e_leak,
            step_length: request.step_length,
            step_count: request.step_count as u32,
            model_count: request.model_count() as u32,
            _pad: [0; 3],
        }
    }

    /// Reject windows the device cannot hold before allocating anything
    fn check_limits(&self, request: &KernelRequest<'_, HHState>) -> Result<()> {
        let model_count = request.model_count();
        let result_bytes = request.output_byte_len() as u64;
        let input_bytes = request.inputs.byte_len() as u64;
        let budget = self.result_budget();

        if result_bytes > budget {
            return Err(SolverError::KernelFailure(format!(
                "Result buffer size ({} MB) exceeds GPU window budget ({} MB). \
                 {} models x {} steps x {} fields. \
                 Split the horizon into windows of at most {} steps.",
                result_bytes / (1024 * 1024),
                budget / (1024 * 1024),
                model_count,
                request.step_count,
                HHState::field_count(),
                self.max_steps_per_window(model_count).unwrap_or(0),
            )));
        }

        if input_bytes > self.max_binding_size {
            return Err(SolverError::KernelFailure(format!(
                "Input buffer size ({} bytes) exceeds GPU binding limit ({} bytes)",
                input_bytes, self.max_binding_size
            )));
        }

        let workgroups = (model_count as u64).div_ceil(WORKGROUP_SIZE as u64);
        let max_workgroups = self.device.limits().max_compute_workgroups_per_dimension as u64;
        if workgroups > max_workgroups {
            return Err(SolverError::KernelFailure(format!(
                "{} models need {} workgroups, device allows {}",
                model_count, workgroups, max_workgroups
            )));
        }

        if request.step_count > u32::MAX as usize {
            return Err(SolverError::KernelFailure(format!(
                "step count {} does not fit the shader's u32 counter",
                request.step_count
            )));
        }
        Ok(())
    }

    /// Copy the result buffer into host memory (blocking)
    fn download_results(&self, results: &wgpu::Buffer, span: usize) -> Result<Vec<Vec<f32>>> {
        let buffer_size = results.size();

        // Create staging buffer for GPU→CPU transfer
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("HH Results Staging"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Download HH Results"),
            });
        encoder.copy_buffer_to_buffer(results, 0, &staging_buffer, 0, buffer_size);
        self.queue.submit(Some(encoder.finish()));

        // Map staging buffer to CPU memory (blocking)
        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        // Wait for mapping to complete
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| {
                SolverError::KernelFailure("Failed to receive result buffer map result".to_string())
            })?
            .map_err(|e| SolverError::KernelFailure(format!("Failed to map result buffer: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let values: &[f32] = bytemuck::cast_slice(&data);
        let fields: Vec<Vec<f32>> = values.chunks_exact(span).map(<[f32]>::to_vec).collect();

        // Unmap buffer
        drop(data);
        staging_buffer.unmap();

        Ok(fields)
    }
}

impl ComputeKernel<HHState> for WgpuKernel {
    fn kernel_name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, request: &KernelRequest<'_, HHState>) -> Result<KernelOutput> {
        self.check_limits(request)?;

        let model_count = request.model_count();
        let span = request.output_len();

        // Params (uniform)
        let params = [self.params(request)];
        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("HH Params"),
            size: std::mem::size_of::<IntegrationParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&params_buffer, 0, bytemuck::cast_slice(&params));

        // Inputs (consolidated: V | n | m | h | I)
        let inputs = request.inputs.consolidated();
        let input_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("HH Inputs (Consolidated)"),
            size: (inputs.len() * 4) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&input_buffer, 0, bytemuck::cast_slice(&inputs));

        // Results (consolidated: V | n | m | h)
        let result_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("HH Results (Consolidated)"),
            size: request.output_byte_len() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("HH Integration Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: result_buffer.as_entire_binding(),
                },
            ],
        });

        let workgroup_count = (model_count as u32).div_ceil(WORKGROUP_SIZE);
        debug!(
            "Dispatching {} workgroups for {} models x {} steps",
            workgroup_count, model_count, request.step_count
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("HH Integration Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("HH Integration Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroup_count, 1, 1);
        }

        self.queue.submit(Some(encoder.finish()));

        let fields = self.download_results(&result_buffer, span)?;
        if fields.len() != HHState::field_count() {
            return Err(SolverError::LayoutMismatch {
                field: "field count".to_string(),
                expected: HHState::field_count(),
                actual: fields.len(),
            });
        }

        Ok(KernelOutput::new(fields))
    }

    fn max_steps_per_window(&self, model_count: usize) -> Option<usize> {
        let bytes_per_step =
            (HHState::field_count() * model_count.max(1) * std::mem::size_of::<f32>()) as u64;
        Some((self.result_budget() / bytes_per_step) as usize)
    }
}
