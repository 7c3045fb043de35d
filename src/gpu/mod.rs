// SPDX-License-Identifier: AGPL-3.0-only

//! GPU FP64 compute context for the smearing kernel.
//!
//! Creates a wgpu device with `SHADER_F64` enabled and provides helpers for
//! running f64 compute shaders on any Vulkan GPU (NVIDIA proprietary,
//! NVK/nouveau, RADV, etc.). Stout smearing is the only numerical kernel
//! that runs here; everything downstream of it stays on the CPU.
//!
//! ## Adapter selection
//!
//! Set `STILLSPRING_GPU_ADAPTER` to select a specific GPU:
//!
//! | Value | Behavior |
//! |-------|----------|
//! | `auto` / *(unset)* | First f64-capable adapter, discrete before integrated |
//! | `0`, `1`, … | Select adapter by enumeration index |
//! | substring | Case-insensitive name match (e.g. `"titan"`, `"4070"`) |
//!
//! ## Module structure
//!
//! - `adapter` — adapter selection
//! - `buffers` — f64 buffer creation, upload, readback
//! - `dispatch` — command encoding and dispatch

mod adapter;
mod buffers;
mod dispatch;

pub use dispatch::split_workgroups;

use std::sync::Arc;

use crate::error::{Error, Result};

/// GPU context with FP64 support.
#[must_use]
pub struct GpuF64 {
    pub adapter_name: String,
    pub has_f64: bool,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

// ── Core accessors ───────────────────────────────────────────────────

impl GpuF64 {
    /// Access the underlying wgpu Device.
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Access the underlying wgpu Queue.
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

// ── Constructor ──────────────────────────────────────────────────────

impl GpuF64 {
    /// Create a GPU device requiring `SHADER_F64`.
    ///
    /// Adapter selection follows `STILLSPRING_GPU_ADAPTER`; unset means
    /// auto-detect (discrete + `SHADER_F64` first).
    ///
    /// # Errors
    ///
    /// `NoAdapter` when no adapter exists, `NoShaderF64` when the selected
    /// adapter lacks f64 support, `DeviceCreation` when the device request
    /// fails.
    pub async fn new() -> Result<Self> {
        let selected = adapter::select_adapter()?;
        let adapter_info = selected.get_info();

        if !selected.features().contains(wgpu::Features::SHADER_F64) {
            return Err(Error::NoShaderF64);
        }

        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: 512 * 1024 * 1024,
            max_buffer_size: 1024 * 1024 * 1024,
            ..wgpu::Limits::default()
        };

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("stillspring smearing device"),
                    required_features: wgpu::Features::SHADER_F64,
                    required_limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::DeviceCreation(e.to_string()))?;

        Ok(Self {
            adapter_name: adapter_info.name,
            has_f64: true,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking constructor for synchronous call sites.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`], plus `DeviceCreation` if the runtime cannot
    /// be built.
    pub fn new_blocking() -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| Error::DeviceCreation(format!("tokio runtime: {e}")))?;
        rt.block_on(Self::new())
    }
}

// ── Pipeline creation ────────────────────────────────────────────────

impl GpuF64 {
    /// Compile a WGSL compute shader with entry point `main`.
    #[must_use]
    pub fn create_pipeline(&self, shader_source: &str, label: &str) -> wgpu::ComputePipeline {
        let shader_module = self
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });

        self.device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &shader_module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
    }
}
