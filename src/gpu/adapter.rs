// SPDX-License-Identifier: AGPL-3.0-only

//! Adapter selection for the f64 smearing device.
//!
//! The smearing kernel requires `SHADER_F64`, so auto-detection only
//! considers f64-capable adapters, discrete GPUs first. An explicit
//! `STILLSPRING_GPU_ADAPTER` choice (enumeration index or name substring)
//! overrides auto-detection; its f64 support is checked at device creation.

use crate::error::{Error, Result};

/// Create a wgpu instance with the backend configured via
/// `STILLSPRING_WGPU_BACKEND`.
pub fn create_instance() -> wgpu::Instance {
    let backends = match std::env::var("STILLSPRING_WGPU_BACKEND").as_deref() {
        Ok("vulkan") => wgpu::Backends::VULKAN,
        Ok("metal") => wgpu::Backends::METAL,
        Ok("dx12") => wgpu::Backends::DX12,
        _ => wgpu::Backends::all(),
    };
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

/// Pick the adapter the smearing device is built on.
///
/// # Errors
///
/// `NoAdapter` when nothing is enumerated, `NoShaderF64` when
/// auto-detection finds no f64-capable adapter, `DeviceCreation` when an
/// explicit selector matches nothing.
pub fn select_adapter() -> Result<wgpu::Adapter> {
    let selector = std::env::var("STILLSPRING_GPU_ADAPTER")
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let instance = create_instance();
    let adapters: Vec<wgpu::Adapter> = instance.enumerate_adapters(wgpu::Backends::all());
    if adapters.is_empty() {
        return Err(Error::NoAdapter);
    }

    if selector.is_empty() || selector == "auto" {
        pick_f64_capable(adapters)
    } else {
        pick_named(adapters, &selector)
    }
}

fn pick_f64_capable(adapters: Vec<wgpu::Adapter>) -> Result<wgpu::Adapter> {
    let mut capable: Vec<wgpu::Adapter> = adapters
        .into_iter()
        .filter(|a| a.features().contains(wgpu::Features::SHADER_F64))
        .collect();
    if capable.is_empty() {
        return Err(Error::NoShaderF64);
    }
    capable.sort_by_key(|a| match a.get_info().device_type {
        wgpu::DeviceType::DiscreteGpu => 0,
        wgpu::DeviceType::IntegratedGpu => 1,
        _ => 2,
    });
    Ok(capable.remove(0))
}

fn pick_named(adapters: Vec<wgpu::Adapter>, selector: &str) -> Result<wgpu::Adapter> {
    if let Ok(idx) = selector.parse::<usize>() {
        if idx < adapters.len() {
            return adapters.into_iter().nth(idx).ok_or(Error::NoAdapter);
        }
    }
    adapters
        .into_iter()
        .find(|a| a.get_info().name.to_ascii_lowercase().contains(selector))
        .ok_or_else(|| Error::DeviceCreation(format!("no adapter matching '{selector}'")))
}
