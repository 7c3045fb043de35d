// SPDX-License-Identifier: AGPL-3.0-only

//! GPU execution strategy for stout smearing.
//!
//! Runs the same closed-form stout step as the portable strategy as an f64
//! WGSL kernel, one invocation per link. Iterations ping-pong between two
//! link buffers and are encoded into a single command submission; the field
//! crosses the PCIe bus exactly twice per smear call (upload, readback).

use crate::error::Result;
use crate::field::LinkField;
use crate::gpu::GpuF64;
use crate::stout::SmearingStrategy;

/// f64 math polyfills (sqrt, sin, cos, acos, sinc) for `SHADER_F64`
/// kernels. Prepend after [`WGSL_COMPLEX64`](crate::complex::WGSL_COMPLEX64).
pub const WGSL_MATH_F64: &str = include_str!("shaders/math_f64.wgsl");

/// One stout iteration over all spatial links.
pub const WGSL_STOUT_STEP: &str = include_str!("shaders/stout_smear_f64.wgsl");

const WORKGROUP_SIZE: u32 = 64;

fn stout_shader() -> String {
    format!(
        "{}{}{}",
        crate::complex::WGSL_COMPLEX64,
        WGSL_MATH_F64,
        WGSL_STOUT_STEP
    )
}

/// Uniform parameter block: extents + ρ, padded to 32 bytes.
fn make_stout_params(dims: [usize; 4], rho: f64) -> Vec<u8> {
    let mut v = Vec::with_capacity(32);
    for l in dims {
        v.extend_from_slice(&(l as u32).to_le_bytes());
    }
    v.extend_from_slice(&rho.to_le_bytes());
    v.extend_from_slice(&0.0_f64.to_le_bytes());
    v
}

/// GPU smearing strategy. Owns the device context and compiled pipeline.
pub struct GpuStout {
    gpu: GpuF64,
    pipeline: wgpu::ComputePipeline,
}

impl GpuStout {
    /// Compile the stout kernel against an existing f64 context.
    #[must_use]
    pub fn new(gpu: GpuF64) -> Self {
        let pipeline = gpu.create_pipeline(&stout_shader(), "stout_step");
        Self { gpu, pipeline }
    }

    /// Probe for a usable GPU and build the strategy, or `None` when no
    /// f64-capable adapter exists.
    #[must_use]
    pub fn probe() -> Option<Self> {
        GpuF64::new_blocking().ok().map(Self::new)
    }
}

impl SmearingStrategy for GpuStout {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn smear(&self, links: LinkField, nstep: usize, rho: f64) -> Result<LinkField> {
        if nstep == 0 {
            return Ok(links);
        }
        let dims = links.dims;
        let flat = links.to_f64_vec();
        let n_links = links.links.len() as u32;

        let buf_a = self.gpu.create_f64_buffer(&flat, "stout_links_a");
        let buf_b = self.gpu.create_f64_output_buffer(flat.len(), "stout_links_b");
        let params = self
            .gpu
            .create_uniform_buffer(&make_stout_params(dims, rho), "stout_params");

        let bind_ab = self
            .gpu
            .create_bind_group(&self.pipeline, &[&buf_a, &buf_b, &params]);
        let bind_ba = self
            .gpu
            .create_bind_group(&self.pipeline, &[&buf_b, &buf_a, &params]);

        let workgroups = n_links.div_ceil(WORKGROUP_SIZE);
        let mut encoder = self.gpu.begin_encoder("stout_smear");
        for step in 0..nstep {
            let bind = if step % 2 == 0 { &bind_ab } else { &bind_ba };
            GpuF64::encode_pass(&mut encoder, &self.pipeline, bind, workgroups);
        }
        self.gpu.submit_encoder(encoder);

        let final_buf = if nstep % 2 == 1 { &buf_b } else { &buf_a };
        let out = self.gpu.read_back_f64(final_buf, flat.len())?;
        LinkField::from_f64_vec(dims, &out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stout::CpuStout;
    use crate::tolerances::{SMEARED_UNITARITY, STRATEGY_AGREEMENT};

    #[test]
    fn params_block_is_32_bytes() {
        let p = make_stout_params([4, 4, 4, 8], 0.12);
        assert_eq!(p.len(), 32);
        assert_eq!(u32::from_le_bytes(p[0..4].try_into().unwrap()), 4);
        assert_eq!(u32::from_le_bytes(p[12..16].try_into().unwrap()), 8);
        let rho = f64::from_le_bytes(p[16..24].try_into().unwrap());
        assert!((rho - 0.12).abs() < f64::EPSILON);
    }

    #[test]
    fn shader_composes_with_preambles() {
        let src = stout_shader();
        assert!(src.contains("fn c64_mul"));
        assert!(src.contains("fn sinc_f64"));
        assert!(src.contains("fn m3_exp_iq"));
        assert!(src.contains("@compute @workgroup_size(64)"));
    }

    #[test]
    #[ignore = "requires GPU"]
    fn gpu_matches_portable_strategy() {
        let gpu = GpuStout::probe().expect("GPU with SHADER_F64");
        let field = LinkField::hot_start([4, 4, 4, 2], 42, 0.5);
        let cpu_out = CpuStout.smear(field.clone(), 3, 0.12).expect("cpu");
        let gpu_out = gpu.smear(field, 3, 0.12).expect("gpu");
        let diff = cpu_out.max_abs_diff(&gpu_out).expect("same extents");
        assert!(diff < STRATEGY_AGREEMENT, "strategies disagree by {diff:.3e}");
        assert!(gpu_out.max_unitarity_deviation() < SMEARED_UNITARITY);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn gpu_trivial_field_is_fixed_point() {
        let gpu = GpuStout::probe().expect("GPU with SHADER_F64");
        let field = LinkField::cold_start([4, 4, 4, 2]);
        let out = gpu.smear(field.clone(), 2, 0.1).expect("gpu");
        assert!(field.max_abs_diff(&out).unwrap() < 1e-12);
    }
}
