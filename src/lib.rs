// SPDX-License-Identifier: AGPL-3.0-only

//! Low-mode eigenvectors of the stout-smeared gauge-covariant lattice
//! Laplacian.
//!
//! The pipeline loads an SU(3) gauge configuration, projects drifted links
//! back onto the group, applies spatial stout smearing (portable, GPU, or
//! external-library execution), and extracts the smallest eigenpairs of
//! the 3D covariant Laplacian per timeslice with a Lanczos solver.
//!
//! ## Module map
//!
//! - [`complex`], [`su3`] — Complex64 and 3×3 color-matrix arithmetic,
//!   with WGSL counterparts for the GPU path
//! - [`field`], [`store`] — spatial link fields and gauge persistence
//! - [`project`] — fixed-point SU(3) projection
//! - [`stout`], [`stout_gpu`], [`accel`] — smearing strategies
//! - [`laplacian`], [`eigen`], [`tridiag`] — operator and eigensolver
//! - [`phase`] — memoized momentum phase fields
//! - [`generator`] — the load → project → smear → solve orchestrator
//! - [`gpu`] — wgpu `SHADER_F64` context, buffers, dispatch
//! - [`constants`], [`tolerances`], [`error`] — shared foundations

pub mod accel;
pub mod complex;
pub mod constants;
pub mod eigen;
pub mod error;
pub mod field;
pub mod generator;
pub mod gpu;
pub mod laplacian;
pub mod phase;
pub mod project;
pub mod store;
pub mod stout;
pub mod stout_gpu;
pub mod su3;
pub mod tolerances;
pub mod tridiag;

pub use error::{Error, Result};
