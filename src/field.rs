// SPDX-License-Identifier: AGPL-3.0-only

//! Spatial link field on a 4D periodic lattice.
//!
//! Holds the three spatial directions of an SU(3) gauge field; the temporal
//! links never participate in smearing or the Laplacian and are dropped at
//! load time.
//!
//! Layout: `links[((mu*Lt + t)*Lz + z)*Ly + y)*Lx + x]` — direction slowest,
//! x fastest. This matches the flattening used by the GPU smearing kernel,
//! so fields upload and download without reordering.

use crate::complex::Complex64;
use crate::constants::N_SPATIAL;
use crate::error::{Error, Result};
use crate::su3::ColorMatrix;

/// Owned link field restricted to spatial directions μ ∈ {0 (x), 1 (y), 2 (z)}.
#[derive(Clone)]
pub struct LinkField {
    /// Lattice extents `[Lx, Ly, Lz, Lt]`.
    pub dims: [usize; 4],
    /// Flat link storage, `[mu][t][z][y][x]` order.
    pub links: Vec<ColorMatrix>,
}

impl LinkField {
    /// 4D volume Lx·Ly·Lz·Lt.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2] * self.dims[3]
    }

    /// Spatial volume Lx·Ly·Lz.
    #[must_use]
    pub const fn spatial_volume(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Flat index of `U_μ(t, z, y, x)`.
    #[inline]
    #[must_use]
    pub const fn index(&self, mu: usize, t: usize, z: usize, y: usize, x: usize) -> usize {
        let [lx, ly, lz, lt] = self.dims;
        (((mu * lt + t) * lz + z) * ly + y) * lx + x
    }

    /// Link `U_μ(t, z, y, x)`.
    #[inline]
    #[must_use]
    pub fn link(&self, mu: usize, t: usize, z: usize, y: usize, x: usize) -> ColorMatrix {
        self.links[self.index(mu, t, z, y, x)]
    }

    /// Spatial coordinate shifted by `step` (±1) along axis `d` ∈ {0,1,2},
    /// with periodic wraparound. Returns the new (z, y, x).
    #[inline]
    #[must_use]
    pub const fn shift(
        &self,
        z: usize,
        y: usize,
        x: usize,
        d: usize,
        step: isize,
    ) -> (usize, usize, usize) {
        let [lx, ly, lz, _] = self.dims;
        let up = step > 0;
        match d {
            0 => {
                let nx = if up { (x + 1) % lx } else { (x + lx - 1) % lx };
                (z, y, nx)
            }
            1 => {
                let ny = if up { (y + 1) % ly } else { (y + ly - 1) % ly };
                (z, ny, x)
            }
            _ => {
                let nz = if up { (z + 1) % lz } else { (z + lz - 1) % lz };
                (nz, y, x)
            }
        }
    }

    /// Cold start: all spatial links = identity (trivial gauge field).
    #[must_use]
    pub fn cold_start(dims: [usize; 4]) -> Self {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        Self {
            dims,
            links: vec![ColorMatrix::IDENTITY; vol * N_SPATIAL],
        }
    }

    /// Hot start: random SU(3) links, reunitarized exactly.
    ///
    /// Deterministic for a fixed seed; used by equivalence and hermiticity
    /// tests that need a generic unitary field.
    #[must_use]
    pub fn hot_start(dims: [usize; 4], seed: u64, epsilon: f64) -> Self {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        let mut rng_seed = seed;
        let links: Vec<ColorMatrix> = (0..vol * N_SPATIAL)
            .map(|_| ColorMatrix::random_near_identity(&mut rng_seed, epsilon))
            .collect();
        Self { dims, links }
    }

    /// Worst elementwise |U·U† − I| over all links.
    #[must_use]
    pub fn max_unitarity_deviation(&self) -> f64 {
        self.links
            .iter()
            .map(|u| u.unitarity_deviation())
            .fold(0.0, f64::max)
    }

    /// Worst elementwise |self − other| over all links.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when extents differ.
    pub fn max_abs_diff(&self, other: &Self) -> Result<f64> {
        if self.dims != other.dims {
            return Err(Error::ShapeMismatch(format!(
                "link fields have extents {:?} vs {:?}",
                self.dims, other.dims
            )));
        }
        Ok(self
            .links
            .iter()
            .zip(other.links.iter())
            .map(|(a, b)| a.max_abs_diff(*b))
            .fold(0.0, f64::max))
    }

    /// Flatten into interleaved (re, im) f64 values for GPU upload.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.links.len() * 18);
        for u in &self.links {
            for row in &u.m {
                for c in row {
                    out.push(c.re);
                    out.push(c.im);
                }
            }
        }
        out
    }

    /// Rebuild from interleaved (re, im) f64 values after GPU readback.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the value count does not match the extents.
    pub fn from_f64_vec(dims: [usize; 4], data: &[f64]) -> Result<Self> {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        let expected = vol * N_SPATIAL * 18;
        if data.len() != expected {
            return Err(Error::ShapeMismatch(format!(
                "expected {expected} f64 values for extents {dims:?}, got {}",
                data.len()
            )));
        }
        let links: Vec<ColorMatrix> = data
            .chunks_exact(18)
            .map(|chunk| {
                let mut u = ColorMatrix::ZERO;
                for i in 0..3 {
                    for j in 0..3 {
                        let k = (i * 3 + j) * 2;
                        u.m[i][j] = Complex64::new(chunk[k], chunk[k + 1]);
                    }
                }
                u
            })
            .collect();
        Ok(Self { dims, links })
    }
}
