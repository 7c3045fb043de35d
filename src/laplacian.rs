// SPDX-License-Identifier: AGPL-3.0-only

//! Gauge-covariant 3D Laplacian on a single timeslice.
//!
//! Acting on a color field x(s) with 3 components per spatial site:
//!
//! ```text
//! (L x)(s) = 6 x(s) − Σ_d [ U_d(s) x(s+d̂) + U_d†(s−d̂) x(s−d̂) ]
//! ```
//!
//! with d running over the three spatial directions, periodic in all of
//! them. L is Hermitian and positive semidefinite for unitary links; its
//! low modes define the smeared-source subspace.
//!
//! Vector layout: `((z·Ly + y)·Lx + x)·3 + c` — site-major, color fastest,
//! matching the phase cache and the eigenvector output layout.

use rayon::prelude::*;

use crate::complex::Complex64;
use crate::constants::{N_COLORS, N_SPATIAL};
use crate::eigen::HermitianOperator;
use crate::field::LinkField;

/// The covariant Laplacian of a link field, restricted to timeslice `t`.
///
/// Borrows the field; build one per timeslice as needed.
pub struct LaplacianOperator<'a> {
    links: &'a LinkField,
    t: usize,
}

impl<'a> LaplacianOperator<'a> {
    /// Operator on timeslice `t`. Caller validates `t` against the extents.
    #[must_use]
    pub fn new(links: &'a LinkField, t: usize) -> Self {
        Self { links, t }
    }

    /// Flat vector index of color `c` at spatial site (z, y, x).
    #[inline]
    #[must_use]
    pub fn vector_index(&self, z: usize, y: usize, x: usize, c: usize) -> usize {
        let [lx, ly, _, _] = self.links.dims;
        ((z * ly + y) * lx + x) * N_COLORS + c
    }

    #[inline]
    fn site_color(x: &[Complex64], site: usize) -> [Complex64; 3] {
        [
            x[site * N_COLORS],
            x[site * N_COLORS + 1],
            x[site * N_COLORS + 2],
        ]
    }
}

impl HermitianOperator for LaplacianOperator<'_> {
    fn dim(&self) -> usize {
        self.links.spatial_volume() * N_COLORS
    }

    fn apply(&self, x: &[Complex64], out: &mut [Complex64]) {
        let [lx, ly, _, _] = self.links.dims;
        let f = self.links;
        let t = self.t;

        out.par_chunks_mut(N_COLORS)
            .enumerate()
            .for_each(|(site, chunk)| {
                let sx = site % lx;
                let sy = (site / lx) % ly;
                let sz = site / (lx * ly);

                let center = Self::site_color(x, site);
                let mut acc = [
                    center[0].scale(6.0),
                    center[1].scale(6.0),
                    center[2].scale(6.0),
                ];

                for d in 0..N_SPATIAL {
                    // Forward hop: transport x(s+d̂) back with U_d(s).
                    let (fz, fy, fx) = f.shift(sz, sy, sx, d, 1);
                    let fwd_site = (fz * ly + fy) * lx + fx;
                    let fwd = f
                        .link(d, t, sz, sy, sx)
                        .mul_vec(&Self::site_color(x, fwd_site));

                    // Backward hop: transport x(s−d̂) forward with U_d†(s−d̂).
                    let (bz, by, bx) = f.shift(sz, sy, sx, d, -1);
                    let bwd_site = (bz * ly + by) * lx + bx;
                    let bwd = f
                        .link(d, t, bz, by, bx)
                        .adjoint_mul_vec(&Self::site_color(x, bwd_site));

                    for c in 0..N_COLORS {
                        acc[c] -= fwd[c] + bwd[c];
                    }
                }

                chunk.copy_from_slice(&acc);
            });
    }
}
