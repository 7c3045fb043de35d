// SPDX-License-Identifier: AGPL-3.0-only

//! Memoized momentum phase fields.
//!
//! Momentum projection multiplies a timeslice field by
//! exp(2πi (pₓ x/Lx + p_y y/Ly + p_z z/Lz)) site by site. The same handful
//! of momenta recur across every timeslice and configuration, so phase
//! fields are computed once per momentum and shared behind an `Arc`:
//! repeated lookups return the same allocation, never a recomputation.
//!
//! Site layout matches the Laplacian eigenvectors: (z, y, x), x fastest,
//! one phase per site (color components share it).

use std::collections::HashMap;
use std::sync::Arc;

use crate::complex::Complex64;

/// Cache of plane-wave phase fields on a fixed spatial geometry.
pub struct MomentumPhase {
    dims: [usize; 3],
    cache: HashMap<(i64, i64, i64), Arc<Vec<Complex64>>>,
}

impl MomentumPhase {
    /// Phase cache for spatial extents `[Lx, Ly, Lz]`.
    #[must_use]
    pub fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            cache: HashMap::new(),
        }
    }

    /// Spatial extents `[Lx, Ly, Lz]`.
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of distinct momenta computed so far.
    #[must_use]
    pub fn cached_momenta(&self) -> usize {
        self.cache.len()
    }

    /// Phase field for integer momentum `(px, py, pz)`.
    ///
    /// First call per momentum computes the field; subsequent calls return
    /// the same shared allocation.
    pub fn get(&mut self, px: i64, py: i64, pz: i64) -> Arc<Vec<Complex64>> {
        let [lx, ly, lz] = self.dims;
        Arc::clone(self.cache.entry((px, py, pz)).or_insert_with(|| {
            let mut field = Vec::with_capacity(lx * ly * lz);
            let two_pi = 2.0 * std::f64::consts::PI;
            for z in 0..lz {
                for y in 0..ly {
                    for x in 0..lx {
                        let arg = two_pi
                            * (px as f64 * x as f64 / lx as f64
                                + py as f64 * y as f64 / ly as f64
                                + pz as f64 * z as f64 / lz as f64);
                        field.push(Complex64::from_polar(arg));
                    }
                }
            }
            Arc::new(field)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_momentum_is_all_ones() {
        let mut cache = MomentumPhase::new([4, 4, 4]);
        let phase = cache.get(0, 0, 0);
        assert_eq!(phase.len(), 64);
        for p in phase.iter() {
            assert!((*p - Complex64::ONE).abs() < 1e-15);
        }
    }

    #[test]
    fn repeated_lookup_shares_the_allocation() {
        let mut cache = MomentumPhase::new([4, 4, 4]);
        let a = cache.get(1, 0, -1);
        let b = cache.get(1, 0, -1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.cached_momenta(), 1);
        let c = cache.get(0, 1, 0);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.cached_momenta(), 2);
    }

    #[test]
    fn unit_momentum_phases_have_unit_modulus_and_wind_once() {
        let lx = 8;
        let mut cache = MomentumPhase::new([lx, 4, 4]);
        let phase = cache.get(1, 0, 0);
        for (x, p) in phase.iter().take(lx).enumerate() {
            let want = Complex64::from_polar(2.0 * std::f64::consts::PI * x as f64 / lx as f64);
            assert!((*p - want).abs() < 1e-14);
            assert!((p.abs() - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn negative_momentum_is_conjugate() {
        let mut cache = MomentumPhase::new([4, 6, 2]);
        let plus = cache.get(1, 2, -1);
        let minus = cache.get(-1, -2, 1);
        for (a, b) in plus.iter().zip(minus.iter()) {
            assert!((*a - b.conj()).abs() < 1e-14);
        }
    }

    #[test]
    fn phase_sum_over_lattice_vanishes_for_nonzero_momentum() {
        let mut cache = MomentumPhase::new([4, 4, 4]);
        let phase = cache.get(2, 1, 0);
        let sum = phase
            .iter()
            .fold(Complex64::ZERO, |acc, &p| acc + p);
        assert!(sum.abs() < 1e-12, "orthogonality violated: {sum}");
    }
}
