// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed-point projection of drifted link variables back onto SU(3).
//!
//! Gauge configurations written in truncated precision (or accumulated
//! through long molecular-dynamics trajectories) drift off the group
//! manifold. The averaging iteration
//!
//! ```text
//! U ← ½ (U + (U⁻¹)†)
//! ```
//!
//! converges quadratically to the unitary polar factor of U. All links
//! are iterated in lockstep until the worst link satisfies BOTH
//! |U − (U⁻¹)†| ≤ ε and |U·U† − I| ≤ ε elementwise.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::field::LinkField;
use crate::su3::ColorMatrix;
use crate::tolerances::{SU3_PROJECTION_EPS, SU3_PROJECTION_MAX_ITER};

/// One projection sweep over a single link. Returns the updated link and
/// its two residuals (inverse-adjoint distance, unitarity deviation).
#[inline]
fn project_link(u: ColorMatrix) -> (ColorMatrix, f64, f64) {
    let inv_adj = u.inverse().adjoint();
    let dist = u.max_abs_diff(inv_adj);
    let unit = u.unitarity_deviation();
    let next = (u + inv_adj).scale(0.5);
    (next, dist, unit)
}

/// Project every link of `field` onto SU(3) in place.
///
/// Returns the number of iterations performed.
///
/// # Errors
///
/// `ProjectionDiverged` when either residual still exceeds the tolerance
/// after [`SU3_PROJECTION_MAX_ITER`] sweeps.
pub fn project_su3(field: &mut LinkField) -> Result<usize> {
    for iter in 0..SU3_PROJECTION_MAX_ITER {
        let sweep: Vec<(ColorMatrix, f64)> = field
            .links
            .par_iter()
            .map(|&u| {
                let (v, dist, unit) = project_link(u);
                (v, dist.max(unit))
            })
            .collect();

        let residual = sweep.iter().map(|&(_, r)| r).fold(0.0, f64::max);
        if residual <= SU3_PROJECTION_EPS {
            // Converged before this sweep's update; keep the current links.
            return Ok(iter);
        }
        field.links = sweep.into_iter().map(|(v, _)| v).collect();
    }

    let residual = field
        .links
        .iter()
        .map(|u| {
            let inv_adj = u.inverse().adjoint();
            u.max_abs_diff(inv_adj).max(u.unitarity_deviation())
        })
        .fold(0.0, f64::max);
    Err(Error::ProjectionDiverged {
        iterations: SU3_PROJECTION_MAX_ITER,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drifted_field(seed: u64, drift: f64) -> LinkField {
        let mut field = LinkField::hot_start([3, 3, 3, 2], seed, 0.4);
        let mut s = seed.wrapping_add(1);
        for u in &mut field.links {
            for row in &mut u.m {
                for c in row.iter_mut() {
                    c.re += drift * (crate::constants::lcg_uniform_f64(&mut s) - 0.5);
                    c.im += drift * (crate::constants::lcg_uniform_f64(&mut s) - 0.5);
                }
            }
        }
        field
    }

    #[test]
    fn already_unitary_field_converges_immediately() {
        let mut field = LinkField::cold_start([2, 2, 2, 2]);
        let iters = project_su3(&mut field).expect("projection");
        assert_eq!(iters, 0, "identity links need no sweeps");
        assert!(field.max_unitarity_deviation() <= SU3_PROJECTION_EPS);
    }

    #[test]
    fn drifted_field_projects_back() {
        let mut field = drifted_field(17, 1e-4);
        assert!(field.max_unitarity_deviation() > SU3_PROJECTION_EPS);
        let iters = project_su3(&mut field).expect("projection");
        assert!(iters >= 1);
        assert!(iters < 20, "quadratic convergence, got {iters} sweeps");
        assert!(field.max_unitarity_deviation() <= SU3_PROJECTION_EPS);
    }

    #[test]
    fn projection_is_idempotent() {
        let mut field = drifted_field(23, 1e-3);
        project_su3(&mut field).expect("first projection");
        let snapshot = field.clone();
        let iters = project_su3(&mut field).expect("second projection");
        assert_eq!(iters, 0);
        assert!(field.max_abs_diff(&snapshot).unwrap() < f64::EPSILON);
    }

    #[test]
    fn large_drift_still_converges() {
        let mut field = drifted_field(31, 5e-2);
        project_su3(&mut field).expect("projection");
        assert!(field.max_unitarity_deviation() <= SU3_PROJECTION_EPS);
    }

    #[test]
    fn pathological_link_reports_divergence() {
        // For s·I the iteration halves s each sweep, so a link scaled far
        // enough off the manifold cannot reach it within the cap.
        let mut field = LinkField::cold_start([2, 2, 2, 1]);
        field.links[0] = ColorMatrix::IDENTITY.scale(1e30);
        match project_su3(&mut field) {
            Err(Error::ProjectionDiverged {
                iterations,
                residual,
            }) => {
                assert_eq!(iterations, SU3_PROJECTION_MAX_ITER);
                assert!(residual > SU3_PROJECTION_EPS, "residual {residual:.3e}");
            }
            other => panic!("expected ProjectionDiverged, got {other:?}"),
        }
    }
}
