// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized numerical tolerances with justification.
//!
//! Every threshold used by the projection, smearing, and eigensolver code
//! is defined here with its origin. No ad-hoc magic numbers in call sites.

/// SU(3) projection convergence tolerance.
///
/// Applied elementwise to both stopping conditions of the fixed-point
/// polar iteration: |U − (U⁻¹)†| and |U·U† − I|. One ulp above f64
/// machine epsilon relative to O(1) matrix entries; the iteration is
/// quadratically convergent so the last step overshoots well past this.
pub const SU3_PROJECTION_EPS: f64 = 1e-15;

/// SU(3) projection iteration cap.
///
/// Quadratic convergence means drifted-but-sane fields converge in fewer
/// than 10 iterations; exceeding 64 indicates pathological input and is
/// reported as `ProjectionDiverged` rather than looping unboundedly.
pub const SU3_PROJECTION_MAX_ITER: usize = 64;

/// Switch-over for sinc(w) = sin(w)/w in the stout exponential.
///
/// For |w| ≤ 0.05 the direct ratio loses precision to cancellation; the
/// 4th-order Taylor series 1 − w²/6·(1 − w²/20·(1 − w²/42·(1 − w²/72)))
/// has truncation error below 1e-18 there.
pub const SINC_TAYLOR_THRESHOLD: f64 = 0.05;

/// Agreement tolerance between smearing execution strategies.
///
/// Portable, GPU-kernel, and external-library smearing evaluate the same
/// closed form with different operation ordering; 1e-6 elementwise bounds
/// the accumulated reordering error over typical (nstep ≤ 20) runs with
/// large headroom.
pub const STRATEGY_AGREEMENT: f64 = 1e-6;

/// Unitarity drift allowed after smearing.
///
/// Stout smearing preserves unitarity analytically; per-iteration f64
/// rounding accrues ~1e-15, so 1e-12 covers deep smearing runs.
pub const SMEARED_UNITARITY: f64 = 1e-12;

/// Default eigensolver relative tolerance.
///
/// Lanczos residual threshold |β_m s_m| ≤ tol · max(1, |θ|max). Matches
/// the accuracy of the operator application itself (stencil of ~20 f64
/// ops per element).
pub const EIGENSOLVER_TOL: f64 = 1e-10;

/// Hermiticity check tolerance for the Laplacian operator.
///
/// ⟨x, L y⟩ − ⟨L x, y⟩ accumulates O(volume) roundings of O(1) terms;
/// 1e-10 on unit-norm vectors covers volumes into the thousands of sites.
pub const HERMITICITY_TOL: f64 = 1e-10;

/// Lanczos breakdown threshold on the recurrence norm β.
///
/// β below this means the Krylov space is (numerically) invariant, so the
/// lowest Ritz pair is exact and the run stops instead of dividing by a
/// vanishing norm.
pub const LANCZOS_BREAKDOWN: f64 = 1e-14;

/// Pivot guard for Sturm LDLT recursion on tridiagonal matrices.
///
/// Replaces near-zero pivots to keep the sign count well-defined; far
/// below any eigenvalue separation of interest.
pub const TRIDIAG_STURM_PIVOT_GUARD: f64 = 1e-300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::assertions_on_constants)] // ordering sanity check
    fn tolerance_ordering() {
        assert!(SU3_PROJECTION_EPS < SMEARED_UNITARITY);
        assert!(SMEARED_UNITARITY < STRATEGY_AGREEMENT);
        assert!(EIGENSOLVER_TOL <= HERMITICITY_TOL);
    }

    #[test]
    fn sinc_taylor_matches_ratio_at_threshold() {
        let w: f64 = SINC_TAYLOR_THRESHOLD;
        let w_sq = w * w;
        let taylor =
            1.0 - w_sq / 6.0 * (1.0 - w_sq / 20.0 * (1.0 - w_sq / 42.0 * (1.0 - w_sq / 72.0)));
        let ratio = w.sin() / w;
        assert!(
            (taylor - ratio).abs() < 1e-16,
            "series and ratio must agree at the switch-over"
        );
    }
}
