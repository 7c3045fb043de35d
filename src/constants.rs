// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized constants for the lattice modules.
//!
//! Collects the SU(3) color constants, LCG PRNG parameters, and numerical
//! guards used across `su3.rs`, `field.rs`, `stout.rs`, and `eigen.rs`.

/// Number of colors in QCD (SU(3)).
pub const N_COLORS: usize = 3;

/// Number of spacetime dimensions.
pub const N_DIM: usize = 4;

/// Number of spatial directions participating in smearing and the Laplacian.
///
/// The temporal direction is excluded: smearing and the Laplacian act on
/// fixed-time 3D slices only.
pub const N_SPATIAL: usize = N_DIM - 1;

/// LCG multiplier (Knuth MMIX).
///
/// Used for deterministic pseudo-random number generation in lattice
/// initialization (hot start) and Lanczos start vectors.
pub const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// LCG increment (Knuth MMIX).
pub const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Mantissa bits for LCG → uniform [0, 1) conversion.
///
/// `(seed >> 11) as f64 / (1u64 << 53) as f64` gives 53 bits of precision.
pub const LCG_53_DIVISOR: f64 = (1u64 << 53) as f64;

/// Division guard for lattice normalization and the stout exponential.
///
/// Prevents division by zero in vector norms, Gram-Schmidt, and the
/// c1 → 0 limit of the closed-form exponential. Well below any physical
/// lattice scale.
pub const LATTICE_DIVISION_GUARD: f64 = 1e-30;

/// Advance the LCG state by one step.
#[inline]
pub fn lcg_step(seed: &mut u64) {
    *seed = seed
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT);
}

/// Generate a uniform f64 in [0, 1) from 53 bits of LCG state.
#[inline]
pub fn lcg_uniform_f64(seed: &mut u64) -> f64 {
    lcg_step(seed);
    (*seed >> 11) as f64 / LCG_53_DIVISOR
}

/// Box-Muller Gaussian deviate N(0, 1) from two LCG draws.
///
/// Uses the polar form: z = sqrt(-2 ln u1) cos(2π u2).
/// The `ln` argument is clamped to `LATTICE_DIVISION_GUARD` to avoid ln(0).
#[inline]
pub fn lcg_gaussian(seed: &mut u64) -> f64 {
    let u1 = lcg_uniform_f64(seed);
    let u2 = lcg_uniform_f64(seed);
    (-2.0 * u1.max(LATTICE_DIVISION_GUARD).ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_step_deterministic() {
        let mut a = 42u64;
        let mut b = 42u64;
        lcg_step(&mut a);
        lcg_step(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn lcg_uniform_in_range() {
        let mut seed = 12345u64;
        for _ in 0..1000 {
            let v = lcg_uniform_f64(&mut seed);
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn lcg_gaussian_is_finite() {
        let mut seed = 99u64;
        for _ in 0..1000 {
            let g = lcg_gaussian(&mut seed);
            assert!(g.is_finite(), "Gaussian deviate must be finite: {g}");
        }
    }

    #[test]
    fn n_colors_and_spatial() {
        assert_eq!(N_COLORS, 3);
        assert_eq!(N_SPATIAL, 3);
    }
}
