// SPDX-License-Identifier: AGPL-3.0-only

//! Spatial stout smearing of SU(3) link fields.
//!
//! One stout step (Morningstar & Peardon, PRD 69, 054501) replaces each
//! spatial link by
//!
//! ```text
//! U'_μ(x) = exp(i Q_μ(x)) U_μ(x)
//! ```
//!
//! where Q is the traceless Hermitian projection of Ω = ρ C_μ(x) U_μ†(x)
//! and C is the sum of the upper and lower staples over the other spatial
//! directions. Temporal links are never touched and temporal staples never
//! enter, so each timeslice smears independently.
//!
//! The matrix exponential uses the closed-form Cayley–Hamilton expansion
//! for traceless Hermitian 3×3 matrices: exp(iQ) = f0 + f1 Q + f2 Q² with
//! coefficients built from the invariants c0 = tr(Q³)/3 and c1 = tr(Q²)/2.
//!
//! Smearing is pure: strategies consume a field and return a new one.

use rayon::prelude::*;

use crate::complex::Complex64;
use crate::constants::{LATTICE_DIVISION_GUARD, N_SPATIAL};
use crate::error::Result;
use crate::field::LinkField;
use crate::su3::ColorMatrix;
use crate::tolerances::SINC_TAYLOR_THRESHOLD;

/// A way to execute stout smearing.
///
/// All implementations must agree elementwise to
/// [`STRATEGY_AGREEMENT`](crate::tolerances::STRATEGY_AGREEMENT); they
/// differ only in where the arithmetic runs.
pub trait SmearingStrategy {
    /// Strategy name for log lines.
    fn name(&self) -> &'static str;

    /// Apply `nstep` stout iterations with parameter `rho`.
    ///
    /// # Errors
    ///
    /// Execution-backend failures (GPU dispatch, external library). The
    /// portable strategy is infallible in practice.
    fn smear(&self, links: LinkField, nstep: usize, rho: f64) -> Result<LinkField>;
}

/// Portable strategy: rayon-parallel over links, pure f64.
///
/// This is the reference implementation the other strategies are checked
/// against.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuStout;

impl SmearingStrategy for CpuStout {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn smear(&self, mut links: LinkField, nstep: usize, rho: f64) -> Result<LinkField> {
        for _ in 0..nstep {
            links = smear_once(&links, rho);
        }
        Ok(links)
    }
}

/// sinc(w) = sin(w)/w, switching to a Taylor series near zero where the
/// direct ratio cancels.
#[inline]
fn sinc(w: f64) -> f64 {
    if w.abs() <= SINC_TAYLOR_THRESHOLD {
        let w2 = w * w;
        1.0 - w2 / 6.0 * (1.0 - w2 / 20.0 * (1.0 - w2 / 42.0 * (1.0 - w2 / 72.0)))
    } else {
        w.sin() / w
    }
}

/// exp(i Q) for traceless Hermitian Q, in closed form.
///
/// Exposed for the GPU kernel's cross-check tests; production callers go
/// through [`SmearingStrategy::smear`].
#[must_use]
pub fn exp_iq(q: ColorMatrix) -> ColorMatrix {
    let q2 = q * q;
    let c0 = (q2 * q).re_trace() / 3.0;
    let c1 = q2.re_trace() / 2.0;

    // Q ≈ 0 (trivial or nearly-trivial field): the invariant formulas hit
    // 0/0, but the exponential is just its second-order series.
    if c1 <= LATTICE_DIVISION_GUARD {
        return ColorMatrix::IDENTITY + q.scale_complex(Complex64::I) - q2.scale(0.5);
    }

    // Negative c0 is mapped to the positive branch; the coefficients are
    // restored afterwards through f0 → f0*, f1 → −f1*, f2 → f2*.
    let parity = c0 < 0.0;
    let c0_abs = c0.abs();
    let c0_max = 2.0 * (c1 / 3.0).powf(1.5);
    let theta = (c0_abs / c0_max).min(1.0).acos();

    let u = (c1 / 3.0).sqrt() * (theta / 3.0).cos();
    let w = c1.sqrt() * (theta / 3.0).sin();

    let e_2iu = Complex64::from_polar(2.0 * u);
    let e_miu = Complex64::from_polar(-u);
    let cos_w = w.cos();
    let sinc_w = sinc(w);

    let u_sq = u * u;
    let w_sq = w * w;
    // θ ∈ [0, π/2] keeps 9u² − w² strictly positive.
    let denom = 1.0 / (9.0 * u_sq - w_sq);

    let mut f0 = (e_2iu.scale(u_sq - w_sq)
        + e_miu
            * Complex64::new(
                8.0 * u_sq * cos_w,
                2.0 * u * (3.0 * u_sq + w_sq) * sinc_w,
            ))
    .scale(denom);
    let mut f1 = (e_2iu.scale(2.0 * u)
        - e_miu * Complex64::new(2.0 * u * cos_w, -(3.0 * u_sq - w_sq) * sinc_w))
    .scale(denom);
    let mut f2 = (e_2iu - e_miu * Complex64::new(cos_w, 3.0 * u * sinc_w)).scale(denom);

    if parity {
        f0 = f0.conj();
        f1 = -f1.conj();
        f2 = f2.conj();
    }

    ColorMatrix::IDENTITY.scale_complex(f0) + q.scale_complex(f1) + q2.scale_complex(f2)
}

/// Sum of the four spatial staples around `U_μ(t, z, y, x)`.
///
/// For each ν ≠ μ the upper staple is
/// `U_ν(x) U_μ(x+ν̂) U_ν†(x+μ̂)` and the lower staple is
/// `U_ν†(x−ν̂) U_μ(x−ν̂) U_ν(x−ν̂+μ̂)`.
#[must_use]
pub fn staple_sum(
    field: &LinkField,
    mu: usize,
    t: usize,
    z: usize,
    y: usize,
    x: usize,
) -> ColorMatrix {
    let mut c = ColorMatrix::ZERO;
    let (z_pm, y_pm, x_pm) = field.shift(z, y, x, mu, 1);
    for nu in 0..N_SPATIAL {
        if nu == mu {
            continue;
        }
        let (z_pn, y_pn, x_pn) = field.shift(z, y, x, nu, 1);
        let upper = field.link(nu, t, z, y, x)
            * field.link(mu, t, z_pn, y_pn, x_pn)
            * field.link(nu, t, z_pm, y_pm, x_pm).adjoint();

        let (z_mn, y_mn, x_mn) = field.shift(z, y, x, nu, -1);
        let (z_mp, y_mp, x_mp) = field.shift(z_mn, y_mn, x_mn, mu, 1);
        let lower = field.link(nu, t, z_mn, y_mn, x_mn).adjoint()
            * field.link(mu, t, z_mn, y_mn, x_mn)
            * field.link(nu, t, z_mp, y_mp, x_mp);

        c = c + upper + lower;
    }
    c
}

/// Traceless Hermitian generator Q_μ(x) from a link and its staple sum.
#[inline]
fn stout_q(u: ColorMatrix, staple: ColorMatrix, rho: f64) -> ColorMatrix {
    let omega = staple.scale(rho) * u.adjoint();
    // ½ i (Ω† − Ω) is Hermitian; removing the trace lands in su(3).
    let a = (omega.adjoint() - omega).scale_complex(Complex64::new(0.0, 0.5));
    let tr = a.trace().scale(1.0 / 3.0);
    a - ColorMatrix::IDENTITY.scale_complex(tr)
}

/// One stout iteration over all spatial links.
#[must_use]
pub fn smear_once(field: &LinkField, rho: f64) -> LinkField {
    let [lx, ly, lz, lt] = field.dims;
    let links: Vec<ColorMatrix> = (0..field.links.len())
        .into_par_iter()
        .map(|idx| {
            let x = idx % lx;
            let y = (idx / lx) % ly;
            let z = (idx / (lx * ly)) % lz;
            let t = (idx / (lx * ly * lz)) % lt;
            let mu = idx / (lx * ly * lz * lt);

            let u = field.links[idx];
            let c = staple_sum(field, mu, t, z, y, x);
            exp_iq(stout_q(u, c, rho)) * u
        })
        .collect();
    LinkField {
        dims: field.dims,
        links,
    }
}
