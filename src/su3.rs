// SPDX-License-Identifier: AGPL-3.0-only

//! SU(3) matrix operations for lattice gauge fields.
//!
//! An SU(3) matrix is a 3×3 unitary matrix with determinant 1. Each link
//! variable `U_μ`(x) is an SU(3) matrix representing the parallel
//! transporter along direction μ from site x.
//!
//! Storage: row-major, 9 Complex64 values (18 f64).
//!
//! # References
//!
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 2
//! - Morningstar & Peardon, PRD 69, 054501 (2004) — stout smearing

use std::ops::{Add, Mul, Sub};

use crate::complex::Complex64;

/// 3×3 complex matrix — SU(3) link variable or su(3)-adjacent generator.
///
/// Row-major storage: `m[row][col]`.
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct ColorMatrix {
    /// Matrix elements m[row][col].
    pub m: [[Complex64; 3]; 3],
}

impl Mul for ColorMatrix {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                let mut s = Complex64::ZERO;
                for k in 0..3 {
                    s += self.m[i][k] * rhs.m[k][j];
                }
                r.m[i][j] = s;
            }
        }
        r
    }
}

impl Add for ColorMatrix {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] + rhs.m[i][j];
            }
        }
        r
    }
}

impl Sub for ColorMatrix {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] - rhs.m[i][j];
            }
        }
        r
    }
}

impl ColorMatrix {
    /// 3×3 identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            [Complex64::ONE, Complex64::ZERO, Complex64::ZERO],
            [Complex64::ZERO, Complex64::ONE, Complex64::ZERO],
            [Complex64::ZERO, Complex64::ZERO, Complex64::ONE],
        ],
    };

    /// Zero matrix (all elements 0).
    pub const ZERO: Self = Self {
        m: [[Complex64::ZERO; 3]; 3],
    };

    /// Conjugate transpose (adjoint / dagger).
    pub fn adjoint(self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[j][i].conj();
            }
        }
        r
    }

    /// Trace: Tr(U) = Σ_i `U_ii`
    pub fn trace(self) -> Complex64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2]
    }

    /// Real part of trace.
    #[must_use]
    pub fn re_trace(self) -> f64 {
        self.m[0][0].re + self.m[1][1].re + self.m[2][2].re
    }

    /// Determinant of a 3×3 complex matrix.
    pub fn det(self) -> Complex64 {
        let m = &self.m;
        let a = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]);
        let b = m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]);
        let c = m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        a - b + c
    }

    /// Exact inverse via cofactor expansion.
    ///
    /// Valid for any nonsingular 3×3 complex matrix; links drifted off the
    /// SU(3) manifold remain comfortably nonsingular.
    pub fn inverse(self) -> Self {
        let m = &self.m;

        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];

        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        let inv_det = det.inv();

        let c10 = m[0][2] * m[2][1] - m[0][1] * m[2][2];
        let c11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
        let c12 = m[0][1] * m[2][0] - m[0][0] * m[2][1];

        let c20 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
        let c21 = m[0][2] * m[1][0] - m[0][0] * m[1][2];
        let c22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];

        let mut r = Self::ZERO;
        r.m[0][0] = c00 * inv_det;
        r.m[0][1] = c10 * inv_det;
        r.m[0][2] = c20 * inv_det;
        r.m[1][0] = c01 * inv_det;
        r.m[1][1] = c11 * inv_det;
        r.m[1][2] = c21 * inv_det;
        r.m[2][0] = c02 * inv_det;
        r.m[2][1] = c12 * inv_det;
        r.m[2][2] = c22 * inv_det;
        r
    }

    /// Scale by a real number.
    pub fn scale(self, s: f64) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j].scale(s);
            }
        }
        r
    }

    /// Scale by a complex number.
    pub fn scale_complex(self, s: Complex64) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[i][j] * s;
            }
        }
        r
    }

    /// Largest elementwise |self − rhs|.
    #[must_use]
    pub fn max_abs_diff(self, rhs: Self) -> f64 {
        let mut d = 0.0_f64;
        for i in 0..3 {
            for j in 0..3 {
                d = d.max((self.m[i][j] - rhs.m[i][j]).abs());
            }
        }
        d
    }

    /// Largest elementwise |U·U† − I|: deviation from unitarity.
    #[must_use]
    pub fn unitarity_deviation(self) -> f64 {
        (self * self.adjoint()).max_abs_diff(Self::IDENTITY)
    }

    /// Matrix · color vector: `r_c` = Σ_c' `U_{c,c'}` `v_{c'}`
    pub fn mul_vec(&self, v: &[Complex64; 3]) -> [Complex64; 3] {
        let mut r = [Complex64::ZERO; 3];
        for c in 0..3 {
            for cp in 0..3 {
                r[c] += self.m[c][cp] * v[cp];
            }
        }
        r
    }

    /// Adjoint · color vector: `r_c` = Σ_c' conj(`U_{c',c}`) `v_{c'}`
    pub fn adjoint_mul_vec(&self, v: &[Complex64; 3]) -> [Complex64; 3] {
        let mut r = [Complex64::ZERO; 3];
        for c in 0..3 {
            for cp in 0..3 {
                r[c] += self.m[cp][c].conj() * v[cp];
            }
        }
        r
    }

    /// Project back onto SU(3) via modified Gram-Schmidt reunitarization.
    ///
    /// Orthonormalizes rows and fixes det = 1. Used to construct exactly
    /// unitary random fields; drifted production fields go through the
    /// fixed-point polar projection in `project` instead.
    pub fn reunitarize(self) -> Self {
        let mut u = self;

        let n0 = row_norm(&u, 0);
        if n0 > crate::constants::LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n0;
            for j in 0..3 {
                u.m[0][j] = u.m[0][j].scale(inv);
            }
        }

        let dot01 = row_dot(&u, 0, 1);
        for j in 0..3 {
            u.m[1][j] -= u.m[0][j] * dot01;
        }
        let n1 = row_norm(&u, 1);
        if n1 > crate::constants::LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n1;
            for j in 0..3 {
                u.m[1][j] = u.m[1][j].scale(inv);
            }
        }

        // Row 2 = conj(row 0 × row 1) to ensure det = 1
        u.m[2][0] = (u.m[0][1] * u.m[1][2] - u.m[0][2] * u.m[1][1]).conj();
        u.m[2][1] = (u.m[0][2] * u.m[1][0] - u.m[0][0] * u.m[1][2]).conj();
        u.m[2][2] = (u.m[0][0] * u.m[1][1] - u.m[0][1] * u.m[1][0]).conj();

        u
    }

    /// Generate a random SU(3) matrix near identity.
    ///
    /// Returns exp(i ε H) where H is a random traceless Hermitian matrix
    /// with components drawn from the crate LCG, reunitarized exactly.
    pub fn random_near_identity(seed: &mut u64, epsilon: f64) -> Self {
        use crate::constants::lcg_gaussian;

        let mut h = [[Complex64::ZERO; 3]; 3];
        let mut rand_gauss = || -> f64 { lcg_gaussian(seed) };

        // Diagonal (traceless): a3 * λ3 + a8 * λ8
        let a3 = rand_gauss() * epsilon;
        let a8 = rand_gauss() * epsilon;
        h[0][0] = Complex64::new(a3 + a8 / 3.0_f64.sqrt(), 0.0);
        h[1][1] = Complex64::new(-a3 + a8 / 3.0_f64.sqrt(), 0.0);
        h[2][2] = Complex64::new(-2.0 * a8 / 3.0_f64.sqrt(), 0.0);

        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            let re = rand_gauss() * epsilon;
            let im = rand_gauss() * epsilon;
            h[i][j] = Complex64::new(re, im);
            h[j][i] = Complex64::new(re, -im); // Hermitian
        }

        // exp(iH) ≈ I + iH - H²/2, then snap onto the manifold
        let mut result = Self::IDENTITY;
        for (i, row) in result.m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell += Complex64::I * h[i][j];
            }
        }
        for (i, row) in result.m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                let h2_ij = (0..3).fold(Complex64::ZERO, |acc, k| acc + h[i][k] * h[k][j]);
                *cell -= h2_ij.scale(0.5);
            }
        }

        result.reunitarize()
    }
}

fn row_norm(u: &ColorMatrix, row: usize) -> f64 {
    let mut s = 0.0;
    for j in 0..3 {
        s += u.m[row][j].abs_sq();
    }
    s.sqrt()
}

fn row_dot(u: &ColorMatrix, r1: usize, r2: usize) -> Complex64 {
    let mut s = Complex64::ZERO;
    for j in 0..3 {
        s += u.m[r1][j].conj() * u.m[r2][j];
    }
    s
}
