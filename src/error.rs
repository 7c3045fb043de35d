// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for gauge-field loading, projection, smearing, and the
//! eigensolver.
//!
//! One variant per failure mode so callers can pattern-match (numerical
//! non-convergence vs shape mismatch vs GPU setup) rather than parsing
//! opaque strings. No external error crates.

use std::fmt;
use std::path::PathBuf;

/// Errors produced by stillspring operations.
#[derive(Debug)]
pub enum Error {
    /// File I/O error with path context.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Gauge configuration file is malformed (header, payload size, layout).
    GaugeFormat(String),

    /// Lattice extents, mode count, or field shape inconsistent with the
    /// request. Raised before any solver call.
    ShapeMismatch(String),

    /// An operation that needs a loaded link field ran before `load`.
    NotLoaded,

    /// The SU(3) fixed-point projection failed to meet both tolerances
    /// within the iteration cap.
    ProjectionDiverged {
        /// Iterations performed before giving up.
        iterations: usize,
        /// Worst elementwise residual at the final iterate.
        residual: f64,
    },

    /// The Lanczos eigensolver exhausted its iteration budget before all
    /// requested eigenpairs met the residual tolerance.
    EigensolverDiverged {
        /// Lanczos steps performed.
        iterations: usize,
        /// Eigenpairs that did converge.
        converged: usize,
        /// Eigenpairs requested.
        requested: usize,
    },

    /// No compatible GPU adapter was found by wgpu.
    NoAdapter,

    /// GPU device creation failed (wraps the underlying wgpu error message).
    DeviceCreation(String),

    /// GPU lacks the `SHADER_F64` feature required for f64 compute.
    NoShaderF64,

    /// GPU dispatch or readback failed.
    Gpu(String),

    /// The external acceleration library reported a failure.
    Accel(String),
}

/// Result type alias for stillspring operations.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::GaugeFormat(msg) => write!(f, "gauge file format error: {msg}"),
            Self::ShapeMismatch(msg) => write!(f, "shape mismatch: {msg}"),
            Self::NotLoaded => write!(f, "no gauge field loaded"),
            Self::ProjectionDiverged {
                iterations,
                residual,
            } => write!(
                f,
                "SU(3) projection did not converge after {iterations} iterations \
                 (residual {residual:.3e})"
            ),
            Self::EigensolverDiverged {
                iterations,
                converged,
                requested,
            } => write!(
                f,
                "eigensolver converged {converged}/{requested} pairs \
                 after {iterations} Lanczos steps"
            ),
            Self::NoAdapter => write!(f, "No GPU adapter found"),
            Self::DeviceCreation(e) => write!(f, "Failed to create GPU device: {e}"),
            Self::NoShaderF64 => {
                write!(
                    f,
                    "GPU does not support SHADER_F64 — cannot run f64 computation"
                )
            }
            Self::Gpu(msg) => write!(f, "GPU compute error: {msg}"),
            Self::Accel(msg) => write!(f, "acceleration library error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
