// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end low-mode eigenvector generation.
//!
//! Pipeline: load a gauge configuration, project its links back onto
//! SU(3), stout-smear the spatial field, then extract the smallest
//! Laplacian eigenpairs per timeslice. The generator owns the field state
//! between stages so callers can interleave timeslices and configurations
//! without reloading.
//!
//! Smearing strategy selection, in order of preference: GPU kernel when a
//! context was attached, external acceleration library when one was
//! attached and the configuration is file-backed, portable otherwise.

use std::path::PathBuf;

use crate::accel::{AccelSmearing, AccelStout};
use crate::complex::Complex64;
use crate::constants::N_COLORS;
use crate::eigen::{lanczos_smallest, HermitianOperator};
use crate::error::{Error, Result};
use crate::field::LinkField;
use crate::laplacian::LaplacianOperator;
use crate::project::project_su3;
use crate::store::GaugeFieldStore;
use crate::stout::{CpuStout, SmearingStrategy};
use crate::stout_gpu::GpuStout;
use crate::tolerances::EIGENSOLVER_TOL;

/// Generation parameters for one configuration series.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Expected lattice extents `[Lx, Ly, Lz, Lt]`.
    pub dims: [usize; 4],
    /// Eigenpairs to extract per timeslice.
    pub ne: usize,
    /// Lanczos residual tolerance.
    pub tol: f64,
    /// Lanczos step cap; `None` runs to the operator dimension.
    pub max_lanczos_iter: Option<usize>,
    /// Seed for the Lanczos starting vector.
    pub seed: u64,
}

impl GeneratorConfig {
    /// Defaults for extents `dims` and `ne` modes.
    #[must_use]
    pub fn new(dims: [usize; 4], ne: usize) -> Self {
        Self {
            dims,
            ne,
            tol: EIGENSOLVER_TOL,
            max_lanczos_iter: None,
            seed: 0x5eed,
        }
    }
}

/// Low modes of one timeslice.
pub struct EigenModes {
    /// Eigenvalues, smallest first.
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors flattened as (mode, site, color), color fastest.
    pub vectors: Vec<Complex64>,
    /// Modes extracted.
    pub ne: usize,
    /// Sites per timeslice.
    pub spatial_volume: usize,
    /// Lanczos steps spent.
    pub iterations: usize,
}

impl EigenModes {
    /// Eigenvector `mode` as a (site, color) slice.
    #[must_use]
    pub fn vector(&self, mode: usize) -> &[Complex64] {
        let n = self.spatial_volume * N_COLORS;
        &self.vectors[mode * n..(mode + 1) * n]
    }
}

/// Orchestrates load → project → smear → solve for one configuration at a
/// time.
pub struct EigenvectorGenerator {
    config: GeneratorConfig,
    store: Box<dyn GaugeFieldStore>,
    gpu: Option<GpuStout>,
    accel: Option<Box<dyn AccelSmearing>>,
    links: Option<LinkField>,
    loaded_key: Option<String>,
    gauge_path: Option<PathBuf>,
}

impl EigenvectorGenerator {
    /// Generator over configurations served by `store`.
    #[must_use]
    pub fn new(config: GeneratorConfig, store: Box<dyn GaugeFieldStore>) -> Self {
        Self {
            config,
            store,
            gpu: None,
            accel: None,
            links: None,
            loaded_key: None,
            gauge_path: None,
        }
    }

    /// Attach a GPU smearing strategy (highest preference).
    #[must_use]
    pub fn with_gpu(mut self, gpu: GpuStout) -> Self {
        self.gpu = Some(gpu);
        self
    }

    /// Attach an external acceleration library (used for file-backed
    /// configurations when no GPU is attached).
    #[must_use]
    pub fn with_accel(mut self, lib: Box<dyn AccelSmearing>) -> Self {
        self.accel = Some(lib);
        self
    }

    /// The current link field, if one is loaded.
    #[must_use]
    pub fn links(&self) -> Option<&LinkField> {
        self.links.as_ref()
    }

    /// Load the configuration under `key`. Reloading the same key is a
    /// no-op; a new key replaces the current field.
    ///
    /// # Errors
    ///
    /// Store errors, plus `ShapeMismatch` when the file extents disagree
    /// with the configured ones.
    pub fn load(&mut self, key: &str) -> Result<()> {
        if self.loaded_key.as_deref() == Some(key) && self.links.is_some() {
            return Ok(());
        }
        let handle = self.store.load(key)?;
        if handle.dims != self.config.dims {
            return Err(Error::ShapeMismatch(format!(
                "configuration '{key}' has extents {:?}, expected {:?}",
                handle.dims, self.config.dims
            )));
        }
        println!(
            "  loaded {key}: {:.1} MB in {:.3} s ({:.1} MB/s)",
            handle.size_in_bytes as f64 / 1024.0 / 1024.0,
            handle.elapsed.as_secs_f64(),
            handle.throughput_mb_s()
        );
        self.gauge_path = handle.path.clone();
        self.links = Some(handle.to_link_field());
        self.loaded_key = Some(key.to_string());
        Ok(())
    }

    /// Project all links back onto SU(3). Returns iterations used.
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`load`](Self::load); `ProjectionDiverged` on
    /// pathological input.
    pub fn project(&mut self) -> Result<usize> {
        let links = self.links.as_mut().ok_or(Error::NotLoaded)?;
        project_su3(links)
    }

    /// Stout-smear the spatial links in place. Returns the name of the
    /// strategy that ran.
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`load`](Self::load); strategy execution errors.
    /// A failed strategy leaves the loaded field untouched.
    pub fn smear(&mut self, nstep: usize, rho: f64) -> Result<&'static str> {
        let links = self.links.as_ref().ok_or(Error::NotLoaded)?;

        // Strategies consume the field, so hand them a copy: a transient
        // backend failure must not discard the loaded links.
        let (smeared, name) = if let Some(gpu) = &self.gpu {
            (gpu.smear(links.clone(), nstep, rho), gpu.name())
        } else if let (Some(lib), Some(path)) = (self.accel.as_deref(), self.gauge_path.as_deref())
        {
            let adapter = AccelStout::new(lib, path);
            let result = adapter.smear(links.clone(), nstep, rho);
            (result, adapter.name())
        } else {
            (CpuStout.smear(links.clone(), nstep, rho), CpuStout.name())
        };

        let field = smeared?;
        println!("  smeared {nstep} steps (rho = {rho}) via {name}");
        self.links = Some(field);
        Ok(name)
    }

    /// Extract the smallest eigenpairs of the covariant Laplacian on
    /// timeslice `t`.
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`load`](Self::load); `ShapeMismatch` for an
    /// out-of-range timeslice or too many modes; `EigensolverDiverged`
    /// when the Lanczos budget runs out.
    pub fn compute(&self, t: usize) -> Result<EigenModes> {
        let links = self.links.as_ref().ok_or(Error::NotLoaded)?;
        let lt = links.dims[3];
        if t >= lt {
            return Err(Error::ShapeMismatch(format!(
                "timeslice {t} out of range for Lt = {lt}"
            )));
        }

        let operator = LaplacianOperator::new(links, t);
        let dim = operator.dim();
        let max_iter = self.config.max_lanczos_iter.unwrap_or(dim);
        let pairs = lanczos_smallest(
            &operator,
            self.config.ne,
            self.config.tol,
            max_iter,
            self.config.seed,
        )?;

        let spatial_volume = links.spatial_volume();
        let mut vectors = Vec::with_capacity(self.config.ne * dim);
        for v in &pairs.vectors {
            vectors.extend_from_slice(v);
        }
        Ok(EigenModes {
            eigenvalues: pairs.values,
            vectors,
            ne: self.config.ne,
            spatial_volume,
            iterations: pairs.iterations,
        })
    }
}
