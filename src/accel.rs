// SPDX-License-Identifier: AGPL-3.0-only

//! External acceleration library strategy for stout smearing.
//!
//! Site-local smearing maps well onto dedicated accelerator hardware, but
//! such libraries consume the gauge configuration from its file rather
//! than from host memory. [`AccelSmearing`] is the seam: implementations
//! wrap a vendor library, and [`AccelStout`] adapts one to the common
//! [`SmearingStrategy`] interface by carrying the source path alongside.

use std::path::Path;

use crate::error::{Error, Result};
use crate::field::LinkField;
use crate::stout::SmearingStrategy;

/// An external library that smears a configuration straight from its file.
pub trait AccelSmearing {
    /// Library name for log lines.
    fn name(&self) -> &'static str;

    /// Smear the configuration at `path` and return the resulting spatial
    /// link field.
    ///
    /// # Errors
    ///
    /// `Accel` for library failures; `Io`/`GaugeFormat` for file problems.
    fn smear_from_file(
        &self,
        path: &Path,
        dims: [usize; 4],
        nstep: usize,
        rho: f64,
    ) -> Result<LinkField>;
}

/// Adapter presenting an [`AccelSmearing`] library as a strategy.
///
/// The library re-reads the gauge file, so the in-memory links are used
/// only to validate extents and verify the result shape.
pub struct AccelStout<'a> {
    lib: &'a dyn AccelSmearing,
    path: &'a Path,
}

impl<'a> AccelStout<'a> {
    /// Bind a library to the gauge file it should smear.
    #[must_use]
    pub fn new(lib: &'a dyn AccelSmearing, path: &'a Path) -> Self {
        Self { lib, path }
    }
}

impl SmearingStrategy for AccelStout<'_> {
    fn name(&self) -> &'static str {
        "accel"
    }

    fn smear(&self, links: LinkField, nstep: usize, rho: f64) -> Result<LinkField> {
        if nstep == 0 {
            return Ok(links);
        }
        let smeared = self.lib.smear_from_file(self.path, links.dims, nstep, rho)?;
        if smeared.dims != links.dims {
            return Err(Error::ShapeMismatch(format!(
                "{} returned extents {:?}, expected {:?}",
                self.lib.name(),
                smeared.dims,
                links.dims
            )));
        }
        Ok(smeared)
    }
}
