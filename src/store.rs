// SPDX-License-Identifier: AGPL-3.0-only

//! Gauge configuration persistence.
//!
//! Configurations are stored as a one-line JSON header (extents, layout
//! tags) followed by the raw little-endian f64 link payload in
//! (t, z, y, x, μ=0..3, row, col) order — all four directions, temporal
//! included, as written by the generating code. Loading reorders into the
//! spatial-only [`LinkField`] layout.
//!
//! The store reports byte size and elapsed wall time per load so callers
//! can log throughput; the resolved file path travels with the handle for
//! the external-library smearing strategy, which re-reads the same file.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::complex::Complex64;
use crate::constants::{N_COLORS, N_DIM};
use crate::error::{Error, Result};
use crate::field::LinkField;
use crate::su3::ColorMatrix;

/// JSON header preceding the binary payload.
#[derive(Debug, Serialize, Deserialize)]
struct GaugeHeader {
    /// Lattice extents `[Lx, Ly, Lz, Lt]`.
    dims: [usize; 4],
    /// Directions stored (always 4: x, y, z, t).
    nd: usize,
    /// Colors (always 3).
    nc: usize,
}

/// A loaded gauge configuration plus load metadata.
pub struct GaugeFieldHandle {
    /// Lattice extents `[Lx, Ly, Lz, Lt]`.
    pub dims: [usize; 4],
    /// All-direction links in (t, z, y, x, μ=0..3, row, col) order.
    pub data: Vec<ColorMatrix>,
    /// Payload size on disk (or in memory).
    pub size_in_bytes: u64,
    /// Wall time spent loading.
    pub elapsed: Duration,
    /// Resolvable file path, when the configuration is file-backed.
    pub path: Option<PathBuf>,
}

impl GaugeFieldHandle {
    /// Load throughput in MB/s (peripheral; for logging only).
    #[must_use]
    pub fn throughput_mb_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64().max(1e-9);
        self.size_in_bytes as f64 / 1024.0 / 1024.0 / secs
    }

    /// Reorder into the spatial-only link field layout
    /// (μ, t, z, y, x), dropping the temporal direction.
    #[must_use]
    pub fn to_link_field(&self) -> LinkField {
        let [lx, ly, lz, lt] = self.dims;
        let mut field = LinkField::cold_start(self.dims);
        for t in 0..lt {
            for z in 0..lz {
                for y in 0..ly {
                    for x in 0..lx {
                        let site = ((t * lz + z) * ly + y) * lx + x;
                        for mu in 0..3 {
                            let dst = field.index(mu, t, z, y, x);
                            field.links[dst] = self.data[site * N_DIM + mu];
                        }
                    }
                }
            }
        }
        field
    }
}

/// Abstract gauge-field source, injectable for tests.
pub trait GaugeFieldStore {
    /// Load the configuration stored under `key`.
    ///
    /// # Errors
    ///
    /// I/O or format errors from the backing medium.
    fn load(&self, key: &str) -> Result<GaugeFieldHandle>;
}

/// File-backed store: `key` resolves to a path under `root`.
pub struct FileGaugeStore {
    root: PathBuf,
}

impl FileGaugeStore {
    /// Store rooted at `root`; keys are relative file names.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write a configuration (all four directions) under `key`.
    ///
    /// `data` must be in (t, z, y, x, μ=0..3, row, col) order.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when `data` does not match `dims`; I/O errors.
    pub fn save(&self, key: &str, dims: [usize; 4], data: &[ColorMatrix]) -> Result<PathBuf> {
        let vol = dims[0] * dims[1] * dims[2] * dims[3];
        if data.len() != vol * N_DIM {
            return Err(Error::ShapeMismatch(format!(
                "gauge payload has {} matrices, extents {dims:?} need {}",
                data.len(),
                vol * N_DIM
            )));
        }
        let path = self.root.join(key);
        let header = GaugeHeader {
            dims,
            nd: N_DIM,
            nc: N_COLORS,
        };
        let mut bytes = serde_json::to_vec(&header)
            .map_err(|e| Error::GaugeFormat(format!("header encode: {e}")))?;
        bytes.push(b'\n');
        for u in data {
            for row in &u.m {
                for c in row {
                    bytes.extend_from_slice(&c.re.to_le_bytes());
                    bytes.extend_from_slice(&c.im.to_le_bytes());
                }
            }
        }
        let mut file = std::fs::File::create(&path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        file.write_all(&bytes).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

impl GaugeFieldStore for FileGaugeStore {
    fn load(&self, key: &str) -> Result<GaugeFieldHandle> {
        let path = self.root.join(key);
        let start = Instant::now();
        let mut bytes = Vec::new();
        std::fs::File::open(&path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| Error::Io {
                path: path.clone(),
                source: e,
            })?;

        let newline = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| Error::GaugeFormat("missing header terminator".into()))?;
        let header: GaugeHeader = serde_json::from_slice(&bytes[..newline])
            .map_err(|e| Error::GaugeFormat(format!("header decode: {e}")))?;
        if header.nd != N_DIM || header.nc != N_COLORS {
            return Err(Error::GaugeFormat(format!(
                "unsupported layout nd={} nc={}",
                header.nd, header.nc
            )));
        }

        let payload = &bytes[newline + 1..];
        let vol = header.dims.iter().product::<usize>();
        let expected = vol * N_DIM * N_COLORS * N_COLORS * 2 * 8;
        if payload.len() != expected {
            return Err(Error::GaugeFormat(format!(
                "payload is {} bytes, extents {:?} need {expected}",
                payload.len(),
                header.dims
            )));
        }

        let data: Vec<ColorMatrix> = payload
            .chunks_exact(N_COLORS * N_COLORS * 2 * 8)
            .map(|chunk| {
                let mut u = ColorMatrix::ZERO;
                for i in 0..3 {
                    for j in 0..3 {
                        let k = (i * 3 + j) * 16;
                        let mut re = [0u8; 8];
                        let mut im = [0u8; 8];
                        re.copy_from_slice(&chunk[k..k + 8]);
                        im.copy_from_slice(&chunk[k + 8..k + 16]);
                        u.m[i][j] =
                            Complex64::new(f64::from_le_bytes(re), f64::from_le_bytes(im));
                    }
                }
                u
            })
            .collect();

        Ok(GaugeFieldHandle {
            dims: header.dims,
            data,
            size_in_bytes: bytes.len() as u64,
            elapsed: start.elapsed(),
            path: Some(path),
        })
    }
}

/// In-memory store for tests and synthetic configurations.
#[derive(Default)]
pub struct MemoryGaugeStore {
    fields: HashMap<String, ([usize; 4], Vec<ColorMatrix>)>,
}

impl MemoryGaugeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a configuration in (t, z, y, x, μ=0..3, row, col) order.
    pub fn insert(&mut self, key: &str, dims: [usize; 4], data: Vec<ColorMatrix>) {
        self.fields.insert(key.to_string(), (dims, data));
    }

    /// Insert a trivial (all-identity) configuration.
    pub fn insert_trivial(&mut self, key: &str, dims: [usize; 4]) {
        let vol = dims.iter().product::<usize>();
        self.insert(key, dims, vec![ColorMatrix::IDENTITY; vol * N_DIM]);
    }
}

impl GaugeFieldStore for MemoryGaugeStore {
    fn load(&self, key: &str) -> Result<GaugeFieldHandle> {
        let start = Instant::now();
        let (dims, data) = self
            .fields
            .get(key)
            .ok_or_else(|| Error::GaugeFormat(format!("unknown gauge key '{key}'")))?;
        Ok(GaugeFieldHandle {
            dims: *dims,
            data: data.clone(),
            size_in_bytes: (data.len() * 18 * 8) as u64,
            elapsed: start.elapsed(),
            path: None,
        })
    }
}

/// Convert a spatial [`LinkField`] back to store order, padding the
/// temporal direction with identity links. Used to persist synthetic
/// fields for the external-library strategy and round-trip tests.
#[must_use]
pub fn link_field_to_store_order(field: &LinkField) -> Vec<ColorMatrix> {
    let [lx, ly, lz, lt] = field.dims;
    let vol = field.volume();
    let mut data = vec![ColorMatrix::IDENTITY; vol * N_DIM];
    for t in 0..lt {
        for z in 0..lz {
            for y in 0..ly {
                for x in 0..lx {
                    let site = ((t * lz + z) * ly + y) * lx + x;
                    for mu in 0..3 {
                        data[site * N_DIM + mu] = field.link(mu, t, z, y, x);
                    }
                }
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryGaugeStore::new();
        store.insert_trivial("cfg0", [2, 2, 2, 2]);
        let handle = store.load("cfg0").expect("load");
        assert_eq!(handle.dims, [2, 2, 2, 2]);
        let field = handle.to_link_field();
        assert!(field.max_unitarity_deviation() < 1e-15);
    }

    #[test]
    fn memory_store_unknown_key() {
        let store = MemoryGaugeStore::new();
        assert!(matches!(
            store.load("nope"),
            Err(Error::GaugeFormat(_))
        ));
    }

    #[test]
    fn store_order_roundtrip_preserves_spatial_links() {
        let field = LinkField::hot_start([2, 3, 2, 2], 11, 0.4);
        let data = link_field_to_store_order(&field);
        let handle = GaugeFieldHandle {
            dims: field.dims,
            data,
            size_in_bytes: 0,
            elapsed: Duration::ZERO,
            path: None,
        };
        let back = handle.to_link_field();
        assert!(field.max_abs_diff(&back).unwrap() < f64::EPSILON);
    }

    #[test]
    fn throughput_is_finite() {
        let mut store = MemoryGaugeStore::new();
        store.insert_trivial("cfg", [2, 2, 2, 2]);
        let handle = store.load("cfg").expect("load");
        assert!(handle.throughput_mb_s().is_finite());
        assert!(handle.throughput_mb_s() >= 0.0);
    }
}
