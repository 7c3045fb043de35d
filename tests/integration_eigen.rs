// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: eigenvector pipeline end-to-end validation.
//!
//! These tests exercise the full load → project → smear → solve chain
//! through the public API, checking solved spectra against analytically
//! known free-field results.

use stillspring::complex::Complex64;
use stillspring::eigen::{lanczos_smallest, HermitianOperator};
use stillspring::error::Error;
use stillspring::field::LinkField;
use stillspring::generator::{EigenvectorGenerator, GeneratorConfig};
use stillspring::laplacian::LaplacianOperator;
use stillspring::phase::MomentumPhase;
use stillspring::store::{
    link_field_to_store_order, FileGaugeStore, GaugeFieldStore, MemoryGaugeStore,
};
use stillspring::tolerances;

fn trivial_generator(dims: [usize; 4], ne: usize) -> EigenvectorGenerator {
    let mut store = MemoryGaugeStore::new();
    store.insert_trivial("cfg", dims);
    EigenvectorGenerator::new(GeneratorConfig::new(dims, ne), Box::new(store))
}

#[test]
fn trivial_configuration_has_exact_zero_mode() {
    let mut gen = trivial_generator([4, 4, 4, 4], 1);
    gen.load("cfg").expect("load");
    gen.project().expect("project");
    gen.smear(0, 0.12).expect("smear");
    let modes = gen.compute(0).expect("solve");

    assert!(
        modes.eigenvalues[0].abs() < 1e-10,
        "free-field ground state must be 0, got {:.3e}",
        modes.eigenvalues[0]
    );

    // The zero mode is constant across sites up to a global phase.
    let v = modes.vector(0);
    let reference = v
        .chunks_exact(3)
        .map(|site| site[0].abs_sq() + site[1].abs_sq() + site[2].abs_sq())
        .next()
        .unwrap();
    for site in v.chunks_exact(3) {
        let norm = site[0].abs_sq() + site[1].abs_sq() + site[2].abs_sq();
        assert!(
            (norm - reference).abs() < 1e-8,
            "zero mode is not translation invariant"
        );
    }
}

#[test]
fn free_field_spectrum_matches_lattice_dispersion() {
    // Eigenvalues of the free Laplacian on L³ are 6 − 2Σ_d cos(2π n_d / L),
    // each 3-fold color degenerate. On 4³ the distinct levels start at
    // 0 and 2 (one cosine flipped to cos(π/2) = 0).
    let dims = [4, 4, 4, 1];
    let field = LinkField::cold_start(dims);
    let lap = LaplacianOperator::new(&field, 0);
    let pairs = lanczos_smallest(
        &lap,
        4,
        tolerances::EIGENSOLVER_TOL,
        lap.dim(),
        11,
    )
    .expect("solve");

    assert!(pairs.values[0].abs() < 1e-9);
    assert!(pairs.values[1].abs() < 1e-9);
    assert!(pairs.values[2].abs() < 1e-9, "zero mode is 3-fold degenerate");
    assert!(
        (pairs.values[3] - 2.0).abs() < 1e-8,
        "first excited level should be 2, got {}",
        pairs.values[3]
    );
}

#[test]
fn smearing_leaves_the_zero_mode_in_place() {
    // Stout smearing preserves gauge covariance; on a rough field the
    // smallest eigenvalue can move, but positivity and hermiticity hold.
    let dims = [4, 4, 4, 2];
    let field = LinkField::hot_start(dims, 31, 0.4);
    let mut store = MemoryGaugeStore::new();
    store.insert("rough", dims, link_field_to_store_order(&field));

    let mut gen = EigenvectorGenerator::new(GeneratorConfig::new(dims, 2), Box::new(store));
    gen.load("rough").expect("load");
    gen.project().expect("project");
    gen.smear(3, 0.1).expect("smear");
    let modes = gen.compute(1).expect("solve");

    assert!(modes.eigenvalues[0] > -1e-9, "Laplacian must stay PSD");
    assert!(modes.eigenvalues[1] >= modes.eigenvalues[0]);
    assert_eq!(modes.vector(0).len(), 4 * 4 * 4 * 3);
}

#[test]
fn requesting_too_many_modes_fails_fast() {
    // 2×2×2 timeslice → operator dimension 24.
    let mut gen = trivial_generator([2, 2, 2, 2], 24);
    gen.load("cfg").expect("load");
    assert!(matches!(gen.compute(0), Err(Error::ShapeMismatch(_))));
}

#[test]
fn file_store_roundtrips_through_the_generator() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = FileGaugeStore::new(tmp.path());
    let dims = [3, 3, 3, 2];
    let field = LinkField::hot_start(dims, 77, 0.3);
    store
        .save("cfg.bin", dims, &link_field_to_store_order(&field))
        .expect("save");

    let loaded = store.load("cfg.bin").expect("load");
    assert_eq!(loaded.dims, dims);
    assert!(loaded.path.is_some(), "file store must expose the path");
    let diff = field
        .max_abs_diff(&loaded.to_link_field())
        .expect("same extents");
    assert!(diff < f64::EPSILON, "payload drifted by {diff:.3e}");

    let mut gen = EigenvectorGenerator::new(GeneratorConfig::new(dims, 1), Box::new(store));
    gen.load("cfg.bin").expect("generator load");
    gen.project().expect("project");
    let modes = gen.compute(0).expect("solve");
    assert!(modes.eigenvalues[0] > -1e-9);
}

#[test]
fn corrupt_gauge_file_is_a_format_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::write(tmp.path().join("bad.bin"), b"{\"dims\":[2,2,2,2],\"nd\":4,\"nc\":3}\nshort")
        .expect("write");
    let store = FileGaugeStore::new(tmp.path());
    assert!(matches!(store.load("bad.bin"), Err(Error::GaugeFormat(_))));
}

#[test]
fn momentum_phases_are_cached_and_consistent_with_modes() {
    let dims = [4, 4, 4, 1];
    let mut cache = MomentumPhase::new([dims[0], dims[1], dims[2]]);
    let zero = cache.get(0, 0, 0);
    let again = cache.get(0, 0, 0);
    assert!(std::sync::Arc::ptr_eq(&zero, &again));

    // Projecting the free zero mode onto zero momentum keeps the full
    // norm; any nonzero momentum projects to (numerically) nothing.
    let mut gen = trivial_generator(dims, 1);
    gen.load("cfg").expect("load");
    let modes = gen.compute(0).expect("solve");
    let v = modes.vector(0);

    // Project per color: the zero mode is an arbitrary vector in the
    // color-degenerate subspace, so a plain color sum could cancel.
    let project = |phase: &[Complex64]| -> f64 {
        let mut acc = [Complex64::ZERO; 3];
        for (site, p) in phase.iter().enumerate() {
            for (c, a) in acc.iter_mut().enumerate() {
                *a += p.conj() * v[site * 3 + c];
            }
        }
        acc.iter().map(|a| a.abs_sq()).sum::<f64>().sqrt()
    };
    let p0 = project(&zero);
    let p1 = project(&cache.get(1, 0, 0));
    assert!(p0 > 1.0, "zero-momentum projection lost the mode: {p0}");
    assert!(p1 < 1e-8, "nonzero momentum should project out: {p1}");
}
