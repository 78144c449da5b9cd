//! Shared setup for the integration test binaries
#![allow(dead_code)]

use stable_fluids_core::{Boundary, GridDims};
use tracing_subscriber::EnvFilter;

/// Route solver logs through the test harness, filtered by `RUST_LOG`
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assert the ghost border of `x` is exactly what `boundary` prescribes
pub fn assert_boundary_law(dims: GridDims, boundary: Boundary, x: &[f32]) {
    let n = dims.n();
    let (sx, sy) = match boundary {
        Boundary::Scalar => (1.0, 1.0),
        Boundary::VelocityX => (-1.0, 1.0),
        Boundary::VelocityY => (1.0, -1.0),
    };
    let at = |i: usize, j: usize| x[dims.index(i, j)];

    for k in 1..=n {
        assert_eq!(at(0, k), sx * at(1, k), "left edge, row {k}");
        assert_eq!(at(n + 1, k), sx * at(n, k), "right edge, row {k}");
        assert_eq!(at(k, 0), sy * at(k, 1), "bottom edge, column {k}");
        assert_eq!(at(k, n + 1), sy * at(k, n), "top edge, column {k}");
    }
    assert_eq!(at(0, 0), 0.5 * (at(1, 0) + at(0, 1)));
    assert_eq!(at(0, n + 1), 0.5 * (at(1, n + 1) + at(0, n)));
    assert_eq!(at(n + 1, 0), 0.5 * (at(n, 0) + at(n + 1, 1)));
    assert_eq!(at(n + 1, n + 1), 0.5 * (at(n, n + 1) + at(n + 1, n)));
}

/// RMS of the central-difference divergence over the interior
pub fn rms_divergence(dims: GridDims, u: &[f32], v: &[f32]) -> f64 {
    let n = dims.n();
    let s = dims.stride();
    let sum_sq: f64 = dims
        .interior()
        .map(|cell| {
            let idx = dims.index(cell.i, cell.j);
            let du = f64::from(u[idx + 1]) - f64::from(u[idx - 1]);
            let dv = f64::from(v[idx + s]) - f64::from(v[idx - s]);
            let div = 0.5 * (du + dv) / n as f64;
            div * div
        })
        .sum();
    (sum_sq / (n * n) as f64).sqrt()
}

/// RMS difference of two fields over the interior
pub fn rms_difference(dims: GridDims, a: &[f32], b: &[f32]) -> f64 {
    let n = dims.n();
    let sum_sq: f64 = dims
        .interior()
        .map(|cell| {
            let idx = dims.index(cell.i, cell.j);
            let d = f64::from(a[idx]) - f64::from(b[idx]);
            d * d
        })
        .sum();
    (sum_sq / (n * n) as f64).sqrt()
}
