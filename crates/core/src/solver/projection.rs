//! Pressure projection
//!
//! Removes the divergent part of the velocity field: compute the divergence,
//! solve the Poisson equation for a pressure-like potential by relaxation, then
//! subtract its gradient. Central differences are used throughout.

use rayon::prelude::*;

use crate::config::SimulationParams;
use crate::grid::GridDims;

use super::boundary::Boundary;
use super::r#trait::{ComputeBackend, FieldId};
use super::relaxation::lin_solve;

/// Write `div = -0.5 * (∂u/∂x + ∂v/∂y) / N` and `p = 0` over the interior
///
/// # Panics
///
/// Panics if any buffer is not sized for `dims`
pub fn divergence_pass(dims: GridDims, u: &[f32], v: &[f32], p: &mut [f32], div: &mut [f32]) {
    assert_eq!(u.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(v.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(p.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(div.len(), dims.cell_count(), "Field size mismatch");

    let n = dims.n();
    let s = dims.stride();
    let nf = n as f32;

    p.par_chunks_mut(s)
        .zip(div.par_chunks_mut(s))
        .enumerate()
        .skip(1)
        .take(n)
        .for_each(|(j, (p_row, div_row))| {
            for i in 1..=n {
                let idx = i + s * j;
                div_row[i] = -0.5 * (u[idx + 1] - u[idx - 1] + v[idx + s] - v[idx - s]) / nf;
                p_row[i] = 0.0;
            }
        });
}

/// Subtract the central-difference gradient of `p` from the interior of `u` and `v`
///
/// # Panics
///
/// Panics if any buffer is not sized for `dims`
pub fn subtract_gradient_pass(dims: GridDims, u: &mut [f32], v: &mut [f32], p: &[f32]) {
    assert_eq!(u.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(v.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(p.len(), dims.cell_count(), "Field size mismatch");

    let n = dims.n();
    let s = dims.stride();
    let nf = n as f32;

    u.par_chunks_mut(s)
        .zip(v.par_chunks_mut(s))
        .enumerate()
        .skip(1)
        .take(n)
        .for_each(|(j, (u_row, v_row))| {
            for i in 1..=n {
                let idx = i + s * j;
                u_row[i] -= 0.5 * nf * (p[idx + 1] - p[idx - 1]);
                v_row[i] -= 0.5 * nf * (p[idx + s] - p[idx - s]);
            }
        });
}

/// Make `(u, v)` approximately divergence free
///
/// `p` and `div` are scratch fields; both are overwritten.
///
/// # Arguments
///
/// * `backend` - Compute backend holding the fields
/// * `params` - Supplies the sweep count
/// * `u`, `v` - Velocity, corrected in place
/// * `p` - Scratch for the potential
/// * `div` - Scratch for the divergence
pub fn project(
    backend: &mut dyn ComputeBackend,
    params: &SimulationParams,
    u: FieldId,
    v: FieldId,
    p: FieldId,
    div: FieldId,
) {
    backend.divergence_pass(u, v, p, div);
    backend.enforce_boundary(div, Boundary::Scalar);
    backend.enforce_boundary(p, Boundary::Scalar);

    lin_solve(
        backend,
        p,
        div,
        1.0,
        4.0,
        Boundary::Scalar,
        params.relaxation_iterations,
    );

    backend.subtract_gradient_pass(u, v, p);
    backend.enforce_boundary(u, Boundary::VelocityX);
    backend.enforce_boundary(v, Boundary::VelocityY);
}
