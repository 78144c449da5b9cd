//! Implicit diffusion
//!
//! Backward Euler on the 5-point Laplacian: `x - dt * rate * N² * ∇²x = x0`,
//! solved by relaxation. Stable for any `dt` and `rate`.

use crate::config::SimulationParams;

use super::boundary::Boundary;
use super::r#trait::{ComputeBackend, FieldId};
use super::relaxation::lin_solve;

/// Diffuse `x0` into `x` at `rate`
///
/// # Arguments
///
/// * `backend` - Compute backend holding the fields
/// * `params` - Time step and sweep count
/// * `boundary` - Reflection rule for the field being diffused
/// * `x` - Result, its current contents seed the relaxation
/// * `x0` - Field before diffusion
/// * `rate` - Diffusion coefficient (`diffusion` or `viscosity`)
pub fn diffuse(
    backend: &mut dyn ComputeBackend,
    params: &SimulationParams,
    boundary: Boundary,
    x: FieldId,
    x0: FieldId,
    rate: f32,
) {
    let n = backend.dims().n() as f32;
    let a = params.dt * rate * n * n;
    lin_solve(
        backend,
        x,
        x0,
        a,
        1.0 + 4.0 * a,
        boundary,
        params.relaxation_iterations,
    );
}
