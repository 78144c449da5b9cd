//! Semi-Lagrangian advection
//!
//! Each interior cell traces back along the carrier velocity for one time step
//! and takes the bilinear interpolation of the previous field at the landing
//! point. The landing point is clamped to `[0.5, N + 0.5]` so the four samples
//! always lie inside the stored grid, border included.

use rayon::prelude::*;

use crate::config::SimulationParams;
use crate::grid::GridDims;

use super::boundary::Boundary;
use super::r#trait::{ComputeBackend, FieldId};

/// Transport `d0` along `(u, v)` into the interior of `d`
///
/// # Arguments
///
/// * `dims` - Grid dimensions
/// * `d` - Destination; only interior cells are written
/// * `d0` - Field being transported
/// * `u`, `v` - Carrier velocity
/// * `dt0` - Time step in cell units (`dt * N`)
///
/// # Panics
///
/// Panics if any buffer is not sized for `dims`
pub fn advect_cell_pass(
    dims: GridDims,
    d: &mut [f32],
    d0: &[f32],
    u: &[f32],
    v: &[f32],
    dt0: f32,
) {
    assert_eq!(d0.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(u.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(v.len(), dims.cell_count(), "Field size mismatch");

    let n = dims.n();
    let s = dims.stride();
    let upper = n as f32 + 0.5;

    dims.par_interior_rows(d).for_each(|(j, row)| {
        for i in 1..=n {
            let idx = i + s * j;
            let x = (i as f32 - dt0 * u[idx]).clamp(0.5, upper);
            let y = (j as f32 - dt0 * v[idx]).clamp(0.5, upper);

            let i0 = x as usize;
            let i1 = i0 + 1;
            let j0 = y as usize;
            let j1 = j0 + 1;

            let s1 = x - i0 as f32;
            let s0 = 1.0 - s1;
            let t1 = y - j0 as f32;
            let t0 = 1.0 - t1;

            row[i] = s0 * (t0 * d0[i0 + s * j0] + t1 * d0[i0 + s * j1])
                + s1 * (t0 * d0[i1 + s * j0] + t1 * d0[i1 + s * j1]);
        }
    });
}

/// Advect `d0` into `d` and enforce `boundary` on the result
///
/// # Arguments
///
/// * `backend` - Compute backend holding the fields
/// * `params` - Supplies `dt`
/// * `boundary` - Reflection rule for `d`
/// * `d` - Destination field
/// * `d0` - Field being transported
/// * `u`, `v` - Carrier velocity
pub fn advect(
    backend: &mut dyn ComputeBackend,
    params: &SimulationParams,
    boundary: Boundary,
    d: FieldId,
    d0: FieldId,
    u: FieldId,
    v: FieldId,
) {
    let dt0 = params.dt * backend.dims().n() as f32;
    backend.advect_pass(d, d0, u, v, dt0);
    backend.enforce_boundary(d, boundary);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_velocity_is_identity() {
        let dims = GridDims::new(6);
        let d0: Vec<f32> = (0..dims.cell_count()).map(|k| (k * 13 % 11) as f32).collect();
        let zero = vec![0.0; dims.cell_count()];
        let mut d = vec![0.0; dims.cell_count()];
        advect_cell_pass(dims, &mut d, &d0, &zero, &zero, 0.6);
        for cell in dims.interior() {
            let idx = dims.index(cell.i, cell.j);
            assert_eq!(d[idx], d0[idx]);
        }
    }

    #[test]
    fn test_uniform_shift_by_whole_cell() {
        let dims = GridDims::new(8);
        let mut d0 = vec![0.0; dims.cell_count()];
        d0[dims.index(4, 4)] = 1.0;
        let u = vec![1.0; dims.cell_count()];
        let v = vec![0.0; dims.cell_count()];
        let mut d = vec![0.0; dims.cell_count()];
        advect_cell_pass(dims, &mut d, &d0, &u, &v, 1.0);
        assert_eq!(d[dims.index(5, 4)], 1.0);
        assert_eq!(d[dims.index(4, 4)], 0.0);
    }

    #[test]
    fn test_half_cell_shift_interpolates() {
        let dims = GridDims::new(8);
        let mut d0 = vec![0.0; dims.cell_count()];
        d0[dims.index(4, 4)] = 1.0;
        let u = vec![0.0; dims.cell_count()];
        let v = vec![0.5; dims.cell_count()];
        let mut d = vec![0.0; dims.cell_count()];
        advect_cell_pass(dims, &mut d, &d0, &u, &v, 1.0);
        assert_eq!(d[dims.index(4, 4)], 0.5);
        assert_eq!(d[dims.index(4, 5)], 0.5);
    }

    #[test]
    fn test_backtrace_clamped_inside_grid() {
        let dims = GridDims::new(4);
        let d0 = vec![2.0; dims.cell_count()];
        let u = vec![1.0e6; dims.cell_count()];
        let v = vec![-1.0e6; dims.cell_count()];
        let mut d = vec![0.0; dims.cell_count()];
        advect_cell_pass(dims, &mut d, &d0, &u, &v, 1.0);
        for cell in dims.interior() {
            assert_eq!(d[dims.index(cell.i, cell.j)], 2.0);
        }
    }

    #[test]
    fn test_border_left_alone() {
        let dims = GridDims::new(4);
        let d0 = vec![1.0; dims.cell_count()];
        let zero = vec![0.0; dims.cell_count()];
        let mut d = vec![-3.0; dims.cell_count()];
        advect_cell_pass(dims, &mut d, &d0, &zero, &zero, 0.4);
        assert_eq!(d[dims.index(0, 2)], -3.0);
        assert_eq!(d[dims.index(2, 5)], -3.0);
    }
}
