//! Red-black Gauss–Seidel relaxation
//!
//! Solves `c * x[i,j] - a * (x[i-1,j] + x[i+1,j] + x[i,j-1] + x[i,j+1]) = x0[i,j]`
//! over the interior. Cells are coloured by `(i + j) % 2`; a red cell only
//! neighbours black cells and vice versa, so each half pass updates one colour
//! in parallel from values the other colour finished in the previous half.

use rayon::prelude::*;

use crate::grid::GridDims;

use super::boundary::Boundary;
use super::r#trait::{ComputeBackend, FieldId};

/// Cell colour for one half pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    /// Cells with even `i + j`
    Red,
    /// Cells with odd `i + j`
    Black,
}

impl Parity {
    /// Both colours in sweep order
    pub const SWEEP: [Parity; 2] = [Parity::Red, Parity::Black];

    /// `(i + j) % 2` of the cells this colour covers
    #[must_use]
    pub const fn remainder(self) -> usize {
        match self {
            Parity::Red => 0,
            Parity::Black => 1,
        }
    }

    /// First interior column of this colour in row `j`
    #[inline]
    const fn first_column(self, j: usize) -> usize {
        if (1 + j) % 2 == self.remainder() {
            1
        } else {
            2
        }
    }
}

/// One half pass over the cells of `parity`
///
/// Neighbours are read from `frozen`, a snapshot of `x` taken before the pass.
/// Only cells of the active colour are written, and those read only cells of the
/// other colour, so the result equals an in-place update.
///
/// # Arguments
///
/// * `dims` - Grid dimensions
/// * `x` - Unknowns, updated in place
/// * `frozen` - Snapshot of `x` before this half pass
/// * `x0` - Right-hand side
/// * `a` - Neighbour coupling
/// * `c` - Diagonal divisor
/// * `parity` - Colour to update
///
/// # Panics
///
/// Panics if any buffer is not sized for `dims`
pub fn relax_half_pass(
    dims: GridDims,
    x: &mut [f32],
    frozen: &[f32],
    x0: &[f32],
    a: f32,
    c: f32,
    parity: Parity,
) {
    assert_eq!(frozen.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(x0.len(), dims.cell_count(), "Field size mismatch");

    let n = dims.n();
    let s = dims.stride();

    dims.par_interior_rows(x).for_each(|(j, row)| {
        for i in (parity.first_column(j)..=n).step_by(2) {
            let idx = i + s * j;
            let neighbors =
                frozen[idx - 1] + frozen[idx + 1] + frozen[idx - s] + frozen[idx + s];
            row[i] = (x0[idx] + a * neighbors) / c;
        }
    });
}

/// One full sweep (red then black) on host buffers
///
/// `scratch` holds the snapshot the half passes read from. It is refreshed in
/// full once per sweep, since boundary enforcement between sweeps rewrites the
/// ghost border. Between the two half passes only the red cells changed, so only
/// those are copied across.
///
/// # Panics
///
/// Panics if any buffer is not sized for `dims`
pub fn relax_sweep(
    dims: GridDims,
    x: &mut [f32],
    scratch: &mut [f32],
    x0: &[f32],
    a: f32,
    c: f32,
) {
    assert_eq!(x.len(), dims.cell_count(), "Field size mismatch");
    assert_eq!(scratch.len(), dims.cell_count(), "Field size mismatch");

    let s = dims.stride();
    scratch
        .par_chunks_mut(s)
        .zip(x.par_chunks(s))
        .for_each(|(snapshot, row)| snapshot.copy_from_slice(row));

    relax_half_pass(dims, x, scratch, x0, a, c, Parity::Red);
    sync_colour(dims, scratch, x, Parity::Red);
    relax_half_pass(dims, x, scratch, x0, a, c, Parity::Black);
}

/// Copy the interior cells of one colour from `x` into `snapshot`
fn sync_colour(dims: GridDims, snapshot: &mut [f32], x: &[f32], parity: Parity) {
    let n = dims.n();
    let s = dims.stride();
    dims.par_interior_rows(snapshot).for_each(|(j, row)| {
        for i in (parity.first_column(j)..=n).step_by(2) {
            row[i] = x[i + s * j];
        }
    });
}

/// Fixed-count relaxation with boundary enforcement after every sweep
///
/// # Arguments
///
/// * `backend` - Compute backend holding the fields
/// * `x` - Unknowns; current contents are the initial guess
/// * `x0` - Right-hand side
/// * `a` - Neighbour coupling
/// * `c` - Diagonal divisor
/// * `boundary` - Rule applied to `x` after each sweep
/// * `iterations` - Number of sweeps
pub fn lin_solve(
    backend: &mut dyn ComputeBackend,
    x: FieldId,
    x0: FieldId,
    a: f32,
    c: f32,
    boundary: Boundary,
    iterations: u32,
) {
    for _ in 0..iterations {
        backend.relax_sweep(x, x0, a, c);
        backend.enforce_boundary(x, boundary);
    }
}
