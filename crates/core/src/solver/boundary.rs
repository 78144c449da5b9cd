//! Boundary enforcement on the ghost border
//!
//! The domain is a closed box. Scalars copy their nearest interior value onto
//! the border. The velocity component normal to a wall is mirrored with opposite
//! sign, so its average across the wall is zero and nothing flows through.
//! Corners take the mean of their two edge neighbours.

use crate::grid::GridDims;

/// Which reflection rule a field obeys at the walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Copy interior values outward on every edge
    Scalar,
    /// Negate on the left and right walls
    VelocityX,
    /// Negate on the bottom and top walls
    VelocityY,
}

impl Boundary {
    /// Integer tag used by the GPU kernels (0, 1, 2)
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Boundary::Scalar => 0,
            Boundary::VelocityX => 1,
            Boundary::VelocityY => 2,
        }
    }

    /// Sign applied on the left (`i = 0`) and right (`i = N+1`) columns
    #[inline]
    #[must_use]
    pub const fn vertical_wall_sign(self) -> f32 {
        match self {
            Boundary::VelocityX => -1.0,
            _ => 1.0,
        }
    }

    /// Sign applied on the bottom (`j = 0`) and top (`j = N+1`) rows
    #[inline]
    #[must_use]
    pub const fn horizontal_wall_sign(self) -> f32 {
        match self {
            Boundary::VelocityY => -1.0,
            _ => 1.0,
        }
    }
}

/// Rewrite the ghost border of `x` from its interior
///
/// Edges are written first and corners last, so corners average the edge
/// values produced in the same call.
///
/// # Arguments
///
/// * `dims` - Grid dimensions
/// * `boundary` - Reflection rule
/// * `x` - Field to update
///
/// # Panics
///
/// Panics if `x` is not sized for `dims`
pub fn enforce_boundary(dims: GridDims, boundary: Boundary, x: &mut [f32]) {
    assert_eq!(x.len(), dims.cell_count(), "Field size mismatch");

    let n = dims.n();
    let s = dims.stride();
    let sx = boundary.vertical_wall_sign();
    let sy = boundary.horizontal_wall_sign();

    for k in 1..=n {
        x[s * k] = sx * x[1 + s * k];
        x[(n + 1) + s * k] = sx * x[n + s * k];
        x[k] = sy * x[k + s];
        x[k + s * (n + 1)] = sy * x[k + s * n];
    }

    x[0] = 0.5 * (x[1] + x[s]);
    x[s * (n + 1)] = 0.5 * (x[1 + s * (n + 1)] + x[s * n]);
    x[n + 1] = 0.5 * (x[n] + x[(n + 1) + s]);
    x[(n + 1) + s * (n + 1)] = 0.5 * (x[n + s * (n + 1)] + x[(n + 1) + s * n]);
}
