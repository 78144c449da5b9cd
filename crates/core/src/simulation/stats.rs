//! Read-side views and diagnostics

use std::borrow::Cow;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::grid::{interior_sum, GridDims};

/// Both velocity components, as read back from the backend
#[derive(Debug, Clone)]
pub struct VelocityField<'a> {
    dims: GridDims,
    /// Horizontal component, grid order
    pub u: Cow<'a, [f32]>,
    /// Vertical component, grid order
    pub v: Cow<'a, [f32]>,
}

impl<'a> VelocityField<'a> {
    pub(crate) fn new(dims: GridDims, u: Cow<'a, [f32]>, v: Cow<'a, [f32]>) -> Self {
        Self { dims, u, v }
    }

    /// Grid dimensions
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Velocity at `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn at(&self, i: usize, j: usize) -> Vector2<f32> {
        let idx = self.dims.index(i, j);
        Vector2::new(self.u[idx], self.v[idx])
    }

    /// Largest speed over the interior
    #[must_use]
    pub fn max_speed(&self) -> f32 {
        self.dims
            .interior()
            .map(|cell| self.at(cell.i, cell.j).norm())
            .fold(0.0, f32::max)
    }

    /// Root-mean-square of the central-difference divergence over the interior
    ///
    /// Uses the same `0.5 * (du/dx + dv/dy) / N` discretisation as projection.
    #[must_use]
    pub fn rms_divergence(&self) -> f32 {
        let n = self.dims.n();
        let s = self.dims.stride();
        let nf = n as f64;
        let sum_sq: f64 = self
            .dims
            .interior()
            .map(|cell| {
                let idx = self.dims.index(cell.i, cell.j);
                let du = f64::from(self.u[idx + 1]) - f64::from(self.u[idx - 1]);
                let dv = f64::from(self.v[idx + s]) - f64::from(self.v[idx - s]);
                let div = 0.5 * (du + dv) / nf;
                div * div
            })
            .sum();
        (sum_sq / (nf * nf)).sqrt() as f32
    }
}

/// Summary of the current field state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Sum of density over the interior
    pub total_density: f64,
    /// Largest speed over the interior
    pub max_speed: f32,
    /// RMS velocity divergence over the interior
    pub rms_divergence: f32,
}

impl FieldStats {
    /// Compute statistics from host copies of the fields
    #[must_use]
    pub fn compute(density: &[f32], velocity: &VelocityField<'_>) -> Self {
        Self {
            total_density: interior_sum(velocity.dims(), density),
            max_speed: velocity.max_speed(),
            rms_divergence: velocity.rms_divergence(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_flow_has_no_divergence() {
        let dims = GridDims::new(6);
        let u = vec![3.0; dims.cell_count()];
        let v = vec![4.0; dims.cell_count()];
        let field = VelocityField::new(dims, Cow::Owned(u), Cow::Owned(v));
        assert_eq!(field.rms_divergence(), 0.0);
        assert_relative_eq!(field.max_speed(), 5.0);
        assert_eq!(field.at(2, 3), Vector2::new(3.0, 4.0));
    }

    #[test]
    fn test_expanding_flow_divergence() {
        let dims = GridDims::new(4);
        let mut u = vec![0.0; dims.cell_count()];
        for j in 0..dims.stride() {
            for i in 0..dims.stride() {
                u[dims.index(i, j)] = i as f32;
            }
        }
        let v = vec![0.0; dims.cell_count()];
        let field = VelocityField::new(dims, Cow::Owned(u), Cow::Owned(v));
        // 0.5 * 2 / 4 everywhere in the interior
        assert_relative_eq!(field.rms_divergence(), 0.25);
    }

    #[test]
    fn test_stats_total_density() {
        let dims = GridDims::new(3);
        let mut density = vec![100.0; dims.cell_count()];
        for cell in dims.interior() {
            density[dims.index(cell.i, cell.j)] = 2.0;
        }
        let zero = vec![0.0; dims.cell_count()];
        let field = VelocityField::new(dims, Cow::Borrowed(&zero), Cow::Borrowed(&zero));
        let stats = FieldStats::compute(&density, &field);
        assert_relative_eq!(stats.total_density, 18.0);
        assert_eq!(stats.max_speed, 0.0);
    }
}
