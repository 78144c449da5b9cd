//! Compute backend trait definition
//!
//! This module defines the `ComputeBackend` trait, the data-parallel primitives
//! every stage of the solver is written against. The stages themselves
//! (relaxation loop, diffusion, advection, projection, step ordering) are shared
//! code; a backend only has to run the per-cell kernels over its own storage.
//!
//! Fields are addressed by [`FieldId`]. Each backend keeps six physical buffers
//! and a slot table mapping logical fields onto them, so swapping the current and
//! scratch role of a field is an exchange of two table entries with no copy.

use std::borrow::Cow;

use crate::error::BackendError;
use crate::grid::GridDims;

use super::boundary::Boundary;

/// Logical field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// Dye density
    Density,
    /// Density source, later scratch for density diffusion
    DensityPrev,
    /// Horizontal velocity
    VelocityX,
    /// Horizontal velocity source, later scratch
    VelocityXPrev,
    /// Vertical velocity
    VelocityY,
    /// Vertical velocity source, later scratch
    VelocityYPrev,
}

/// Number of fields a backend stores
pub const FIELD_COUNT: usize = 6;

impl FieldId {
    /// All fields in slot order
    pub const ALL: [FieldId; FIELD_COUNT] = [
        FieldId::Density,
        FieldId::DensityPrev,
        FieldId::VelocityX,
        FieldId::VelocityXPrev,
        FieldId::VelocityY,
        FieldId::VelocityYPrev,
    ];

    /// Slot this field occupies before any swap
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            FieldId::Density => 0,
            FieldId::DensityPrev => 1,
            FieldId::VelocityX => 2,
            FieldId::VelocityXPrev => 3,
            FieldId::VelocityY => 4,
            FieldId::VelocityYPrev => 5,
        }
    }
}

/// Mapping from logical field to physical buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldSlots([usize; FIELD_COUNT]);

impl FieldSlots {
    pub(crate) const fn identity() -> Self {
        Self([0, 1, 2, 3, 4, 5])
    }

    #[inline]
    pub(crate) fn physical(&self, field: FieldId) -> usize {
        self.0[field.ordinal()]
    }

    pub(crate) fn swap(&mut self, a: FieldId, b: FieldId) {
        self.0.swap(a.ordinal(), b.ordinal());
    }
}

/// Panic if a written field is bound anywhere else in one kernel invocation
///
/// Inputs are read-only and may repeat (self-advection reads one velocity
/// component both as the advected quantity and as the carrier). An output shared
/// with any other binding would race on the GPU and alias on the CPU.
pub(crate) fn assert_writes_unaliased(kernel: &str, outputs: &[FieldId], inputs: &[FieldId]) {
    for (k, out) in outputs.iter().enumerate() {
        assert!(
            !outputs[k + 1..].contains(out) && !inputs.contains(out),
            "{kernel}: output field {out:?} bound more than once"
        );
    }
}

/// Backend-agnostic data-parallel primitives for the stable-fluids stages
///
/// Every kernel reads only the fields it names as inputs and writes only the
/// fields it names as outputs. Interior kernels touch cells `1..=N` on both axes;
/// the ghost border is left to [`ComputeBackend::enforce_boundary`].
pub trait ComputeBackend: Send + Sync {
    /// Grid dimensions all six fields share
    fn dims(&self) -> GridDims;

    /// Set every cell of `field` to zero
    fn zero(&mut self, field: FieldId);

    /// Overwrite individual cells of `field`
    ///
    /// # Arguments
    ///
    /// * `field` - Destination field
    /// * `values` - `(linear index, value)` pairs
    fn scatter(&mut self, field: FieldId, values: &[(usize, f32)]);

    /// Replace the whole contents of `field`
    ///
    /// # Panics
    ///
    /// Panics if `data` is not sized for the grid
    fn write_field(&mut self, field: FieldId, data: &[f32]);

    /// `target += dt * source` over every stored cell
    fn add_source(&mut self, target: FieldId, source: FieldId, dt: f32);

    /// One relaxation sweep: a red half pass then a black half pass
    ///
    /// Each interior cell of the active colour becomes
    /// `(x0 + a * (left + right + down + up)) / c`, with neighbours read from `x`.
    ///
    /// # Arguments
    ///
    /// * `x` - Unknowns, updated in place
    /// * `x0` - Right-hand side
    /// * `a` - Neighbour coupling
    /// * `c` - Diagonal divisor
    fn relax_sweep(&mut self, x: FieldId, x0: FieldId, a: f32, c: f32);

    /// Rewrite the ghost border of `field` from its interior
    fn enforce_boundary(&mut self, field: FieldId, boundary: Boundary);

    /// Semi-Lagrangian transport of `d0` into the interior of `d`
    ///
    /// # Arguments
    ///
    /// * `d` - Destination field
    /// * `d0` - Field being transported
    /// * `u`, `v` - Carrier velocity
    /// * `dt0` - Time step in cell units (`dt * N`)
    fn advect_pass(&mut self, d: FieldId, d0: FieldId, u: FieldId, v: FieldId, dt0: f32);

    /// Write the velocity divergence into `div` and zero `p` over the interior
    fn divergence_pass(&mut self, u: FieldId, v: FieldId, p: FieldId, div: FieldId);

    /// Subtract the gradient of `p` from the interior of `u` and `v`
    fn subtract_gradient_pass(&mut self, u: FieldId, v: FieldId, p: FieldId);

    /// Exchange the buffers behind two logical fields
    fn swap(&mut self, a: FieldId, b: FieldId);

    /// Copy of the current contents of `field`
    ///
    /// # Returns
    ///
    /// Field values in grid order. CPU backend returns a borrowed slice, GPU
    /// backend returns an owned `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ReadbackFailed`] if the device copy fails
    fn read_field(&self, field: FieldId) -> Result<Cow<'_, [f32]>, BackendError>;

    /// Check if this backend is using GPU acceleration
    fn is_gpu_accelerated(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_swap_is_involution() {
        let mut slots = FieldSlots::identity();
        slots.swap(FieldId::Density, FieldId::DensityPrev);
        assert_eq!(slots.physical(FieldId::Density), 1);
        assert_eq!(slots.physical(FieldId::DensityPrev), 0);
        slots.swap(FieldId::Density, FieldId::DensityPrev);
        assert_eq!(slots, FieldSlots::identity());
    }

    #[test]
    fn test_ordinals_match_all() {
        for (k, field) in FieldId::ALL.iter().enumerate() {
            assert_eq!(field.ordinal(), k);
        }
    }

    #[test]
    #[should_panic(expected = "output field Density bound more than once")]
    fn test_output_aliasing_an_input_is_rejected() {
        assert_writes_unaliased(
            "advect",
            &[FieldId::Density],
            &[FieldId::VelocityX, FieldId::Density],
        );
    }

    #[test]
    #[should_panic(expected = "output field VelocityX bound more than once")]
    fn test_repeated_output_is_rejected() {
        assert_writes_unaliased("gradient", &[FieldId::VelocityX, FieldId::VelocityX], &[]);
    }

    #[test]
    fn test_repeated_inputs_are_allowed() {
        assert_writes_unaliased(
            "advect",
            &[FieldId::VelocityX],
            &[
                FieldId::VelocityXPrev,
                FieldId::VelocityXPrev,
                FieldId::VelocityYPrev,
            ],
        );
    }
}
