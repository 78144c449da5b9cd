//! CPU-based compute backend
//!
//! This module provides a CPU implementation of the `ComputeBackend` trait using
//! `Vec<f32>` fields and Rayon for parallelism. This backend is always available
//! and serves as a fallback when GPU acceleration is not available.
//!
//! Kernels that write a field take its buffer out of the field table for the
//! duration of the call, so inputs can be borrowed from the table while the
//! output is mutated. Aliasing an input with an output is rejected up front.

use std::borrow::Cow;

use tracing::debug;

use crate::error::BackendError;
use crate::grid::{FieldData, GridDims};

use super::advection::advect_cell_pass;
use super::boundary::{enforce_boundary, Boundary};
use super::projection::{divergence_pass, subtract_gradient_pass};
use super::r#trait::{assert_writes_unaliased, ComputeBackend, FieldId, FieldSlots, FIELD_COUNT};
use super::relaxation::relax_sweep;

/// CPU compute backend using Rayon for parallelism
pub struct CpuBackend {
    // Physical buffers, addressed through `slots`
    fields: Vec<FieldData>,
    slots: FieldSlots,
    // Snapshot buffer for relaxation half passes
    scratch: FieldData,
    dims: GridDims,
}

impl CpuBackend {
    /// Create a CPU backend with all fields zeroed
    ///
    /// # Arguments
    ///
    /// * `dims` - Grid dimensions
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Allocation`] if field storage cannot be reserved
    pub fn new(dims: GridDims) -> Result<Self, BackendError> {
        let total_bytes = dims.field_bytes() * (FIELD_COUNT + 1);
        let allocate = || {
            FieldData::try_new(dims).map_err(|_| BackendError::Allocation { bytes: total_bytes })
        };

        let mut fields = Vec::with_capacity(FIELD_COUNT);
        for _ in 0..FIELD_COUNT {
            fields.push(allocate()?);
        }
        let scratch = allocate()?;

        debug!(
            "CPU backend allocated {} fields of {}x{} cells ({} bytes)",
            FIELD_COUNT + 1,
            dims.stride(),
            dims.stride(),
            total_bytes
        );

        Ok(Self {
            fields,
            slots: FieldSlots::identity(),
            scratch,
            dims,
        })
    }

    #[inline]
    fn data(&self, field: FieldId) -> &[f32] {
        self.fields[self.slots.physical(field)].as_slice()
    }

    #[inline]
    fn field_mut(&mut self, field: FieldId) -> &mut FieldData {
        let slot = self.slots.physical(field);
        &mut self.fields[slot]
    }

    /// Move a field's buffer out of the table, leaving an empty placeholder
    fn take(&mut self, field: FieldId) -> FieldData {
        let slot = self.slots.physical(field);
        let data = std::mem::take(&mut self.fields[slot].data);
        FieldData::from_vec(self.dims, data)
    }

    fn restore(&mut self, field: FieldId, data: FieldData) {
        let slot = self.slots.physical(field);
        self.fields[slot] = data;
    }
}

impl ComputeBackend for CpuBackend {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn zero(&mut self, field: FieldId) {
        self.field_mut(field).fill(0.0);
    }

    fn scatter(&mut self, field: FieldId, values: &[(usize, f32)]) {
        let len = self.dims.cell_count();
        let data = self.field_mut(field).as_mut_slice();
        for &(idx, value) in values {
            assert!(idx < len, "Scatter index {idx} outside field of {len} cells");
            data[idx] = value;
        }
    }

    fn write_field(&mut self, field: FieldId, data: &[f32]) {
        assert_eq!(data.len(), self.dims.cell_count(), "Field size mismatch");
        self.field_mut(field).as_mut_slice().copy_from_slice(data);
    }

    fn add_source(&mut self, target: FieldId, source: FieldId, dt: f32) {
        assert_writes_unaliased("add_source", &[target], &[source]);
        let mut x = self.take(target);
        x.add_scaled(self.data(source), dt);
        self.restore(target, x);
    }

    fn relax_sweep(&mut self, x: FieldId, x0: FieldId, a: f32, c: f32) {
        assert_writes_unaliased("relax", &[x], &[x0]);
        let mut out = self.take(x);
        let mut scratch = std::mem::take(&mut self.scratch.data);
        relax_sweep(
            self.dims,
            out.as_mut_slice(),
            &mut scratch,
            self.data(x0),
            a,
            c,
        );
        self.scratch.data = scratch;
        self.restore(x, out);
    }

    fn enforce_boundary(&mut self, field: FieldId, boundary: Boundary) {
        let dims = self.dims;
        enforce_boundary(dims, boundary, self.field_mut(field).as_mut_slice());
    }

    fn advect_pass(&mut self, d: FieldId, d0: FieldId, u: FieldId, v: FieldId, dt0: f32) {
        assert_writes_unaliased("advect", &[d], &[d0, u, v]);
        let mut out = self.take(d);
        advect_cell_pass(
            self.dims,
            out.as_mut_slice(),
            self.data(d0),
            self.data(u),
            self.data(v),
            dt0,
        );
        self.restore(d, out);
    }

    fn divergence_pass(&mut self, u: FieldId, v: FieldId, p: FieldId, div: FieldId) {
        assert_writes_unaliased("divergence", &[p, div], &[u, v]);
        let mut p_out = self.take(p);
        let mut div_out = self.take(div);
        divergence_pass(
            self.dims,
            self.data(u),
            self.data(v),
            p_out.as_mut_slice(),
            div_out.as_mut_slice(),
        );
        self.restore(div, div_out);
        self.restore(p, p_out);
    }

    fn subtract_gradient_pass(&mut self, u: FieldId, v: FieldId, p: FieldId) {
        assert_writes_unaliased("gradient", &[u, v], &[p]);
        let mut u_out = self.take(u);
        let mut v_out = self.take(v);
        subtract_gradient_pass(
            self.dims,
            u_out.as_mut_slice(),
            v_out.as_mut_slice(),
            self.data(p),
        );
        self.restore(v, v_out);
        self.restore(u, u_out);
    }

    fn swap(&mut self, a: FieldId, b: FieldId) {
        self.slots.swap(a, b);
    }

    fn read_field(&self, field: FieldId) -> Result<Cow<'_, [f32]>, BackendError> {
        Ok(Cow::Borrowed(self.data(field)))
    }

    fn is_gpu_accelerated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(n: usize) -> CpuBackend {
        CpuBackend::new(GridDims::new(n)).expect("small allocation")
    }

    #[test]
    fn test_cpu_backend_creation() {
        let cpu = backend(8);
        assert_eq!(cpu.dims().n(), 8);
        assert!(!cpu.is_gpu_accelerated());
        for field in FieldId::ALL {
            let data = cpu.read_field(field).expect("cpu read");
            assert_eq!(data.len(), 100);
            assert!(data.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_swap_exchanges_contents() {
        let mut cpu = backend(2);
        cpu.write_field(FieldId::Density, &[1.0; 16]);
        cpu.swap(FieldId::Density, FieldId::DensityPrev);
        assert!(cpu.read_field(FieldId::Density).expect("read").iter().all(|&v| v == 0.0));
        assert!(cpu
            .read_field(FieldId::DensityPrev)
            .expect("read")
            .iter()
            .all(|&v| v == 1.0));
    }

    #[test]
    fn test_writes_follow_swapped_slot() {
        let mut cpu = backend(2);
        cpu.swap(FieldId::VelocityX, FieldId::VelocityXPrev);
        cpu.scatter(FieldId::VelocityX, &[(5, 2.0)]);
        cpu.swap(FieldId::VelocityX, FieldId::VelocityXPrev);
        assert_eq!(cpu.read_field(FieldId::VelocityXPrev).expect("read")[5], 2.0);
        assert_eq!(cpu.read_field(FieldId::VelocityX).expect("read")[5], 0.0);
    }

    #[test]
    fn test_add_source() {
        let mut cpu = backend(2);
        cpu.write_field(FieldId::Density, &[1.0; 16]);
        cpu.write_field(FieldId::DensityPrev, &[4.0; 16]);
        cpu.add_source(FieldId::Density, FieldId::DensityPrev, 0.5);
        assert!(cpu.read_field(FieldId::Density).expect("read").iter().all(|&v| v == 3.0));
        assert!(cpu.read_field(FieldId::DensityPrev).expect("read").iter().all(|&v| v == 4.0));
    }

    #[test]
    fn test_zero_clears_field() {
        let mut cpu = backend(3);
        cpu.write_field(FieldId::VelocityY, &[2.5; 25]);
        cpu.zero(FieldId::VelocityY);
        assert!(cpu.read_field(FieldId::VelocityY).expect("read").iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_self_advection_reads_carrier_twice() {
        let mut cpu = backend(4);
        let dims = cpu.dims();
        cpu.write_field(FieldId::VelocityXPrev, &vec![1.0; dims.cell_count()]);
        cpu.advect_pass(
            FieldId::VelocityX,
            FieldId::VelocityXPrev,
            FieldId::VelocityXPrev,
            FieldId::VelocityYPrev,
            0.5,
        );
        let u = cpu.read_field(FieldId::VelocityX).expect("read");
        for cell in dims.interior() {
            approx::assert_relative_eq!(u[dims.index(cell.i, cell.j)], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "bound more than once")]
    fn test_advect_rejects_aliased_fields() {
        let mut cpu = backend(4);
        cpu.advect_pass(
            FieldId::Density,
            FieldId::Density,
            FieldId::VelocityX,
            FieldId::VelocityY,
            0.1,
        );
    }

    #[test]
    #[should_panic(expected = "outside field")]
    fn test_scatter_rejects_out_of_range_index() {
        let mut cpu = backend(2);
        cpu.scatter(FieldId::Density, &[(16, 1.0)]);
    }
}
