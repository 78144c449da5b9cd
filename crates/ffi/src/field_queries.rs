//! FFI query functions for the density and velocity fields.
//!
//! Fields are copied into caller-owned buffers of `(N + 2) * (N + 2)` floats in
//! grid order: cell `(i, j)` is at `i + (N + 2) * j`, border included.

use std::slice;

use stable_fluids_core::FluidSimulation;

use crate::error::{DefaultFluidSimError, FluidSimErrorCode};
use crate::helpers::{ffi_status, instance_from_ptr, with_fluid_sim};
use crate::instance::FluidSimInstance;

/// C-compatible simulation statistics.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FluidSimStats {
    /// Sum of density over the interior
    pub total_density: f64,
    /// Largest interior speed
    pub max_speed: f32,
    /// RMS velocity divergence over the interior
    pub rms_divergence: f32,
    /// Completed ticks
    pub tick: u64,
    /// Simulated time
    pub elapsed: f32,
    /// Wall-clock duration of the last tick (milliseconds)
    pub last_step_ms: f64,
    /// Whether GPU-accelerated
    pub is_gpu: bool,
}

/// Copy `source` into a caller buffer of `len` floats.
///
/// # Safety
/// `out` must be null or valid for `len` writes.
unsafe fn copy_out(
    name: &str,
    source: &[f32],
    out: *mut f32,
    len: usize,
) -> Result<(), DefaultFluidSimError> {
    if out.is_null() {
        return Err(DefaultFluidSimError::null_pointer(name));
    }
    if len < source.len() {
        return Err(DefaultFluidSimError::buffer_too_small(name, len, source.len()));
    }
    // SAFETY: non-null and valid for at least `source.len()` writes
    let target = unsafe { slice::from_raw_parts_mut(out, source.len()) };
    target.copy_from_slice(source);
    Ok(())
}

/// Write the interior size `N` and the number of floats per field.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `fluid_sim_new`.
/// - `out_n` and `out_cells` must be valid output pointers.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_get_grid_size(
    ptr: *const FluidSimInstance,
    out_n: *mut u32,
    out_cells: *mut u32,
) -> FluidSimErrorCode {
    ffi_status(|| {
        if out_n.is_null() || out_cells.is_null() {
            return Err(DefaultFluidSimError::null_pointer("out_n/out_cells"));
        }
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let dims = with_fluid_sim(instance, FluidSimulation::dims)?;
        // SAFETY: checked non-null above
        unsafe {
            *out_n = u32::try_from(dims.n()).unwrap_or(u32::MAX);
            *out_cells = u32::try_from(dims.cell_count()).unwrap_or(u32::MAX);
        }
        Ok(())
    })
}

/// Copy the density field into `out_density`.
///
/// Returns `BufferTooSmall` if `len` is less than `(N + 2)²`.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `fluid_sim_new`.
/// - `out_density` must be valid for `len` float writes.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_copy_density(
    ptr: *const FluidSimInstance,
    out_density: *mut f32,
    len: usize,
) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim(instance, |sim| -> Result<(), DefaultFluidSimError> {
            let density = sim.density()?;
            // SAFETY: forwarded caller contract
            unsafe { copy_out("out_density", &density, out_density, len) }
        })?
    })
}

/// Copy the two velocity components into `out_u` and `out_v`.
///
/// Both buffers must hold `len` floats, at least `(N + 2)²`.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `fluid_sim_new`.
/// - `out_u` and `out_v` must each be valid for `len` float writes.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_copy_velocity(
    ptr: *const FluidSimInstance,
    out_u: *mut f32,
    out_v: *mut f32,
    len: usize,
) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim(instance, |sim| -> Result<(), DefaultFluidSimError> {
            let velocity = sim.velocity()?;
            // SAFETY: forwarded caller contract
            unsafe {
                copy_out("out_u", &velocity.u, out_u, len)?;
                copy_out("out_v", &velocity.v, out_v, len)
            }
        })?
    })
}

/// Fill `out_stats` with diagnostics for the current fields.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `fluid_sim_new`.
/// - `out_stats` must be a valid output pointer.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_get_stats(
    ptr: *const FluidSimInstance,
    out_stats: *mut FluidSimStats,
) -> FluidSimErrorCode {
    ffi_status(|| {
        if out_stats.is_null() {
            return Err(DefaultFluidSimError::null_pointer("out_stats"));
        }
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let stats = with_fluid_sim(instance, |sim| {
            sim.stats().map(|fields| FluidSimStats {
                total_density: fields.total_density,
                max_speed: fields.max_speed,
                rms_divergence: fields.rms_divergence,
                tick: sim.tick(),
                elapsed: sim.elapsed(),
                last_step_ms: sim.last_step_ms(),
                is_gpu: sim.is_gpu_accelerated(),
            })
        })??;
        // SAFETY: checked non-null above
        unsafe {
            *out_stats = stats;
        }
        Ok(())
    })
}
