use nalgebra::Vector2;
use stable_fluids_core::{FluidSimulation, Input};

use crate::error::FluidSimErrorCode;
use crate::helpers::{ffi_status, instance_from_ptr, with_fluid_sim_mut};
use crate::instance::{FluidSimInstance, FluidSimParams};

/// Advance the simulation by one tick of `dt`.
///
/// Pending force and density inputs are consumed by this tick.
///
/// Thread-safe: acquires `RwLock` write lock for simulation update.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `fluid_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_step(ptr: *const FluidSimInstance) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim_mut(instance, FluidSimulation::step)
    })
}

/// Queue a velocity impulse `(fx, fy)` at interior cell `(i, j)` for the next tick.
///
/// Impulses on the same cell add up; the sum is scaled by `params.force`.
///
/// Returns `CellOutOfRange` unless `1 <= i, j <= N`, `InvalidParameter` if the
/// force is not finite.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `fluid_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_apply_force(
    ptr: *const FluidSimInstance,
    i: u32,
    j: u32,
    fx: f32,
    fy: f32,
) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim_mut(instance, |sim| {
            sim.apply_input((i as usize, j as usize), Input::Force(Vector2::new(fx, fy)))
        })??;
        Ok(())
    })
}

/// Queue a density injection of `amount` at interior cell `(i, j)` for the next tick.
///
/// Injections on the same cell add up; the sum is scaled by `params.source`.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `fluid_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_apply_density(
    ptr: *const FluidSimInstance,
    i: u32,
    j: u32,
    amount: f32,
) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim_mut(instance, |sim| {
            sim.apply_input((i as usize, j as usize), Input::Density(amount))
        })??;
        Ok(())
    })
}

/// Zero every field and drop pending input.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `fluid_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_clear(ptr: *const FluidSimInstance) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim_mut(instance, FluidSimulation::clear)
    })
}

/// Replace the parameters used by subsequent ticks.
///
/// `grid_size` must match the instance; the grid cannot be resized.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `fluid_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_set_params(
    ptr: *const FluidSimInstance,
    params: FluidSimParams,
) -> FluidSimErrorCode {
    ffi_status(|| {
        // SAFETY: forwarded caller contract
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_fluid_sim_mut(instance, |sim| sim.set_params(params.into()))??;
        Ok(())
    })
}
