use std::ptr;
use std::sync::RwLock;

use stable_fluids_core::{BackendPreference, FluidSimulation, SimulationParams};

use crate::error::{DefaultFluidSimError, FluidSimErrorCode};
use crate::helpers::{track_error, track_result};

/// C-compatible simulation parameters.
///
/// Obtain defaults from `fluid_sim_default_params` and override fields as needed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidSimParams {
    /// Interior cells per side (N)
    pub grid_size: u32,
    /// Time step per tick
    pub dt: f32,
    /// Density diffusion rate
    pub diffusion: f32,
    /// Velocity viscosity
    pub viscosity: f32,
    /// Scale applied to force inputs
    pub force: f32,
    /// Scale applied to density inputs
    pub source: f32,
    /// Relaxation sweeps per linear solve
    pub relaxation_iterations: u32,
}

impl From<SimulationParams> for FluidSimParams {
    fn from(params: SimulationParams) -> Self {
        Self {
            grid_size: u32::try_from(params.grid_size).unwrap_or(u32::MAX),
            dt: params.dt,
            diffusion: params.diffusion,
            viscosity: params.viscosity,
            force: params.force,
            source: params.source,
            relaxation_iterations: params.relaxation_iterations,
        }
    }
}

impl From<FluidSimParams> for SimulationParams {
    fn from(params: FluidSimParams) -> Self {
        SimulationParams {
            grid_size: params.grid_size as usize,
            dt: params.dt,
            diffusion: params.diffusion,
            viscosity: params.viscosity,
            force: params.force,
            source: params.source,
            relaxation_iterations: params.relaxation_iterations,
        }
    }
}

/// Which compute backend to run on.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluidSimBackend {
    /// GPU when available, CPU otherwise
    Auto = 0,
    /// Always the CPU
    Cpu = 1,
    /// GPU only; creation fails without a usable adapter
    Gpu = 2,
}

impl From<FluidSimBackend> for BackendPreference {
    fn from(backend: FluidSimBackend) -> Self {
        match backend {
            FluidSimBackend::Auto => BackendPreference::Auto,
            FluidSimBackend::Cpu => BackendPreference::Cpu,
            FluidSimBackend::Gpu => BackendPreference::Gpu,
        }
    }
}

/// The fluid simulation context.
///
/// # Thread Safety
/// The simulation is protected by an `RwLock`: field reads and statistics take a
/// shared lock, stepping and input take an exclusive one. A render thread can
/// copy fields out while the game thread queues input for the next tick.
pub struct FluidSimInstance {
    pub(crate) sim: RwLock<FluidSimulation>,
}

impl FluidSimInstance {
    pub(crate) fn new(
        params: FluidSimParams,
        backend: FluidSimBackend,
    ) -> Result<Self, DefaultFluidSimError> {
        let sim = FluidSimulation::new(params.into(), backend.into())?;
        Ok(Self {
            sim: RwLock::new(sim),
        })
    }
}

/// Default parameters: 64x64 grid, dt 0.1, no diffusion or viscosity,
/// force 5, source 100, 20 relaxation sweeps.
#[no_mangle]
pub extern "C" fn fluid_sim_default_params() -> FluidSimParams {
    SimulationParams::default().into()
}

/// Create a new fluid simulation and return it via out-parameter.
///
/// Every field starts at zero.
///
/// Returns
/// - `FluidSimErrorCode::Ok` (0): success, `out_instance` contains valid pointer
/// - `FluidSimErrorCode::NullPointer`: `out_instance` is null
/// - `FluidSimErrorCode::InvalidParameter`: a parameter is out of range
/// - `FluidSimErrorCode::BackendUnavailable`: `Gpu` requested without a usable GPU
/// - `FluidSimErrorCode::AllocationFailed`: field storage could not be reserved
///
/// On failure `out_instance` is set to null; call `fluid_sim_get_last_error()`
/// for a description.
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller takes ownership of the returned instance and MUST call
///   `fluid_sim_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_new(
    params: FluidSimParams,
    backend: FluidSimBackend,
    out_instance: *mut *mut FluidSimInstance,
) -> FluidSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultFluidSimError::null_pointer("out_instance"));
    }

    match track_result(FluidSimInstance::new(params, backend)) {
        Ok(instance) => {
            // SAFETY: checked non-null above, caller guarantees it is writable
            unsafe {
                *out_instance = Box::into_raw(Box::new(instance));
            }
            FluidSimErrorCode::Ok
        }
        Err(code) => {
            // SAFETY: as above
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroys an instance previously created by `fluid_sim_new`, releasing all
/// field storage.
///
/// If `ptr` is null this function is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `fluid_sim_new`.
/// - The pointer MUST NOT have been freed already.
/// - After calling this function, the caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn fluid_sim_destroy(ptr: *mut FluidSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: The pointer was created by `Box::into_raw` in `fluid_sim_new` and
    // has not been freed, per the caller contract.
    let instance = unsafe { Box::from_raw(ptr) };
    if let Ok(sim) = instance.sim.into_inner() {
        sim.teardown();
    }
}
