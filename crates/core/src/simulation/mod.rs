//! Stable-fluids simulation instance
//!
//! `FluidSimulation` owns one compute backend and drives it through the per-tick
//! pipeline:
//! - Pending point inputs are scattered into the source fields
//! - The velocity step (sources, viscosity, projection, self-advection, projection)
//! - The density step (source, diffusion, advection by the new velocity)
//!
//! Hosts feed inputs between ticks with [`FluidSimulation::apply_input`] and read
//! the fields back with [`FluidSimulation::density`] and
//! [`FluidSimulation::velocity`] once `step` has returned.

pub mod input;
pub mod stats;

pub use input::{Input, PointerInput, PointerState};
pub use stats::{FieldStats, VelocityField};

use std::borrow::Cow;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::config::{BackendPreference, SimulationParams};
use crate::error::SimulationError;
use crate::grid::{Cell, GridDims};
use crate::solver::{
    create_compute_backend, density_step, velocity_step, ComputeBackend, FieldId, FrameTimer,
};
use input::CellImpulse;

/// 2D stable-fluids simulation on a fixed `N x N` grid
pub struct FluidSimulation {
    /// Backend-agnostic field storage and kernels (CPU or GPU)
    backend: Box<dyn ComputeBackend>,
    params: SimulationParams,
    dims: GridDims,

    /// Inputs collected since the last tick, keyed by linear cell index
    pending: FxHashMap<usize, CellImpulse>,

    // Statistics
    tick: u64,
    elapsed: f32,
    frame_timer: FrameTimer,
}

impl FluidSimulation {
    /// Create a simulation with every field zeroed
    ///
    /// # Arguments
    ///
    /// * `params` - Grid size and solver parameters
    /// * `preference` - Which backend to run on
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidParameter`] if `params` fails validation
    /// - [`SimulationError::Backend`] if field storage cannot be allocated or a
    ///   GPU was required but is unavailable
    pub fn new(
        params: SimulationParams,
        preference: BackendPreference,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let backend = create_compute_backend(params.dims(), preference)?;
        Self::with_backend(params, backend)
    }

    /// Create a simulation on an existing backend
    ///
    /// The backend's fields are used as they are; pass a freshly created backend
    /// to start from rest.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidParameter`] if `params` fails validation
    /// - [`SimulationError::GridMismatch`] if the backend was built for another grid size
    pub fn with_backend(
        params: SimulationParams,
        backend: Box<dyn ComputeBackend>,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let dims = backend.dims();
        if dims.n() != params.grid_size {
            return Err(SimulationError::GridMismatch {
                expected: params.grid_size,
                actual: dims.n(),
            });
        }

        info!(
            "Fluid simulation initialized: {}x{} grid, dt={}, diff={}, visc={}, GPU={}",
            dims.n(),
            dims.n(),
            params.dt,
            params.diffusion,
            params.viscosity,
            backend.is_gpu_accelerated()
        );

        Ok(Self {
            backend,
            params,
            dims,
            pending: FxHashMap::default(),
            tick: 0,
            elapsed: 0.0,
            frame_timer: FrameTimer::new(),
        })
    }

    /// Queue a point input for the next tick
    ///
    /// Inputs on the same cell are summed. Forces are scaled by
    /// `SimulationParams::force` and densities by `SimulationParams::source`
    /// when the tick runs.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::CellOutOfRange`] unless `1 <= i, j <= N`
    /// - [`SimulationError::InvalidParameter`] if the force or amount is not finite
    pub fn apply_input(
        &mut self,
        cell: impl Into<Cell>,
        input: Input,
    ) -> Result<(), SimulationError> {
        input.validate()?;
        let cell = cell.into();
        if !self.dims.contains_interior(cell.i, cell.j) {
            return Err(SimulationError::CellOutOfRange {
                cell,
                n: self.dims.n(),
            });
        }
        let idx = self.dims.index(cell.i, cell.j);
        self.pending.entry(idx).or_default().accumulate(input);
        Ok(())
    }

    /// Queue whatever impulses a pointer produces this frame
    ///
    /// # Errors
    ///
    /// Propagates [`Self::apply_input`] errors; pointer samples always map to
    /// interior cells, so none are expected.
    pub fn apply_pointer(
        &mut self,
        pointer: &mut PointerInput,
        state: PointerState,
    ) -> Result<(), SimulationError> {
        for (cell, input) in pointer.sample(self.dims, state) {
            self.apply_input(cell, input)?;
        }
        Ok(())
    }

    /// Advance the simulation by one tick of `params.dt`
    pub fn step(&mut self) {
        let start = Instant::now();

        self.inject_pending();
        velocity_step(self.backend.as_mut(), &self.params);
        density_step(self.backend.as_mut(), &self.params);

        self.tick += 1;
        self.elapsed += self.params.dt;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.frame_timer.record(elapsed_ms);

        debug!(
            "Tick {}: t={:.3}, dt={}, {:.3}ms",
            self.tick, self.elapsed, self.params.dt, elapsed_ms
        );
    }

    /// Current density field in grid order, border included
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Backend`] if the device readback fails
    pub fn density(&self) -> Result<Cow<'_, [f32]>, SimulationError> {
        Ok(self.backend.read_field(FieldId::Density)?)
    }

    /// Current velocity field
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Backend`] if the device readback fails
    pub fn velocity(&self) -> Result<VelocityField<'_>, SimulationError> {
        let u = self.backend.read_field(FieldId::VelocityX)?;
        let v = self.backend.read_field(FieldId::VelocityY)?;
        Ok(VelocityField::new(self.dims, u, v))
    }

    /// Diagnostics over the current fields
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Backend`] if the device readback fails
    pub fn stats(&self) -> Result<FieldStats, SimulationError> {
        let density = self.density()?;
        let velocity = self.velocity()?;
        Ok(FieldStats::compute(&density, &velocity))
    }

    /// Return to rest: zero every field, drop pending inputs, reset the clock
    pub fn clear(&mut self) {
        for field in FieldId::ALL {
            self.backend.zero(field);
        }
        self.pending.clear();
        self.tick = 0;
        self.elapsed = 0.0;
        info!("Fluid simulation cleared");
    }

    /// Current parameters
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Replace the parameters used by subsequent ticks
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidParameter`] if `params` fails validation
    /// - [`SimulationError::GridMismatch`] if `grid_size` differs; the grid
    ///   cannot be resized
    pub fn set_params(&mut self, params: SimulationParams) -> Result<(), SimulationError> {
        params.validate()?;
        if params.grid_size != self.dims.n() {
            return Err(SimulationError::GridMismatch {
                expected: self.dims.n(),
                actual: params.grid_size,
            });
        }
        debug!("Simulation parameters updated: {:?}", params);
        self.params = params;
        Ok(())
    }

    /// Grid dimensions
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time in the same units as `dt`
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Wall-clock duration of the last tick in milliseconds
    pub fn last_step_ms(&self) -> f64 {
        self.frame_timer.last_frame_time_ms()
    }

    /// Check if GPU backend is being used
    pub fn is_gpu_accelerated(&self) -> bool {
        self.backend.is_gpu_accelerated()
    }

    /// Release all field storage
    pub fn teardown(self) {
        info!("Fluid simulation torn down after {} ticks", self.tick);
    }

    // ====== Private Methods ======

    /// Rebuild the three source fields from the pending inputs
    fn inject_pending(&mut self) {
        self.backend.zero(FieldId::VelocityXPrev);
        self.backend.zero(FieldId::VelocityYPrev);
        self.backend.zero(FieldId::DensityPrev);

        if self.pending.is_empty() {
            return;
        }

        let count = self.pending.len();
        let mut u = Vec::with_capacity(count);
        let mut v = Vec::with_capacity(count);
        let mut density = Vec::with_capacity(count);
        for (&idx, impulse) in &self.pending {
            u.push((idx, impulse.force.x * self.params.force));
            v.push((idx, impulse.force.y * self.params.force));
            density.push((idx, impulse.density * self.params.source));
        }
        self.pending.clear();

        self.backend.scatter(FieldId::VelocityXPrev, &u);
        self.backend.scatter(FieldId::VelocityYPrev, &v);
        self.backend.scatter(FieldId::DensityPrev, &density);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::CpuBackend;
    use nalgebra::Vector2;

    fn cpu_simulation(n: usize) -> FluidSimulation {
        let params = SimulationParams::default().with_grid_size(n);
        FluidSimulation::new(params, BackendPreference::Cpu).expect("cpu simulation")
    }

    #[test]
    fn test_new_starts_at_rest() {
        let sim = cpu_simulation(8);
        assert_eq!(sim.tick(), 0);
        assert!(sim.density().unwrap().iter().all(|&d| d == 0.0));
        assert!(!sim.is_gpu_accelerated());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = SimulationParams::default().with_dt(0.0);
        assert!(matches!(
            FluidSimulation::new(params, BackendPreference::Cpu),
            Err(SimulationError::InvalidParameter { name: "dt", .. })
        ));
    }

    #[test]
    fn test_backend_grid_must_match() {
        let backend = Box::new(CpuBackend::new(GridDims::new(8)).unwrap());
        let params = SimulationParams::default().with_grid_size(16);
        let result = FluidSimulation::with_backend(params, backend);
        assert!(matches!(
            result,
            Err(SimulationError::GridMismatch {
                expected: 16,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_out_of_range_input_rejected() {
        let mut sim = cpu_simulation(4);
        for cell in [(0, 1), (1, 0), (5, 2), (2, 5)] {
            let err = sim.apply_input(cell, Input::Density(1.0)).unwrap_err();
            assert!(matches!(err, SimulationError::CellOutOfRange { n: 4, .. }));
        }
        assert!(sim.pending.is_empty());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut sim = cpu_simulation(8);
        let rejected = [
            Input::Force(Vector2::new(f32::NAN, 0.0)),
            Input::Force(Vector2::new(0.0, f32::INFINITY)),
            Input::Density(f32::NEG_INFINITY),
            Input::Density(f32::NAN),
        ];
        for input in rejected {
            assert!(matches!(
                sim.apply_input((4, 4), input),
                Err(SimulationError::InvalidParameter { .. })
            ));
        }
        assert!(sim.pending.is_empty());

        sim.step();
        let velocity = sim.velocity().unwrap();
        assert!(velocity.u.iter().chain(velocity.v.iter()).all(|x| x.is_finite()));
    }

    #[test]
    fn test_inputs_on_one_cell_sum() {
        let mut sim = cpu_simulation(4);
        sim.apply_input((2, 2), Input::Density(1.0)).unwrap();
        sim.apply_input((2, 2), Input::Density(0.5)).unwrap();
        sim.apply_input((2, 2), Input::Force(Vector2::new(1.0, 0.0))).unwrap();
        assert_eq!(sim.pending.len(), 1);
        let impulse = sim.pending[&sim.dims.index(2, 2)];
        assert_eq!(impulse.density, 1.5);
        assert_eq!(impulse.force, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn test_step_consumes_pending_inputs() {
        let mut sim = cpu_simulation(8);
        sim.apply_input((4, 4), Input::Density(1.0)).unwrap();
        sim.step();
        assert!(sim.pending.is_empty());
        assert_eq!(sim.tick(), 1);
        assert!(sim.stats().unwrap().total_density > 0.0);
    }

    #[test]
    fn test_clear_returns_to_rest() {
        let mut sim = cpu_simulation(8);
        sim.apply_input((3, 3), Input::Density(1.0)).unwrap();
        sim.apply_input((3, 3), Input::Force(Vector2::new(2.0, 1.0))).unwrap();
        sim.step();
        sim.apply_input((5, 5), Input::Density(1.0)).unwrap();
        sim.clear();

        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.elapsed(), 0.0);
        assert!(sim.pending.is_empty());
        let stats = sim.stats().unwrap();
        assert_eq!(stats.total_density, 0.0);
        assert_eq!(stats.max_speed, 0.0);
    }

    #[test]
    fn test_set_params_rejects_resize() {
        let mut sim = cpu_simulation(8);
        let resized = SimulationParams::default().with_grid_size(16);
        assert!(matches!(
            sim.set_params(resized),
            Err(SimulationError::GridMismatch { .. })
        ));

        let tuned = SimulationParams::default()
            .with_grid_size(8)
            .with_viscosity(0.001);
        sim.set_params(tuned).unwrap();
        assert_eq!(sim.params().viscosity, 0.001);
    }
}
