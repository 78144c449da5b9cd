//! Per-tick stage ordering
//!
//! The velocity and density steps are written once against [`ComputeBackend`].
//! Scratch fields double as the "previous" operand of each stage: after
//! `add_source`, a swap turns the freshly updated field into the stage input and
//! the source buffer into its output, so no data is ever copied.

use crate::config::SimulationParams;

use super::advection::advect;
use super::boundary::Boundary;
use super::diffusion::diffuse;
use super::profiler::ProfilerScope;
use super::projection::project;
use super::r#trait::{ComputeBackend, FieldId};

/// Advance the velocity field by one tick
///
/// Sources, viscous diffusion, projection, self-advection, projection. On
/// return `VelocityX`/`VelocityY` hold the new field and the `*Prev` fields hold
/// scratch.
pub fn velocity_step(backend: &mut dyn ComputeBackend, params: &SimulationParams) {
    let _scope = ProfilerScope::new("velocity_step");

    backend.add_source(FieldId::VelocityX, FieldId::VelocityXPrev, params.dt);
    backend.add_source(FieldId::VelocityY, FieldId::VelocityYPrev, params.dt);

    backend.swap(FieldId::VelocityX, FieldId::VelocityXPrev);
    diffuse(
        backend,
        params,
        Boundary::VelocityX,
        FieldId::VelocityX,
        FieldId::VelocityXPrev,
        params.viscosity,
    );
    backend.swap(FieldId::VelocityY, FieldId::VelocityYPrev);
    diffuse(
        backend,
        params,
        Boundary::VelocityY,
        FieldId::VelocityY,
        FieldId::VelocityYPrev,
        params.viscosity,
    );

    project(
        backend,
        params,
        FieldId::VelocityX,
        FieldId::VelocityY,
        FieldId::VelocityXPrev,
        FieldId::VelocityYPrev,
    );

    // The diffused field becomes the carrier for self-advection
    backend.swap(FieldId::VelocityX, FieldId::VelocityXPrev);
    backend.swap(FieldId::VelocityY, FieldId::VelocityYPrev);
    advect(
        backend,
        params,
        Boundary::VelocityX,
        FieldId::VelocityX,
        FieldId::VelocityXPrev,
        FieldId::VelocityXPrev,
        FieldId::VelocityYPrev,
    );
    advect(
        backend,
        params,
        Boundary::VelocityY,
        FieldId::VelocityY,
        FieldId::VelocityYPrev,
        FieldId::VelocityXPrev,
        FieldId::VelocityYPrev,
    );

    project(
        backend,
        params,
        FieldId::VelocityX,
        FieldId::VelocityY,
        FieldId::VelocityXPrev,
        FieldId::VelocityYPrev,
    );
}

/// Advance the density field by one tick, carried by the current velocity
pub fn density_step(backend: &mut dyn ComputeBackend, params: &SimulationParams) {
    let _scope = ProfilerScope::new("density_step");

    backend.add_source(FieldId::Density, FieldId::DensityPrev, params.dt);
    backend.swap(FieldId::Density, FieldId::DensityPrev);
    diffuse(
        backend,
        params,
        Boundary::Scalar,
        FieldId::Density,
        FieldId::DensityPrev,
        params.diffusion,
    );
    backend.swap(FieldId::Density, FieldId::DensityPrev);
    advect(
        backend,
        params,
        Boundary::Scalar,
        FieldId::Density,
        FieldId::DensityPrev,
        FieldId::VelocityX,
        FieldId::VelocityY,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDims;
    use crate::solver::CpuBackend;

    #[test]
    fn test_density_without_velocity_only_gains_source() {
        let params = SimulationParams::default().with_grid_size(6);
        let dims = GridDims::new(6);
        let mut cpu = CpuBackend::new(dims).expect("small allocation");
        cpu.scatter(FieldId::DensityPrev, &[(dims.index(3, 3), 2.0)]);

        density_step(&mut cpu, &params);

        let density = cpu.read_field(FieldId::Density).expect("cpu read");
        // No diffusion and no velocity: the source lands where it was injected
        assert_eq!(density[dims.index(3, 3)], params.dt * 2.0);
        assert_eq!(density.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn test_velocity_step_keeps_zero_field() {
        let params = SimulationParams::default().with_grid_size(5);
        let mut cpu = CpuBackend::new(GridDims::new(5)).expect("small allocation");
        velocity_step(&mut cpu, &params);
        for field in [FieldId::VelocityX, FieldId::VelocityY] {
            assert!(cpu.read_field(field).expect("cpu read").iter().all(|&v| v == 0.0));
        }
    }
}
