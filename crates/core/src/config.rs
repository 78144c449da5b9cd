//! Simulation parameters and backend preference
//!
//! Parameters are plain data with `serde` support so hosts can load them from
//! their own configuration files. They are validated when a simulation is built
//! and again whenever they are replaced between steps.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::grid::GridDims;
use crate::solver::QualityPreset;

/// Number of relaxation sweeps used by diffusion and projection unless overridden
pub const DEFAULT_RELAXATION_ITERATIONS: u32 = 20;

/// Largest accepted interior grid size
pub const MAX_GRID_SIZE: usize = 4096;

/// Tunable parameters for one simulation instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Interior cells per side (`N`)
    pub grid_size: usize,
    /// Time step per tick
    pub dt: f32,
    /// Density diffusion rate
    pub diffusion: f32,
    /// Kinematic viscosity of the velocity field
    pub viscosity: f32,
    /// Scale applied to velocity inputs
    pub force: f32,
    /// Scale applied to density inputs
    pub source: f32,
    /// Relaxation sweeps per linear solve
    pub relaxation_iterations: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            grid_size: 64,
            dt: 0.1,
            diffusion: 0.0,
            viscosity: 0.0,
            force: 5.0,
            source: 100.0,
            relaxation_iterations: DEFAULT_RELAXATION_ITERATIONS,
        }
    }
}

impl SimulationParams {
    /// Default parameters at the resolution of a quality preset
    #[must_use]
    pub fn from_quality(quality: QualityPreset) -> Self {
        Self::default().with_grid_size(quality.grid_size())
    }

    /// Set the interior grid size
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Set the time step
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Set the density diffusion rate
    pub fn with_diffusion(mut self, diffusion: f32) -> Self {
        self.diffusion = diffusion;
        self
    }

    /// Set the viscosity
    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Set the velocity input scale
    pub fn with_force(mut self, force: f32) -> Self {
        self.force = force;
        self
    }

    /// Set the density input scale
    pub fn with_source(mut self, source: f32) -> Self {
        self.source = source;
        self
    }

    /// Set the number of relaxation sweeps
    pub fn with_relaxation_iterations(mut self, iterations: u32) -> Self {
        self.relaxation_iterations = iterations;
        self
    }

    /// Grid dimensions described by `grid_size`
    ///
    /// # Panics
    ///
    /// Panics if `grid_size` is zero; call [`Self::validate`] first
    #[must_use]
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.grid_size)
    }

    /// Check every parameter against its valid range
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidParameter`] naming the first offending field
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(SimulationError::invalid(
                "grid_size",
                format!("must be in 1..={MAX_GRID_SIZE}, got {}", self.grid_size),
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimulationError::invalid(
                "dt",
                format!("must be finite and positive, got {}", self.dt),
            ));
        }
        check_rate("diffusion", self.diffusion)?;
        check_rate("viscosity", self.viscosity)?;
        if !self.force.is_finite() {
            return Err(SimulationError::invalid("force", "must be finite"));
        }
        if !self.source.is_finite() {
            return Err(SimulationError::invalid("source", "must be finite"));
        }
        if self.relaxation_iterations == 0 {
            return Err(SimulationError::invalid(
                "relaxation_iterations",
                "at least one sweep is required",
            ));
        }
        Ok(())
    }
}

fn check_rate(name: &'static str, value: f32) -> Result<(), SimulationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimulationError::invalid(
            name,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

/// Which compute backend a simulation should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendPreference {
    /// GPU when available, CPU otherwise
    #[default]
    Auto,
    /// Always the CPU backend
    Cpu,
    /// GPU only; construction fails without a usable adapter
    Gpu,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = SimulationParams::default();
        assert_eq!(params.grid_size, 64);
        assert_eq!(params.dt, 0.1);
        assert_eq!(params.force, 5.0);
        assert_eq!(params.source, 100.0);
        assert_eq!(params.relaxation_iterations, 20);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_grid() {
        let err = SimulationParams::default()
            .with_grid_size(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter {
                name: "grid_size",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        for dt in [0.0, -0.1, f32::NAN, f32::INFINITY] {
            let result = SimulationParams::default().with_dt(dt).validate();
            assert!(result.is_err(), "dt = {dt} should be rejected");
        }
    }

    #[test]
    fn test_rejects_negative_rates() {
        assert!(SimulationParams::default()
            .with_viscosity(-1.0)
            .validate()
            .is_err());
        assert!(SimulationParams::default()
            .with_diffusion(f32::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_rejects_zero_iterations() {
        assert!(SimulationParams::default()
            .with_relaxation_iterations(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_quality() {
        let params = SimulationParams::from_quality(QualityPreset::High);
        assert_eq!(params.grid_size, 128);
        assert_eq!(params.dt, SimulationParams::default().dt);
    }
}
