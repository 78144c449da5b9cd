//! Stable-fluids solver module
//!
//! This module provides a unified GPU/CPU abstraction layer for the solver
//! stages. The core abstraction is the `ComputeBackend` trait, which has both CPU
//! and GPU implementations; the stages (relaxation, diffusion, advection,
//! projection, and the per-tick ordering) are written once on top of it.
//!
//! # Feature Flags
//!
//! - `gpu` (default): Enables GPU acceleration via wgpu. Disable with `--no-default-features`
//!   for environments without GPU access.
//!
//! # Backend Selection
//!
//! With [`BackendPreference::Auto`] the best available backend is chosen:
//! 1. Try GPU (if `gpu` feature enabled, hardware available, and the grid fits)
//! 2. Fall back to CPU (always available)
//!
//! # Example
//!
//! ```rust,ignore
//! use stable_fluids_core::grid::GridDims;
//! use stable_fluids_core::solver::create_compute_backend;
//! use stable_fluids_core::BackendPreference;
//!
//! let backend = create_compute_backend(GridDims::new(64), BackendPreference::Auto)?;
//! ```

mod advection;
mod boundary;
mod context;
mod cpu;
mod diffusion;
mod pipeline;
pub mod profiler;
mod projection;
mod quality;
mod relaxation;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

#[cfg(feature = "gpu")]
mod gpu;

// Re-exports
pub use advection::{advect, advect_cell_pass};
pub use boundary::{enforce_boundary, Boundary};
pub use context::GpuInitResult;
pub use cpu::CpuBackend;
pub use diffusion::diffuse;
pub use pipeline::{density_step, velocity_step};
pub use profiler::{FrameTimer, ProfilerScope};
pub use projection::{divergence_pass, project, subtract_gradient_pass};
pub use quality::QualityPreset;
pub use r#trait::{ComputeBackend, FieldId, FIELD_COUNT};
pub use relaxation::{lin_solve, relax_half_pass, relax_sweep, Parity};

#[cfg(feature = "gpu")]
pub use context::GpuContext;
#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;

use crate::config::BackendPreference;
use crate::error::BackendError;
use crate::grid::GridDims;
use tracing::info;

#[cfg(feature = "gpu")]
use tracing::warn;

/// Create a compute backend for a grid
///
/// # Arguments
///
/// * `dims` - Grid dimensions
/// * `preference` - `Auto` tries the GPU and falls back to the CPU; `Cpu` and
///   `Gpu` force one backend
///
/// # Returns
///
/// A boxed `ComputeBackend` trait object with every field zeroed
///
/// # Errors
///
/// - [`BackendError::DeviceUnavailable`] if `Gpu` was requested and no usable
///   adapter exists (or the `gpu` feature is disabled)
/// - [`BackendError::Allocation`] if field storage cannot be reserved
pub fn create_compute_backend(
    dims: GridDims,
    preference: BackendPreference,
) -> Result<Box<dyn ComputeBackend>, BackendError> {
    if preference == BackendPreference::Cpu {
        info!("Using CPU backend ({}x{} grid)", dims.n(), dims.n());
        return Ok(Box::new(CpuBackend::new(dims)?));
    }

    #[cfg(feature = "gpu")]
    {
        let failure = match GpuContext::new() {
            GpuInitResult::Success(gpu_context) => {
                let adapter = gpu_context.adapter_name().to_owned();
                match GpuBackend::new(gpu_context, dims) {
                    Ok(gpu) => {
                        info!(
                            "Using GPU backend: {} ({}x{} grid)",
                            adapter,
                            dims.n(),
                            dims.n()
                        );
                        return Ok(Box::new(gpu));
                    }
                    Err(e) => format!("GPU '{adapter}' cannot hold the grid: {e}"),
                }
            }
            GpuInitResult::NoGpuFound => "no GPU adapter found".to_owned(),
            GpuInitResult::InitFailed {
                adapter_name,
                error,
            } => format!("GPU '{adapter_name}' found but failed to initialize: {error}"),
        };

        if preference == BackendPreference::Gpu {
            return Err(BackendError::DeviceUnavailable(failure));
        }
        warn!("{}. Falling back to CPU.", failure);
    }

    #[cfg(not(feature = "gpu"))]
    {
        if preference == BackendPreference::Gpu {
            return Err(BackendError::DeviceUnavailable(
                "built without the `gpu` feature".to_owned(),
            ));
        }
        info!("GPU feature disabled, using CPU backend");
    }

    Ok(Box::new(CpuBackend::new(dims)?))
}
