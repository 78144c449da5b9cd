//! Error types for backend and simulation failures

use crate::grid::Cell;

/// Failure inside a compute backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Field storage could not be reserved
    Allocation {
        /// Number of bytes that were requested
        bytes: usize,
    },
    /// No usable GPU when one was explicitly requested
    DeviceUnavailable(String),
    /// Copying a field back from the device failed
    ReadbackFailed(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Allocation { bytes } => {
                write!(f, "Failed to allocate {bytes} bytes of field storage")
            }
            BackendError::DeviceUnavailable(msg) => write!(f, "GPU unavailable: {msg}"),
            BackendError::ReadbackFailed(msg) => write!(f, "Field readback failed: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Failure reported by [`crate::FluidSimulation`]
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A parameter is outside its valid range
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// Input targeted a cell outside `1..=N`
    CellOutOfRange {
        /// The rejected cell
        cell: Cell,
        /// Interior size of the grid
        n: usize,
    },
    /// A backend was built for a different grid than the parameters describe
    GridMismatch {
        /// Interior size the simulation expected
        expected: usize,
        /// Interior size the backend provides
        actual: usize,
    },
    /// The compute backend failed
    Backend(BackendError),
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{name}': {reason}")
            }
            SimulationError::CellOutOfRange { cell, n } => write!(
                f,
                "Cell ({}, {}) is outside the interior 1..={n}",
                cell.i, cell.j
            ),
            SimulationError::GridMismatch { expected, actual } => write!(
                f,
                "Backend grid size {actual} does not match requested size {expected}"
            ),
            SimulationError::Backend(err) => write!(f, "Backend error: {err}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for SimulationError {
    fn from(err: BackendError) -> Self {
        SimulationError::Backend(err)
    }
}
