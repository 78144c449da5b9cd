//! External inputs
//!
//! Hosts feed the simulation point impulses: a velocity kick or a dye injection
//! at one interior cell. [`PointerInput`] turns window-space pointer motion into
//! such impulses the way an interactive viewer maps a mouse drag.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::grid::{Cell, GridDims};

/// A single impulse applied at one cell for the next tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Input {
    /// Velocity impulse, scaled by `SimulationParams::force`
    Force(Vector2<f32>),
    /// Dye injection, scaled by `SimulationParams::source`
    Density(f32),
}

impl Input {
    /// Reject forces and amounts that are NaN or infinite
    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        match *self {
            Input::Force(force) if !(force.x.is_finite() && force.y.is_finite()) => {
                Err(SimulationError::invalid(
                    "force",
                    format!("({}, {}) must be finite", force.x, force.y),
                ))
            }
            Input::Density(amount) if !amount.is_finite() => Err(SimulationError::invalid(
                "density",
                format!("amount {amount} must be finite"),
            )),
            _ => Ok(()),
        }
    }
}

/// Accumulated impulses for one cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct CellImpulse {
    pub force: Vector2<f32>,
    pub density: f32,
}

impl CellImpulse {
    pub(crate) fn accumulate(&mut self, input: Input) {
        match input {
            Input::Force(force) => self.force += force,
            Input::Density(amount) => self.density += amount,
        }
    }
}

/// Pointer position and button state for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    /// Horizontal position in window pixels, 0 at the left edge
    pub x: f32,
    /// Vertical position in window pixels, 0 at the top edge
    pub y: f32,
    /// Drag applies a velocity impulse while held
    pub force_button: bool,
    /// Dye is injected while held
    pub density_button: bool,
}

/// Maps pointer motion over a window onto grid impulses
///
/// The window's top-left corner is pixel `(0, 0)`; grid row 1 is at the
/// bottom of the window. Each call to [`Self::sample`] compares the pointer with
/// its position on the previous call.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInput {
    width: f32,
    height: f32,
    previous: Option<Vector2<f32>>,
}

impl PointerInput {
    /// Create a mapper for a window of the given size in pixels
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            previous: None,
        }
    }

    /// Update the window size
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Interior cell under a window position, if any
    #[must_use]
    pub fn cell_at(&self, dims: GridDims, x: f32, y: f32) -> Option<Cell> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let n = dims.n() as f32;
        let i = (x / self.width * n).floor() + 1.0;
        let j = ((self.height - y) / self.height * n).floor() + 1.0;
        let interior = 1.0..=n;
        if !(interior.contains(&i) && interior.contains(&j)) {
            return None;
        }
        Some(Cell::new(i as usize, j as usize))
    }

    /// Impulses produced by this frame's pointer state
    ///
    /// The force is the drag since the previous sample, with the vertical axis
    /// flipped so that dragging up pushes towards higher rows. Positions outside
    /// the interior produce nothing.
    pub fn sample(&mut self, dims: GridDims, state: PointerState) -> Vec<(Cell, Input)> {
        let position = Vector2::new(state.x, state.y);
        let previous = self.previous.replace(position).unwrap_or(position);

        let Some(cell) = self.cell_at(dims, state.x, state.y) else {
            return Vec::new();
        };

        let mut inputs = Vec::with_capacity(2);
        if state.force_button {
            let drag = Vector2::new(position.x - previous.x, previous.y - position.y);
            inputs.push((cell, Input::Force(drag)));
        }
        if state.density_button {
            inputs.push((cell, Input::Density(1.0)));
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_mapping_flips_vertical_axis() {
        let dims = GridDims::new(64);
        let pointer = PointerInput::new(512.0, 512.0);
        assert_eq!(pointer.cell_at(dims, 0.0, 511.0), Some(Cell::new(1, 1)));
        assert_eq!(pointer.cell_at(dims, 511.0, 1.0), Some(Cell::new(64, 64)));
        assert_eq!(pointer.cell_at(dims, 256.0, 256.0), Some(Cell::new(33, 33)));
    }

    #[test]
    fn test_outside_window_is_ignored() {
        let dims = GridDims::new(16);
        let pointer = PointerInput::new(100.0, 100.0);
        assert_eq!(pointer.cell_at(dims, -1.0, 50.0), None);
        assert_eq!(pointer.cell_at(dims, 100.0, 50.0), None);
        assert_eq!(pointer.cell_at(dims, 50.0, 0.0), None);
        assert_eq!(pointer.cell_at(dims, 50.0, 101.0), None);
    }

    #[test]
    fn test_drag_produces_force() {
        let dims = GridDims::new(16);
        let mut pointer = PointerInput::new(160.0, 160.0);
        let mut state = PointerState {
            x: 50.0,
            y: 50.0,
            force_button: true,
            density_button: false,
        };
        // First sample has no history, so the drag is zero
        let first = pointer.sample(dims, state);
        assert_eq!(first, vec![(Cell::new(6, 12), Input::Force(Vector2::zeros()))]);

        state.x = 53.0;
        state.y = 45.0;
        let second = pointer.sample(dims, state);
        assert_eq!(
            second,
            vec![(Cell::new(6, 12), Input::Force(Vector2::new(3.0, 5.0)))]
        );
    }

    #[test]
    fn test_density_button_injects_unit_amount() {
        let dims = GridDims::new(8);
        let mut pointer = PointerInput::new(80.0, 80.0);
        let inputs = pointer.sample(
            dims,
            PointerState {
                x: 5.0,
                y: 75.0,
                force_button: false,
                density_button: true,
            },
        );
        assert_eq!(inputs, vec![(Cell::new(1, 1), Input::Density(1.0))]);
    }

    #[test]
    fn test_resize_remaps_cells() {
        let dims = GridDims::new(10);
        let mut pointer = PointerInput::new(100.0, 100.0);
        assert_eq!(pointer.cell_at(dims, 150.0, 50.0), None);

        pointer.resize(200.0, 100.0);
        assert_eq!(pointer.cell_at(dims, 150.0, 50.0), Some(Cell::new(8, 6)));

        pointer.resize(0.0, 100.0);
        assert_eq!(pointer.cell_at(dims, 0.0, 50.0), None);
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(Input::Force(Vector2::new(1.0, -2.0)).validate().is_ok());
        assert!(Input::Density(0.0).validate().is_ok());
        assert!(Input::Force(Vector2::new(f32::NAN, 0.0)).validate().is_err());
        assert!(matches!(
            Input::Density(f32::INFINITY).validate(),
            Err(SimulationError::InvalidParameter { name: "density", .. })
        ));
    }

    #[test]
    fn test_accumulate_sums_inputs() {
        let mut impulse = CellImpulse::default();
        impulse.accumulate(Input::Force(Vector2::new(1.0, 2.0)));
        impulse.accumulate(Input::Force(Vector2::new(0.5, -1.0)));
        impulse.accumulate(Input::Density(3.0));
        assert_eq!(impulse.force, Vector2::new(1.5, 1.0));
        assert_eq!(impulse.density, 3.0);
    }
}
