//! Grid layout and field storage

mod dims;
mod field;

pub use dims::{Cell, GridDims, InteriorCells};
pub use field::{add_scaled, interior_sum, FieldData};
