//! Scalar field storage for the CPU backend
//!
//! A field is a flat `Vec<f32>` of `(N + 2)²` values laid out as described in
//! [`GridDims`]. The CPU backend keeps six of these plus one relaxation scratch
//! buffer; readers get borrowed slices, never the wrapper itself.

use std::collections::TryReserveError;

use rayon::prelude::*;

use super::dims::GridDims;

/// Field data container for the CPU backend
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    /// Field values, `i + (N + 2) * j`
    pub data: Vec<f32>,
    dims: GridDims,
}

impl FieldData {
    /// Create a zeroed field for the given grid
    ///
    /// # Arguments
    ///
    /// * `dims` - Grid dimensions
    ///
    /// # Returns
    ///
    /// New field initialized to all zeros
    #[must_use]
    pub fn new(dims: GridDims) -> Self {
        Self {
            data: vec![0.0; dims.cell_count()],
            dims,
        }
    }

    /// Create a zeroed field, reporting allocation failure instead of aborting
    ///
    /// # Errors
    ///
    /// Returns the allocator's error if the buffer cannot be reserved
    pub fn try_new(dims: GridDims) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(dims.cell_count())?;
        data.resize(dims.cell_count(), 0.0);
        Ok(Self { data, dims })
    }

    /// Wrap an existing buffer
    ///
    /// # Panics
    ///
    /// Panics if `data` is not sized for `dims`
    #[must_use]
    pub fn from_vec(dims: GridDims, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), dims.cell_count(), "Field size mismatch");
        Self { data, dims }
    }

    /// Get reference to field data
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Get mutable reference to field data
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Get value at `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[self.dims.index(i, j)]
    }

    /// Set value at `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, i: usize, j: usize, value: f32) {
        let idx = self.dims.index(i, j);
        self.data[idx] = value;
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// `self += scale * source`, cell by cell
    ///
    /// # Panics
    ///
    /// Panics if `source` is not sized for this grid
    pub fn add_scaled(&mut self, source: &[f32], scale: f32) {
        add_scaled(&mut self.data, source, scale);
    }
}

/// `target += scale * source` over whole buffers
///
/// # Panics
///
/// Panics if the buffers differ in length
pub fn add_scaled(target: &mut [f32], source: &[f32], scale: f32) {
    assert_eq!(target.len(), source.len(), "Field size mismatch");
    target
        .par_iter_mut()
        .zip(source.par_iter())
        .for_each(|(t, s)| *t += scale * s);
}

/// Sum of the interior cells of a raw field buffer
pub fn interior_sum(dims: GridDims, data: &[f32]) -> f64 {
    let stride = dims.stride();
    data.chunks(stride)
        .skip(1)
        .take(dims.n())
        .map(|row| row[1..=dims.n()].iter().map(|&v| f64::from(v)).sum::<f64>())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let field = FieldData::new(GridDims::new(4));
        assert_eq!(field.data.len(), 36);
        assert!(field.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_try_new_matches_new() {
        let dims = GridDims::new(8);
        let field = FieldData::try_new(dims).expect("small allocation");
        assert_eq!(field, FieldData::new(dims));
    }

    #[test]
    fn test_get_set() {
        let mut field = FieldData::new(GridDims::new(4));
        field.set(2, 3, 1.5);
        assert_eq!(field.get(2, 3), 1.5);
        assert_eq!(field.data[2 + 6 * 3], 1.5);
    }

    #[test]
    #[should_panic(expected = "outside grid")]
    fn test_get_out_of_bounds() {
        let field = FieldData::new(GridDims::new(4));
        let _ = field.get(0, 6);
    }

    #[test]
    fn test_add_scaled() {
        let dims = GridDims::new(2);
        let mut field = FieldData::new(dims);
        field.fill(1.0);
        let source = vec![2.0; dims.cell_count()];
        field.add_scaled(&source, 0.5);
        assert!(field.as_slice().iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_interior_sum_ignores_border() {
        let dims = GridDims::new(3);
        let mut field = FieldData::new(dims);
        field.fill(100.0);
        for cell in dims.interior() {
            field.set(cell.i, cell.j, 1.0);
        }
        assert_eq!(interior_sum(dims, field.as_slice()), 9.0);
    }

    #[test]
    fn test_from_vec_keeps_layout() {
        let dims = GridDims::new(2);
        let mut field = FieldData::from_vec(dims, (0..16).map(|k| k as f32).collect());
        assert_eq!(field.get(1, 2), 9.0);
        field.as_mut_slice()[dims.index(2, 1)] = -1.0;
        assert_eq!(field.get(2, 1), -1.0);
    }

    #[test]
    #[should_panic(expected = "Field size mismatch")]
    fn test_from_vec_rejects_wrong_length() {
        let _ = FieldData::from_vec(GridDims::new(2), vec![0.0; 15]);
    }
}
