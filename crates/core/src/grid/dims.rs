//! Grid dimensions and cell addressing
//!
//! A grid of interior size `N` is stored as a square of `(N + 2)²` cells. Row 0,
//! row `N + 1`, column 0 and column `N + 1` form the ghost border that the
//! boundary stage rewrites after every update. Cell `(i, j)` lives at linear
//! index `i + (N + 2) * j`, so `i` walks along a row and `j` selects the row.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Interior cell coordinate `(i, j)` with `1 <= i, j <= N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column index
    pub i: usize,
    /// Row index
    pub j: usize,
}

impl Cell {
    /// Create a cell coordinate
    #[must_use]
    pub const fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

impl From<(usize, usize)> for Cell {
    fn from((i, j): (usize, usize)) -> Self {
        Self { i, j }
    }
}

/// Dimensions of a square simulation grid with a one-cell ghost border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    n: usize,
}

impl GridDims {
    /// Create dimensions for an `n x n` interior
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero
    #[must_use]
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Grid must have at least one interior cell");
        Self { n }
    }

    /// Interior size `N`
    #[inline]
    #[must_use]
    pub const fn n(&self) -> usize {
        self.n
    }

    /// Row length including both ghost columns (`N + 2`)
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.n + 2
    }

    /// Total number of stored cells, border included
    #[inline]
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.stride() * self.stride()
    }

    /// Size in bytes of one `f32` field on this grid
    #[must_use]
    pub const fn field_bytes(&self) -> usize {
        self.cell_count() * std::mem::size_of::<f32>()
    }

    /// Linear index of `(i, j)`
    ///
    /// # Arguments
    ///
    /// * `i` - Column, 0 to N+1
    /// * `j` - Row, 0 to N+1
    ///
    /// # Returns
    ///
    /// Offset into a field buffer
    ///
    /// # Panics
    ///
    /// Panics if either coordinate lies outside the stored grid
    #[inline]
    #[must_use]
    pub fn index(&self, i: usize, j: usize) -> usize {
        assert!(
            i <= self.n + 1 && j <= self.n + 1,
            "Cell ({i}, {j}) outside grid of interior size {}",
            self.n
        );
        i + self.stride() * j
    }

    /// True if `(i, j)` is an interior cell
    #[inline]
    #[must_use]
    pub fn contains_interior(&self, i: usize, j: usize) -> bool {
        (1..=self.n).contains(&i) && (1..=self.n).contains(&j)
    }

    /// Iterate every interior cell, row by row
    #[must_use]
    pub fn interior(&self) -> InteriorCells {
        InteriorCells {
            n: self.n,
            i: 1,
            j: 1,
        }
    }

    /// Interior rows of `field` as `(j, row)` pairs, processed in parallel
    ///
    /// Each `row` is the full stored row (ghost columns included) so the cell
    /// `(i, j)` is `row[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `field` is not sized for this grid
    pub fn par_interior_rows<'a>(
        &self,
        field: &'a mut [f32],
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [f32])> + 'a {
        assert_eq!(field.len(), self.cell_count(), "Field size mismatch");
        field
            .par_chunks_mut(self.stride())
            .enumerate()
            .skip(1)
            .take(self.n)
    }
}

/// Iterator over interior cells produced by [`GridDims::interior`]
#[derive(Debug, Clone)]
pub struct InteriorCells {
    n: usize,
    i: usize,
    j: usize,
}

impl Iterator for InteriorCells {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.j > self.n {
            return None;
        }
        let cell = Cell::new(self.i, self.j);
        if self.i == self.n {
            self.i = 1;
            self.j += 1;
        } else {
            self.i += 1;
        }
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.j > self.n {
            0
        } else {
            (self.n - self.j) * self.n + (self.n - self.i + 1)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for InteriorCells {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_layout() {
        let dims = GridDims::new(4);
        assert_eq!(dims.stride(), 6);
        assert_eq!(dims.cell_count(), 36);
        assert_eq!(dims.index(0, 0), 0);
        assert_eq!(dims.index(1, 0), 1);
        assert_eq!(dims.index(0, 1), 6);
        assert_eq!(dims.index(5, 5), 35);
    }

    #[test]
    #[should_panic(expected = "outside grid")]
    fn test_index_out_of_bounds() {
        let dims = GridDims::new(4);
        let _ = dims.index(6, 0);
    }

    #[test]
    fn test_interior_iteration_covers_bounds() {
        let dims = GridDims::new(3);
        let cells: Vec<Cell> = dims.interior().collect();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells.first(), Some(&Cell::new(1, 1)));
        assert_eq!(cells.last(), Some(&Cell::new(3, 3)));
        assert!(cells.iter().all(|c| dims.contains_interior(c.i, c.j)));
    }

    #[test]
    fn test_interior_size_hint() {
        let dims = GridDims::new(5);
        let mut iter = dims.interior();
        assert_eq!(iter.len(), 25);
        iter.next();
        iter.next();
        assert_eq!(iter.len(), 23);
    }

    #[test]
    fn test_contains_interior_excludes_border() {
        let dims = GridDims::new(4);
        assert!(!dims.contains_interior(0, 2));
        assert!(!dims.contains_interior(2, 5));
        assert!(dims.contains_interior(4, 4));
    }

    #[test]
    fn test_par_interior_rows_skips_ghost_rows() {
        let dims = GridDims::new(3);
        let mut field = vec![0.0; dims.cell_count()];
        dims.par_interior_rows(&mut field)
            .for_each(|(j, row)| row[1] = j as f32);
        assert_eq!(field[dims.index(1, 0)], 0.0);
        assert_eq!(field[dims.index(1, 1)], 1.0);
        assert_eq!(field[dims.index(1, 3)], 3.0);
        assert_eq!(field[dims.index(1, 4)], 0.0);
    }
}
