//! Regular 2D grid geometry shared by every raster in a run.

use crate::error::GridError;

/// Dimensions and pixel size of a north-up raster grid.
///
/// Cells are stored row-major: the flat index of `(row, col)` is
/// `row * cols + col`. `pixel_size` is in projection units, so distances
/// measured in pixels convert to projection units by multiplying by it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpec {
    rows: usize,
    cols: usize,
    pixel_size: f64,
}

impl GridSpec {
    /// Create a grid with `rows x cols` cells of side `pixel_size`.
    ///
    /// Returns `Err(GridError::Empty)` if either dimension is zero and
    /// `Err(GridError::InvalidPixelSize)` unless `pixel_size` is finite
    /// and positive.
    pub fn new(rows: usize, cols: usize, pixel_size: f64) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty { rows, cols });
        }
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(GridError::InvalidPixelSize { value: pixel_size });
        }
        Ok(Self {
            rows,
            cols,
            pixel_size,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Pixel side length in projection units.
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Flat index of `(row, col)`, or `None` if out of bounds.
    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then_some(row * self.cols + col)
    }

    /// `(row, col)` of a flat index.
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Same grid with a different pixel size, covering the same extent.
    ///
    /// Dimensions are rounded up so the new grid never covers less ground
    /// than the old one.
    pub fn resized(&self, pixel_size: f64) -> Result<Self, GridError> {
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(GridError::InvalidPixelSize { value: pixel_size });
        }
        let scale = self.pixel_size / pixel_size;
        let rows = ((self.rows as f64) * scale).ceil().max(1.0) as usize;
        let cols = ((self.cols as f64) * scale).ceil().max(1.0) as usize;
        Self::new(rows, cols, pixel_size)
    }

    /// Ground extent `(height, width)` in projection units.
    pub fn extent(&self) -> (f64, f64) {
        (
            self.rows as f64 * self.pixel_size,
            self.cols as f64 * self.pixel_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_bad_pixel_size() {
        assert_eq!(
            GridSpec::new(0, 3, 1.0),
            Err(GridError::Empty { rows: 0, cols: 3 })
        );
        assert!(matches!(
            GridSpec::new(3, 3, 0.0),
            Err(GridError::InvalidPixelSize { .. })
        ));
        assert!(GridSpec::new(3, 3, f64::NAN).is_err());
    }

    #[test]
    fn index_and_coords_are_inverse() {
        let g = GridSpec::new(4, 5, 1.0).unwrap();
        for i in 0..g.cell_count() {
            let (r, c) = g.coords(i);
            assert_eq!(g.index(r, c), Some(i));
        }
        assert_eq!(g.index(4, 0), None);
        assert_eq!(g.index(0, 5), None);
    }

    #[test]
    fn resized_covers_extent() {
        let g = GridSpec::new(3, 5, 10.0).unwrap();
        let fine = g.resized(4.0).unwrap();
        assert_eq!((fine.rows(), fine.cols()), (8, 13));
        let (h, w) = fine.extent();
        assert!(h >= 30.0 && w >= 50.0);
    }
}
