//! In-memory single-band rasters and the workspace's nodata conventions.
//!
//! Two pixel types are used throughout a run:
//!
//! - `u8` for presence masks and counts, nodata [`BYTE_NODATA`];
//! - `f32` for distances, scores and risk, nodata [`FLOAT_NODATA`].

use crate::error::RasterError;
use crate::grid::GridSpec;
use std::fmt;

/// Nodata sentinel for score, distance and risk rasters.
pub const FLOAT_NODATA: f32 = f32::MIN;

/// Nodata sentinel for presence and count rasters.
pub const BYTE_NODATA: u8 = 255;

/// A raster cell type.
pub trait Pixel: Copy + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// Sentinel used when a raster of this type is created without an
    /// explicit nodata value.
    const NODATA: Self;

    /// Widen to `f64` for arithmetic.
    fn to_f64(self) -> f64;

    /// True for values that can never be valid regardless of nodata (NaN).
    fn is_nan(self) -> bool {
        false
    }
}

impl Pixel for f32 {
    const NODATA: Self = FLOAT_NODATA;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Pixel for u8 {
    const NODATA: Self = BYTE_NODATA;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

/// A single-band raster over a [`GridSpec`].
#[derive(Clone, Debug, PartialEq)]
pub struct Raster<T: Pixel> {
    grid: GridSpec,
    data: Vec<T>,
    nodata: Option<T>,
}

impl<T: Pixel> Raster<T> {
    /// A raster with every cell set to `value`.
    pub fn filled(grid: GridSpec, value: T, nodata: Option<T>) -> Self {
        Self {
            grid,
            data: vec![value; grid.cell_count()],
            nodata,
        }
    }

    /// A raster whose every cell is the type's nodata sentinel.
    pub fn nodata_filled(grid: GridSpec) -> Self {
        Self::filled(grid, T::NODATA, Some(T::NODATA))
    }

    /// Wrap a row-major buffer.
    ///
    /// Returns `Err(RasterError::LengthMismatch)` if `data` does not have
    /// exactly `grid.cell_count()` cells.
    pub fn from_vec(grid: GridSpec, data: Vec<T>, nodata: Option<T>) -> Result<Self, RasterError> {
        if data.len() != grid.cell_count() {
            return Err(RasterError::LengthMismatch {
                expected: grid.cell_count(),
                actual: data.len(),
            });
        }
        Ok(Self { grid, data, nodata })
    }

    /// The raster's grid.
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// The nodata sentinel, if any.
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Row-major cell values.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable row-major cell values.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the raster, returning its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Value at `(row, col)`, or `None` if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.grid.index(row, col).map(|i| self.data[i])
    }

    /// Set the value at `(row, col)`. Returns `false` if out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        match self.grid.index(row, col) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// True if `value` is neither NaN nor this raster's nodata.
    pub fn is_valid(&self, value: T) -> bool {
        !value.is_nan() && self.nodata != Some(value)
    }

    /// Value at a flat index if it is valid.
    pub fn valid_at(&self, index: usize) -> Option<T> {
        let v = self.data[index];
        self.is_valid(v).then_some(v)
    }

    /// Largest valid value, or `None` if the raster holds no valid cells.
    pub fn max_valid(&self) -> Option<T> {
        self.data
            .iter()
            .copied()
            .filter(|&v| self.is_valid(v))
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| self.is_valid(v)).count()
    }
}

impl Raster<u8> {
    /// True where the cell is a valid, exact `1`: the presence convention
    /// for habitat and stressor masks.
    pub fn is_present(&self, index: usize) -> bool {
        self.valid_at(index) == Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(rows, cols, 1.0).unwrap()
    }

    #[test]
    fn from_vec_checks_length() {
        let err = Raster::<u8>::from_vec(grid(2, 2), vec![0; 3], None).unwrap_err();
        assert_eq!(
            err,
            RasterError::LengthMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn nodata_and_nan_are_invalid() {
        let mut r = Raster::<f32>::nodata_filled(grid(1, 3));
        r.data_mut()[1] = f32::NAN;
        r.data_mut()[2] = 0.5;
        assert_eq!(r.valid_at(0), None);
        assert_eq!(r.valid_at(1), None);
        assert_eq!(r.valid_at(2), Some(0.5));
        assert_eq!(r.valid_count(), 1);
    }

    #[test]
    fn presence_requires_exact_one() {
        let r = Raster::from_vec(grid(1, 4), vec![0u8, 1, 2, BYTE_NODATA], Some(BYTE_NODATA))
            .unwrap();
        let present: Vec<bool> = (0..4).map(|i| r.is_present(i)).collect();
        assert_eq!(present, vec![false, true, false, false]);
    }

    #[test]
    fn max_valid_skips_nodata() {
        let r = Raster::from_vec(grid(1, 3), vec![2u8, BYTE_NODATA, 1], Some(BYTE_NODATA))
            .unwrap();
        assert_eq!(r.max_valid(), Some(2));
        assert_eq!(Raster::<u8>::nodata_filled(grid(2, 2)).max_valid(), None);
    }

    proptest! {
        #[test]
        fn max_valid_matches_filtered_max(values in prop::collection::vec(0u8..=254, 1..40)) {
            let n = values.len();
            let r = Raster::from_vec(grid(1, n), values.clone(), Some(BYTE_NODATA)).unwrap();
            prop_assert_eq!(r.max_valid(), values.iter().copied().max());
        }
    }
}
