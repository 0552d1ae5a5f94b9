//! Shared input-loading helpers for raster operations.
//!
//! Every operation combines rasters pixel by pixel, so all of its inputs
//! must sit on one grid. These helpers read declared inputs and reject
//! any whose grid differs from the first.

use hra_core::{Fingerprint, GridSpec, OpError, Raster, RasterKey};
use hra_criteria::SpatialCriterion;
use hra_task::OpContext;
use std::sync::Arc;

/// The grid every input of one operation must share.
pub(crate) struct GridGuard {
    key: RasterKey,
    grid: GridSpec,
}

impl GridGuard {
    pub(crate) fn new(key: &RasterKey, grid: &GridSpec) -> Self {
        Self {
            key: key.clone(),
            grid: *grid,
        }
    }

    pub(crate) fn grid(&self) -> GridSpec {
        self.grid
    }

    pub(crate) fn check(&self, key: &RasterKey, grid: &GridSpec) -> Result<(), OpError> {
        if *grid == self.grid {
            Ok(())
        } else {
            Err(OpError::GridMismatch {
                key: key.clone(),
                reference: self.key.clone(),
            })
        }
    }

    /// Read a float input and check its grid.
    pub(crate) fn float(
        &self,
        ctx: &OpContext<'_>,
        key: &RasterKey,
    ) -> Result<Arc<Raster<f32>>, OpError> {
        let raster = ctx.float(key)?;
        self.check(key, raster.grid())?;
        Ok(raster)
    }

    /// Read a byte input and check its grid.
    pub(crate) fn byte(
        &self,
        ctx: &OpContext<'_>,
        key: &RasterKey,
    ) -> Result<Arc<Raster<u8>>, OpError> {
        let raster = ctx.byte(key)?;
        self.check(key, raster.grid())?;
        Ok(raster)
    }
}

/// Fresh all-nodata float output on `grid`.
pub(crate) fn float_output(grid: GridSpec) -> Raster<f32> {
    Raster::nodata_filled(grid)
}

/// Feed spatially explicit criteria into an operation fingerprint.
pub(crate) fn write_spatial(fp: &mut Fingerprint, spatial: &[SpatialCriterion]) {
    fp.write_u64(spatial.len() as u64);
    for c in spatial {
        fp.write_key(&c.raster).write_f64(c.dq).write_f64(c.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reports_both_keys() {
        let a = GridSpec::new(2, 2, 1.0).unwrap();
        let b = GridSpec::new(2, 3, 1.0).unwrap();
        let guard = GridGuard::new(&"hab".into(), &a);
        assert!(guard.check(&"dist".into(), &a).is_ok());
        assert_eq!(
            guard.check(&"dist".into(), &b).unwrap_err(),
            OpError::GridMismatch {
                key: "dist".into(),
                reference: "hab".into(),
            }
        );
    }

    #[test]
    fn pixel_size_is_part_of_the_grid() {
        let a = GridSpec::new(2, 2, 1.0).unwrap();
        let b = GridSpec::new(2, 2, 2.0).unwrap();
        assert!(GridGuard::new(&"a".into(), &a).check(&"b".into(), &b).is_err());
    }
}
