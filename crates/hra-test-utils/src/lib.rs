//! Test utilities and fixtures for habitat risk assessment development.
//!
//! Provides raster constructors, a table-literal reader, a
//! [`NullGeoprocessor`] for tests that never touch geoprocessing,
//! [`run_op`] to execute a single operation against a store, and a
//! [`Scenario`] builder for end-to-end assessments.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod scenario;

pub use fixtures::{ConstOp, CopyOp, FailingOp};
pub use scenario::Scenario;

use hra_core::{
    BoundingPolicy, BurnMode, GeoError, Geoprocessor, GridSpec, Raster, RasterKey, RasterStore,
    Resample, VectorLayer, ZonalStats, BYTE_NODATA, FLOAT_NODATA,
};
use hra_criteria::Table;
use hra_task::{OpContext, RasterOp};
use indexmap::IndexMap;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A `rows x cols` grid with unit pixels.
pub fn grid(rows: usize, cols: usize) -> GridSpec {
    GridSpec::new(rows, cols, 1.0).expect("test grid dimensions must be non-zero")
}

/// Presence raster: 1 at `cells`, 0 elsewhere, nodata 255.
pub fn presence(rows: usize, cols: usize, cells: &[(usize, usize)]) -> Raster<u8> {
    let mut r = Raster::filled(grid(rows, cols), 0u8, Some(BYTE_NODATA));
    for &(row, col) in cells {
        assert!(r.set(row, col, 1), "cell ({row}, {col}) outside {rows}x{cols}");
    }
    r
}

/// Byte raster from row-major values, nodata 255.
pub fn byte_raster(rows: usize, cols: usize, values: &[u8]) -> Raster<u8> {
    Raster::from_vec(grid(rows, cols), values.to_vec(), Some(BYTE_NODATA))
        .expect("value count must match the grid")
}

/// Float raster from row-major values, nodata [`FLOAT_NODATA`].
pub fn float_raster(rows: usize, cols: usize, values: &[f32]) -> Raster<f32> {
    Raster::from_vec(grid(rows, cols), values.to_vec(), Some(FLOAT_NODATA))
        .expect("value count must match the grid")
}

/// Seeded random presence mask with roughly `density` of cells present.
pub fn random_presence(seed: u64, grid: GridSpec, density: f64) -> Raster<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..grid.cell_count())
        .map(|_| u8::from(unit(&mut rng) < density))
        .collect();
    Raster::from_vec(grid, data, Some(BYTE_NODATA)).expect("length follows the grid")
}

/// Seeded random float raster with values in `[lo, hi)`.
pub fn random_float(seed: u64, grid: GridSpec, lo: f32, hi: f32) -> Raster<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..grid.cell_count())
        .map(|_| lo + (hi - lo) * unit(&mut rng) as f32)
        .collect();
    Raster::from_vec(grid, data, Some(FLOAT_NODATA)).expect("length follows the grid")
}

fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Read a comma-separated literal into a [`Table`].
pub fn table(text: &str) -> Table {
    Table::from_rows(text.lines().map(|l| l.split(',')))
}

/// Run one operation with a context built from its own declarations.
pub fn run_op(
    store: &dyn RasterStore,
    geo: &dyn Geoprocessor,
    op: &dyn RasterOp,
) -> Result<(), hra_core::OpError> {
    let mut ctx = OpContext::new(store, geo, op.reads(), op.writes());
    op.run(&mut ctx)
}

/// A [`Geoprocessor`] that rejects every call.
///
/// For tests of operations that only combine rasters already in the store.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullGeoprocessor;

fn unavailable() -> GeoError {
    GeoError::InvalidParameter {
        name: "geoprocessor",
        reason: "NullGeoprocessor performs no geoprocessing".to_string(),
    }
}

impl Geoprocessor for NullGeoprocessor {
    fn align_and_resize(
        &self,
        _store: &dyn RasterStore,
        _base: &[RasterKey],
        _targets: &[RasterKey],
        _resample: Resample,
        _pixel_size: f64,
        _bounding: BoundingPolicy,
        _target_projection: Option<&str>,
    ) -> Result<(), GeoError> {
        Err(unavailable())
    }

    fn distance_transform(
        &self,
        _store: &dyn RasterStore,
        _raster: &RasterKey,
        _target: &RasterKey,
        _sampling_distance: f64,
    ) -> Result<(), GeoError> {
        Err(unavailable())
    }

    fn rasterize(
        &self,
        _store: &dyn RasterStore,
        _vector: &VectorLayer,
        _target: &RasterKey,
        _burn: BurnMode,
    ) -> Result<(), GeoError> {
        Err(unavailable())
    }

    fn zonal_statistics(
        &self,
        _store: &dyn RasterStore,
        _raster: &RasterKey,
        _zones: &VectorLayer,
    ) -> Result<IndexMap<u32, ZonalStats>, GeoError> {
        Err(unavailable())
    }

    fn polygonize(
        &self,
        _store: &dyn RasterStore,
        _raster: &RasterKey,
    ) -> Result<VectorLayer, GeoError> {
        Err(unavailable())
    }
}
