//! Collaborator traits: layer storage and geoprocessing.

use crate::error::{GeoError, StoreError};
use crate::id::RasterKey;
use crate::raster::Raster;
use crate::store::{Layer, LayerKind};
use crate::vector::{BurnMode, VectorLayer, ZonalStats, ZoneMeans};
use indexmap::IndexMap;
use std::sync::Arc;

/// Keyed storage for every intermediate and final layer of a run.
///
/// Implementations must be safe to share across worker threads. A key is
/// written at most once until it is removed; `put` on an existing key
/// returns `Err(StoreError::AlreadyWritten)`.
///
/// Alongside each layer the store keeps the fingerprint of the task that
/// produced it, so a later run can tell an up-to-date output from a
/// stale one.
pub trait RasterStore: Send + Sync {
    /// The layer stored under `key`, if any.
    fn get(&self, key: &RasterKey) -> Option<Layer>;

    /// Store `layer` under `key`.
    fn put(&self, key: RasterKey, layer: Layer) -> Result<(), StoreError>;

    /// Remove `key` and its fingerprint, returning the layer if present.
    fn remove(&self, key: &RasterKey) -> Option<Layer>;

    /// Fingerprint recorded for `key`, if any.
    fn fingerprint(&self, key: &RasterKey) -> Option<u64>;

    /// Record the fingerprint of the task that wrote `key`.
    ///
    /// Ignored when `key` holds no layer.
    fn record_fingerprint(&self, key: &RasterKey, fingerprint: u64);

    /// True if `key` has been written.
    fn contains(&self, key: &RasterKey) -> bool {
        self.get(key).is_some()
    }

    /// Every stored key.
    fn keys(&self) -> Vec<RasterKey>;

    /// Fetch a float raster.
    fn float(&self, key: &RasterKey) -> Result<Arc<Raster<f32>>, StoreError> {
        match self.get(key) {
            Some(Layer::Float(r)) => Ok(r),
            Some(other) => Err(StoreError::WrongKind {
                key: key.clone(),
                expected: LayerKind::Float,
                actual: other.kind(),
            }),
            None => Err(StoreError::Missing { key: key.clone() }),
        }
    }

    /// Fetch a byte raster.
    fn byte(&self, key: &RasterKey) -> Result<Arc<Raster<u8>>, StoreError> {
        match self.get(key) {
            Some(Layer::Byte(r)) => Ok(r),
            Some(other) => Err(StoreError::WrongKind {
                key: key.clone(),
                expected: LayerKind::Byte,
                actual: other.kind(),
            }),
            None => Err(StoreError::Missing { key: key.clone() }),
        }
    }

    /// Fetch a zonal statistics table.
    fn stats(&self, key: &RasterKey) -> Result<Arc<ZoneMeans>, StoreError> {
        match self.get(key) {
            Some(Layer::Stats(m)) => Ok(m),
            Some(other) => Err(StoreError::WrongKind {
                key: key.clone(),
                expected: LayerKind::Stats,
                actual: other.kind(),
            }),
            None => Err(StoreError::Missing { key: key.clone() }),
        }
    }
}

/// Resampling method for [`Geoprocessor::align_and_resize`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resample {
    /// Take the value of the source cell containing the target cell centre.
    #[default]
    Nearest,
}

/// Extent of the aligned output grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundingPolicy {
    /// Smallest grid covering every input.
    #[default]
    Union,
    /// Largest grid covered by every input.
    Intersection,
}

/// Geospatial operations the assessment delegates to a raster/vector
/// processing library.
///
/// Every method reads its inputs from and writes its outputs to the
/// supplied store, mirroring a path-based raster API. Implementations
/// must preserve the nodata conventions of [`crate::raster`].
pub trait Geoprocessor: Send + Sync {
    /// Resample every `base` layer onto one shared grid with pixel side
    /// `pixel_size` and store the results under the matching `targets`.
    #[allow(clippy::too_many_arguments)]
    fn align_and_resize(
        &self,
        store: &dyn RasterStore,
        base: &[RasterKey],
        targets: &[RasterKey],
        resample: Resample,
        pixel_size: f64,
        bounding: BoundingPolicy,
        target_projection: Option<&str>,
    ) -> Result<(), GeoError>;

    /// Euclidean distance, in projection units, from every pixel to the
    /// nearest pixel of `raster` whose value is 1. `sampling_distance` is
    /// the pixel side length in projection units.
    fn distance_transform(
        &self,
        store: &dyn RasterStore,
        raster: &RasterKey,
        target: &RasterKey,
        sampling_distance: f64,
    ) -> Result<(), GeoError>;

    /// Burn `vector` into a new raster stored under `target`.
    fn rasterize(
        &self,
        store: &dyn RasterStore,
        vector: &VectorLayer,
        target: &RasterKey,
        burn: BurnMode,
    ) -> Result<(), GeoError>;

    /// Count and sum of the valid pixels of `raster` under each zone
    /// feature, keyed by feature id.
    fn zonal_statistics(
        &self,
        store: &dyn RasterStore,
        raster: &RasterKey,
        zones: &VectorLayer,
    ) -> Result<IndexMap<u32, ZonalStats>, GeoError>;

    /// One feature per distinct valid value of a classified raster,
    /// with the value carried in the `rating` attribute.
    fn polygonize(&self, store: &dyn RasterStore, raster: &RasterKey)
        -> Result<VectorLayer, GeoError>;
}
