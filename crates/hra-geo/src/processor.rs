//! [`GridGeoprocessor`]: the store-facing wrapper around this crate's
//! algorithms.

use crate::{align, burn, edt, zonal};
use hra_core::{
    BoundingPolicy, BurnMode, GeoError, Geoprocessor, Layer, RasterKey, RasterStore, Resample,
    StoreError, VectorLayer, ZonalStats,
};
use indexmap::IndexMap;
use tracing::debug;

/// In-memory [`Geoprocessor`] over rasters sharing a top-left origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridGeoprocessor;

impl GridGeoprocessor {
    /// Create a processor.
    pub fn new() -> Self {
        Self
    }
}

fn missing(key: &RasterKey) -> GeoError {
    GeoError::Store(StoreError::Missing { key: key.clone() })
}

fn not_a_raster(key: &RasterKey) -> GeoError {
    GeoError::InvalidParameter {
        name: "raster",
        reason: format!("'{key}' is not a raster layer"),
    }
}

impl Geoprocessor for GridGeoprocessor {
    fn align_and_resize(
        &self,
        store: &dyn RasterStore,
        base: &[RasterKey],
        targets: &[RasterKey],
        resample: Resample,
        pixel_size: f64,
        bounding: BoundingPolicy,
        target_projection: Option<&str>,
    ) -> Result<(), GeoError> {
        if base.len() != targets.len() {
            return Err(GeoError::TargetCountMismatch {
                inputs: base.len(),
                targets: targets.len(),
            });
        }
        if let Some(projection) = target_projection {
            return Err(GeoError::InvalidParameter {
                name: "target_projection",
                reason: format!("cannot reproject to '{projection}' in memory"),
            });
        }
        let Resample::Nearest = resample;

        let layers = base
            .iter()
            .map(|key| store.get(key).ok_or_else(|| missing(key)))
            .collect::<Result<Vec<_>, _>>()?;
        let grids = base
            .iter()
            .zip(&layers)
            .map(|(key, layer)| layer.grid().copied().ok_or_else(|| not_a_raster(key)))
            .collect::<Result<Vec<_>, _>>()?;
        let grid = align::target_grid(&grids, pixel_size, bounding)?;
        debug!(
            rows = grid.rows(),
            cols = grid.cols(),
            pixel_size,
            layers = base.len(),
            "aligning rasters"
        );

        for (layer, target) in layers.iter().zip(targets) {
            let aligned: Layer = match layer {
                Layer::Float(r) => align::resample_nearest(r, grid).into(),
                Layer::Byte(r) => align::resample_nearest(r, grid).into(),
                Layer::Stats(_) => return Err(not_a_raster(target)),
            };
            store.put(target.clone(), aligned)?;
        }
        Ok(())
    }

    fn distance_transform(
        &self,
        store: &dyn RasterStore,
        raster: &RasterKey,
        target: &RasterKey,
        sampling_distance: f64,
    ) -> Result<(), GeoError> {
        if !sampling_distance.is_finite() || sampling_distance <= 0.0 {
            return Err(GeoError::InvalidParameter {
                name: "sampling_distance",
                reason: format!("must be finite and positive, got {sampling_distance}"),
            });
        }
        let mask = store.byte(raster)?;
        let dist = edt::distance_transform(&mask, sampling_distance);
        store.put(target.clone(), dist.into())?;
        Ok(())
    }

    fn rasterize(
        &self,
        store: &dyn RasterStore,
        vector: &VectorLayer,
        target: &RasterKey,
        burn: BurnMode,
    ) -> Result<(), GeoError> {
        let layer = burn::burn(vector, burn)?;
        store.put(target.clone(), layer)?;
        Ok(())
    }

    fn zonal_statistics(
        &self,
        store: &dyn RasterStore,
        raster: &RasterKey,
        zones: &VectorLayer,
    ) -> Result<IndexMap<u32, ZonalStats>, GeoError> {
        let layer = store.get(raster).ok_or_else(|| missing(raster))?;
        if layer.grid().map(|g| g.cell_count()) != Some(zones.grid().cell_count()) {
            return Err(GeoError::GridMismatch {
                key: raster.clone(),
            });
        }
        match layer {
            Layer::Float(r) => zonal::zonal_statistics(&r, zones),
            Layer::Byte(r) => zonal::zonal_statistics(&r, zones),
            Layer::Stats(_) => Err(not_a_raster(raster)),
        }
    }

    fn polygonize(
        &self,
        store: &dyn RasterStore,
        raster: &RasterKey,
    ) -> Result<VectorLayer, GeoError> {
        match store.get(raster).ok_or_else(|| missing(raster))? {
            Layer::Float(r) => Ok(burn::polygonize(&r)),
            Layer::Byte(r) => Ok(burn::polygonize(&r)),
            Layer::Stats(_) => Err(not_a_raster(raster)),
        }
    }
}
