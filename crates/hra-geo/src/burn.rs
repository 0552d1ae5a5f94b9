//! Rasterizing features and polygonizing classified rasters.

use hra_core::{
    BurnMode, Feature, GeoError, GridSpec, Pixel, Raster, VectorLayer, BYTE_NODATA, FLOAT_NODATA,
};

/// Burn every feature cell of `vector` into a byte presence raster:
/// 1 inside a feature, 0 elsewhere.
pub fn burn_presence(vector: &VectorLayer) -> Result<Raster<u8>, GeoError> {
    let mut out = Raster::filled(*vector.grid(), 0u8, Some(BYTE_NODATA));
    for feature in vector.features() {
        burn_feature(&mut out, feature, 1)?;
    }
    Ok(out)
}

/// Burn each feature's `rating` attribute into a float raster, 0
/// elsewhere. Later features overwrite earlier ones where they overlap.
pub fn burn_attribute(vector: &VectorLayer) -> Result<Raster<f32>, GeoError> {
    let mut out = Raster::filled(*vector.grid(), 0.0f32, Some(FLOAT_NODATA));
    for feature in vector.features() {
        let rating = feature
            .rating
            .ok_or(GeoError::MissingAttribute { fid: feature.fid })?;
        burn_feature(&mut out, feature, rating as f32)?;
    }
    Ok(out)
}

/// Rasterize with the given burn mode.
pub(crate) fn burn(vector: &VectorLayer, mode: BurnMode) -> Result<hra_core::Layer, GeoError> {
    Ok(match mode {
        BurnMode::Presence => burn_presence(vector)?.into(),
        BurnMode::Attribute => burn_attribute(vector)?.into(),
    })
}

fn burn_feature<T: Pixel>(out: &mut Raster<T>, feature: &Feature, value: T) -> Result<(), GeoError> {
    for &(row, col) in &feature.cells {
        if !out.set(row, col, value) {
            return Err(GeoError::OutOfBounds {
                fid: feature.fid,
                row,
                col,
            });
        }
    }
    Ok(())
}

/// One feature per distinct valid value of `raster`, in order of first
/// appearance; the value is carried in the feature's `rating`.
pub fn polygonize<T: Pixel>(raster: &Raster<T>) -> VectorLayer {
    let grid: GridSpec = *raster.grid();
    let mut features: Vec<(T, Feature)> = Vec::new();
    for (i, &v) in raster.data().iter().enumerate() {
        if !raster.is_valid(v) {
            continue;
        }
        let cell = grid.coords(i);
        match features.iter_mut().find(|(value, _)| *value == v) {
            Some((_, feature)) => feature.cells.push(cell),
            None => {
                let fid = features.len() as u32;
                let feature = Feature::new(fid, vec![cell]).with_rating(v.to_f64());
                features.push((v, feature));
            }
        }
    }
    VectorLayer::new(grid, features.into_iter().map(|(_, f)| f).collect())
}
