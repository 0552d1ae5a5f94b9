//! Zonal statistics over feature footprints.

use hra_core::{GeoError, Pixel, Raster, VectorLayer, ZonalStats};
use indexmap::IndexMap;

/// Count and sum of valid `raster` pixels under each feature of `zones`.
///
/// Zones must be expressed in the raster's pixel frame.
pub fn zonal_statistics<T: Pixel>(
    raster: &Raster<T>,
    zones: &VectorLayer,
) -> Result<IndexMap<u32, ZonalStats>, GeoError> {
    let grid = raster.grid();
    let mut out = IndexMap::with_capacity(zones.features().len());
    for feature in zones.features() {
        let mut stats = ZonalStats::default();
        for &(row, col) in &feature.cells {
            let idx = grid.index(row, col).ok_or(GeoError::OutOfBounds {
                fid: feature.fid,
                row,
                col,
            })?;
            if let Some(v) = raster.valid_at(idx) {
                stats.count += 1;
                stats.sum += v.to_f64();
            }
        }
        out.insert(feature.fid, stats);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hra_core::{Feature, GridSpec, FLOAT_NODATA};

    #[test]
    fn skips_nodata_and_counts_valid() {
        let grid = GridSpec::new(1, 4, 1.0).unwrap();
        let r = Raster::from_vec(grid, vec![1.0f32, FLOAT_NODATA, 3.0, 0.0], Some(FLOAT_NODATA))
            .unwrap();
        let zones = VectorLayer::new(
            grid,
            vec![
                Feature::new(0, vec![(0, 0), (0, 1), (0, 2)]),
                Feature::new(1, vec![(0, 3)]),
            ],
        );
        let stats = zonal_statistics(&r, &zones).unwrap();
        assert_eq!(stats[&0], ZonalStats { count: 2, sum: 4.0 });
        assert_eq!(stats[&1], ZonalStats { count: 1, sum: 0.0 });
    }
}
