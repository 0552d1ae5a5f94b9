//! Nearest-neighbour alignment of rasters onto one shared grid.

use hra_core::{BoundingPolicy, GeoError, GridSpec, Pixel, Raster};

/// The grid every input is resampled onto.
///
/// Inputs share a top-left origin. The target extent is the union or
/// intersection of the input extents, tiled with `pixel_size` cells.
pub fn target_grid(
    inputs: &[GridSpec],
    pixel_size: f64,
    bounding: BoundingPolicy,
) -> Result<GridSpec, GeoError> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(GeoError::InvalidParameter {
            name: "pixel_size",
            reason: format!("must be finite and positive, got {pixel_size}"),
        });
    }
    let mut extents = inputs.iter().map(GridSpec::extent);
    let first = extents.next().ok_or_else(|| GeoError::InvalidParameter {
        name: "base",
        reason: "no rasters to align".into(),
    })?;
    let (height, width) = extents.fold(first, |(h, w), (eh, ew)| match bounding {
        BoundingPolicy::Union => (h.max(eh), w.max(ew)),
        BoundingPolicy::Intersection => (h.min(eh), w.min(ew)),
    });
    let rows = (height / pixel_size - 1e-9).ceil().max(1.0) as usize;
    let cols = (width / pixel_size - 1e-9).ceil().max(1.0) as usize;
    GridSpec::new(rows, cols, pixel_size).map_err(|e| GeoError::InvalidParameter {
        name: "pixel_size",
        reason: e.to_string(),
    })
}

/// Resample `src` onto `target` taking, for each target cell, the source
/// cell containing its centre. Target cells beyond the source extent are
/// nodata.
pub fn resample_nearest<T: Pixel>(src: &Raster<T>, target: GridSpec) -> Raster<T> {
    let nodata = src.nodata().unwrap_or(T::NODATA);
    let mut out = Raster::filled(target, nodata, Some(nodata));
    let ratio = target.pixel_size() / src.grid().pixel_size();
    let sample = |i: usize| -> usize { ((i as f64 + 0.5) * ratio).floor() as usize };
    for r in 0..target.rows() {
        let sr = sample(r);
        if sr >= src.grid().rows() {
            continue;
        }
        for c in 0..target.cols() {
            let sc = sample(c);
            if let Some(v) = src.get(sr, sc) {
                out.set(r, c, v);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hra_core::BYTE_NODATA;

    fn grid(rows: usize, cols: usize, px: f64) -> GridSpec {
        GridSpec::new(rows, cols, px).unwrap()
    }

    #[test]
    fn union_and_intersection_extents() {
        let inputs = [grid(2, 4, 1.0), grid(3, 2, 1.0)];
        let u = target_grid(&inputs, 1.0, BoundingPolicy::Union).unwrap();
        assert_eq!((u.rows(), u.cols()), (3, 4));
        let i = target_grid(&inputs, 1.0, BoundingPolicy::Intersection).unwrap();
        assert_eq!((i.rows(), i.cols()), (2, 2));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(target_grid(&[], 1.0, BoundingPolicy::Union).is_err());
    }

    #[test]
    fn identity_resample_is_a_copy() {
        let src = Raster::from_vec(grid(2, 2, 1.0), vec![1u8, 0, 0, 1], Some(BYTE_NODATA)).unwrap();
        let out = resample_nearest(&src, *src.grid());
        assert_eq!(out.data(), src.data());
    }

    #[test]
    fn upsample_and_pad() {
        let src = Raster::from_vec(grid(1, 2, 2.0), vec![1u8, 0], Some(BYTE_NODATA)).unwrap();
        let out = resample_nearest(&src, grid(3, 4, 1.0));
        assert_eq!(
            out.data(),
            &[1, 1, 0, 0, 1, 1, 0, 0, BYTE_NODATA, BYTE_NODATA, BYTE_NODATA, BYTE_NODATA]
        );
    }
}
