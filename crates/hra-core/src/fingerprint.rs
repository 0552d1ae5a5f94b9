//! Fingerprints for deciding whether a stored layer is up to date.
//!
//! Uses 64-bit FNV-1a. A fingerprint is a fast equality check between
//! two runs of the same task, not a cryptographic digest.

use crate::grid::GridSpec;
use crate::id::RasterKey;
use crate::raster::{Pixel, Raster};
use crate::store::Layer;
use crate::vector::VectorLayer;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Incremental FNV-1a hash state.
///
/// Variable-length values are length-prefixed, so `("ab", "c")` and
/// `("a", "bc")` fingerprint differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint(u64);

impl Default for Fingerprint {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Fingerprint {
    /// A fresh hash state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current hash value.
    pub fn finish(&self) -> u64 {
        self.0
    }

    /// Feed raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.0 = (self.0 ^ u64::from(b)).wrapping_mul(FNV_PRIME);
        }
        self
    }

    /// Feed a `u64` as 8 little-endian bytes.
    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Feed an `f64` by its bit pattern.
    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.write_u64(v.to_bits())
    }

    /// Feed a length-prefixed string.
    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write_u64(s.len() as u64).write_bytes(s.as_bytes())
    }

    /// Feed a layer key.
    pub fn write_key(&mut self, key: &RasterKey) -> &mut Self {
        self.write_str(key.as_str())
    }

    /// Feed a grid's dimensions and pixel size.
    pub fn write_grid(&mut self, grid: &GridSpec) -> &mut Self {
        self.write_u64(grid.rows() as u64)
            .write_u64(grid.cols() as u64)
            .write_f64(grid.pixel_size())
    }

    /// Feed a raster's grid, nodata value and every cell.
    pub fn write_raster<T: Pixel>(&mut self, raster: &Raster<T>) -> &mut Self {
        self.write_grid(raster.grid());
        match raster.nodata() {
            Some(n) => self.write_u64(1).write_f64(n.to_f64()),
            None => self.write_u64(0),
        };
        for &v in raster.data() {
            self.write_f64(v.to_f64());
        }
        self
    }

    /// Feed a vector layer's frame and every feature.
    pub fn write_vector(&mut self, layer: &VectorLayer) -> &mut Self {
        self.write_grid(layer.grid())
            .write_u64(layer.features().len() as u64);
        for f in layer.features() {
            self.write_u64(u64::from(f.fid));
            match &f.name {
                Some(name) => self.write_u64(1).write_str(name),
                None => self.write_u64(0),
            };
            match f.rating {
                Some(r) => self.write_u64(1).write_f64(r),
                None => self.write_u64(0),
            };
            self.write_u64(f.cells.len() as u64);
            for &(r, c) in &f.cells {
                self.write_u64(r as u64).write_u64(c as u64);
            }
        }
        self
    }

    /// Feed a stored layer's content.
    pub fn write_layer(&mut self, layer: &Layer) -> &mut Self {
        match layer {
            Layer::Float(r) => self.write_u64(0).write_raster(r.as_ref()),
            Layer::Byte(r) => self.write_u64(1).write_raster(r.as_ref()),
            Layer::Stats(means) => {
                self.write_u64(2).write_u64(means.len() as u64);
                for (zone, mean) in means.iter() {
                    self.write_str(zone).write_f64(*mean);
                }
                self
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Feature;

    fn grid() -> GridSpec {
        GridSpec::new(1, 2, 1.0).unwrap()
    }

    #[test]
    fn empty_state_is_the_offset_basis() {
        assert_eq!(Fingerprint::new().finish(), FNV_OFFSET);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut a = Fingerprint::new();
        a.write_str("ab").write_str("c");
        let mut b = Fingerprint::new();
        b.write_str("a").write_str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn raster_content_and_nodata_matter() {
        let hash = |r: &Raster<f32>| Fingerprint::new().write_raster(r).finish();
        let a = Raster::<f32>::filled(grid(), 1.0, None);
        let b = Raster::<f32>::filled(grid(), 2.0, None);
        let c = Raster::<f32>::filled(grid(), 1.0, Some(0.0));
        assert_eq!(hash(&a), hash(&a.clone()));
        assert_ne!(hash(&a), hash(&b));
        assert_ne!(hash(&a), hash(&c));
    }

    #[test]
    fn layer_kind_matters() {
        let float: Layer = Raster::<f32>::filled(grid(), 1.0, None).into();
        let byte: Layer = Raster::<u8>::filled(grid(), 1, None).into();
        assert_ne!(
            Fingerprint::new().write_layer(&float).finish(),
            Fingerprint::new().write_layer(&byte).finish()
        );
    }

    #[test]
    fn vector_attributes_matter() {
        let hash = |l: &VectorLayer| Fingerprint::new().write_vector(l).finish();
        let plain = VectorLayer::new(grid(), vec![Feature::new(0, vec![(0, 0)])]);
        let rated = VectorLayer::new(grid(), vec![Feature::new(0, vec![(0, 0)]).with_rating(2.0)]);
        let moved = VectorLayer::new(grid(), vec![Feature::new(0, vec![(0, 1)])]);
        assert_ne!(hash(&plain), hash(&rated));
        assert_ne!(hash(&plain), hash(&moved));
    }
}
