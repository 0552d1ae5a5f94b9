//! Vector features expressed in pixel space, and zonal summaries.
//!
//! Geometry handling proper (simplification, reprojection, polygon
//! clipping) belongs to the geoprocessing collaborator. Inside the engine
//! a feature is the set of grid cells it covers plus the attributes the
//! assessment reads: an optional `name` (zones) and an optional `rating`
//! (spatially explicit criteria).

use crate::grid::GridSpec;
use indexmap::IndexMap;

/// One vector feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    /// Feature id, unique within its layer.
    pub fid: u32,
    /// Value of the `name` attribute, if present.
    pub name: Option<String>,
    /// Value of the `rating` attribute, if present.
    pub rating: Option<f64>,
    /// `(row, col)` cells covered by the feature's geometry.
    pub cells: Vec<(usize, usize)>,
}

impl Feature {
    /// A feature covering `cells`, with no attributes.
    pub fn new(fid: u32, cells: Vec<(usize, usize)>) -> Self {
        Self {
            fid,
            name: None,
            rating: None,
            cells,
        }
    }

    /// Set the `name` attribute.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the `rating` attribute.
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// A layer of features sharing one pixel frame.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorLayer {
    grid: GridSpec,
    features: Vec<Feature>,
}

impl VectorLayer {
    /// A layer over `grid` holding `features`.
    pub fn new(grid: GridSpec, features: Vec<Feature>) -> Self {
        Self { grid, features }
    }

    /// The pixel frame feature cells are expressed in.
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// The layer's features.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// True if the layer has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// True if any feature carries a `name` attribute.
    pub fn has_names(&self) -> bool {
        self.features.iter().any(|f| f.name.is_some())
    }
}

/// How [`rasterize`](crate::Geoprocessor::rasterize) burns features.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurnMode {
    /// Byte raster: 1 inside any feature, 0 elsewhere.
    Presence,
    /// Float raster: each feature's `rating` attribute, 0 elsewhere.
    Attribute,
}

/// Count and sum of the valid pixels inside one zone.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ZonalStats {
    /// Number of valid pixels.
    pub count: u64,
    /// Sum of valid pixel values.
    pub sum: f64,
}

impl ZonalStats {
    /// Fold another zone's statistics into this one.
    pub fn merge(&mut self, other: ZonalStats) {
        self.count += other.count;
        self.sum += other.sum;
    }

    /// Mean pixel value, 0 for a zone with no valid pixels.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Mean score per named zone.
pub type ZoneMeans = IndexMap<String, f64>;
