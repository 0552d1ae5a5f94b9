//! Core types and traits for habitat risk assessment.
//!
//! This is the leaf crate of the workspace. It defines the raster and
//! vector data model, nodata conventions, the run-wide equation enums,
//! error types, and the two collaborator traits every other crate is
//! written against: [`RasterStore`] and [`Geoprocessor`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod equation;
pub mod error;
pub mod fingerprint;
pub mod grid;
pub mod id;
pub mod raster;
pub mod store;
pub mod traits;
pub mod vector;

pub use equation::{DecayEquation, RiskEquation, UnknownEquation, EXPONENTIAL_DECAY_CUTOFF};
pub use error::{GeoError, GridError, OpError, RasterError, StoreError};
pub use fingerprint::Fingerprint;
pub use grid::GridSpec;
pub use id::RasterKey;
pub use raster::{Pixel, Raster, BYTE_NODATA, FLOAT_NODATA};
pub use store::{Layer, LayerKind, MemoryStore};
pub use traits::{BoundingPolicy, Geoprocessor, RasterStore, Resample};
pub use vector::{BurnMode, Feature, VectorLayer, ZonalStats, ZoneMeans};
