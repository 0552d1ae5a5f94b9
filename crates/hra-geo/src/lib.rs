//! In-memory reference geoprocessing for habitat risk assessment.
//!
//! This crate provides [`GridGeoprocessor`], an implementation of the
//! [`hra_core::Geoprocessor`] collaborator trait that works entirely on
//! in-memory rasters. It lets the engine run end to end without a
//! GIS library; a GDAL-backed processor plugs into the same trait.
//!
//! # Algorithms
//!
//! - [`edt`]: exact Euclidean distance transform (separable lower-envelope)
//! - [`align`]: nearest-neighbour resampling onto a shared grid
//! - [`burn`]: rasterize features and polygonize classified rasters
//! - [`zonal`]: per-zone count and sum of valid pixels
//!
//! All layers share a top-left origin; alignment only reconciles pixel
//! size and extent. Reprojection is not supported.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod align;
pub mod burn;
pub mod edt;
pub mod processor;
pub mod zonal;

pub use processor::GridGeoprocessor;
