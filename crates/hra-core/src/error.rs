//! Error types shared across the workspace.
//!
//! Organized by subsystem: grid construction, raster construction, the
//! layer store, the geoprocessing collaborator, and individual raster
//! operations. Errors are `Clone` so a scheduler can keep the first task
//! failure and still hand a copy back to every caller of `join()`.

use crate::id::RasterKey;
use crate::store::LayerKind;
use thiserror::Error;

/// Errors from constructing a [`GridSpec`](crate::GridSpec).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridError {
    /// A grid needs at least one row and one column.
    #[error("grid must have at least one row and column, got {rows}x{cols}")]
    Empty {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },
    /// Pixel size must be finite and strictly positive.
    #[error("pixel size must be finite and positive, got {value}")]
    InvalidPixelSize {
        /// The rejected pixel size.
        value: f64,
    },
}

/// Errors from constructing or combining rasters.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RasterError {
    /// The data buffer does not match the grid's cell count.
    #[error("raster buffer has {actual} cells, grid expects {expected}")]
    LengthMismatch {
        /// Cells required by the grid.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },
}

/// Errors from a [`RasterStore`](crate::RasterStore).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StoreError {
    /// No layer is stored under the key.
    #[error("layer '{key}' does not exist")]
    Missing {
        /// The requested key.
        key: RasterKey,
    },
    /// The layer exists but holds a different kind of data.
    #[error("layer '{key}' holds {actual} data, expected {expected}")]
    WrongKind {
        /// The requested key.
        key: RasterKey,
        /// Kind the caller asked for.
        expected: LayerKind,
        /// Kind actually stored.
        actual: LayerKind,
    },
    /// A second write to an already written key.
    #[error("layer '{key}' was already written")]
    AlreadyWritten {
        /// The key written twice.
        key: RasterKey,
    },
}

/// Errors from the [`Geoprocessor`](crate::Geoprocessor) collaborator.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GeoError {
    /// Reading an input or writing an output failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Two inputs that must share a grid do not.
    #[error("grid of '{key}' does not match the target grid")]
    GridMismatch {
        /// The offending layer.
        key: RasterKey,
    },
    /// Inputs and outputs lists have different lengths.
    #[error("{inputs} inputs but {targets} target keys")]
    TargetCountMismatch {
        /// Number of input layers.
        inputs: usize,
        /// Number of output keys.
        targets: usize,
    },
    /// A parameter is outside its valid range.
    #[error("invalid {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// A feature or cell lies outside the target grid.
    #[error("feature {fid} has cell ({row}, {col}) outside the grid")]
    OutOfBounds {
        /// Feature id.
        fid: u32,
        /// Row of the offending cell.
        row: usize,
        /// Column of the offending cell.
        col: usize,
    },
    /// The operation needs an attribute the feature lacks.
    #[error("feature {fid} has no rating attribute")]
    MissingAttribute {
        /// Feature id.
        fid: u32,
    },
    /// Building a raster failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Errors returned by a raster operation's `run()`.
///
/// The scheduler wraps these together with the failing task's name.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum OpError {
    /// The operation's computation failed.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The operation touched a key it did not declare.
    #[error("key '{key}' was not declared as {access}")]
    Undeclared {
        /// The key accessed.
        key: RasterKey,
        /// `"an input"` or `"an output"`.
        access: &'static str,
    },
    /// Inputs that must share a grid do not.
    #[error("grid of '{key}' does not match '{reference}'")]
    GridMismatch {
        /// The mismatching layer.
        key: RasterKey,
        /// The layer whose grid was taken as reference.
        reference: RasterKey,
    },
    /// A store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A collaborator call failed.
    #[error(transparent)]
    Geo(#[from] GeoError),
}
