//! HRA: habitat risk assessment over raster layers.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all HRA sub-crates. For most users, adding `hra` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use hra::prelude::*;
//!
//! // One habitat covering a 3x3 grid, one stressor on the centre cell.
//! let grid = GridSpec::new(3, 3, 1.0).unwrap();
//! let store = Arc::new(MemoryStore::new());
//! store
//!     .put("seagrass.tif".into(), Raster::<u8>::filled(grid, 1, Some(255)).into())
//!     .unwrap();
//! let mut shipping = Raster::<u8>::filled(grid, 0, Some(255));
//! shipping.set(1, 1, 1);
//! store.put("shipping.tif".into(), shipping.into()).unwrap();
//!
//! let criteria = Table::from_rows([
//!     vec!["HABITAT NAME", "seagrass", "", "", "CRITERIA TYPE"],
//!     vec!["HABITAT RESILIENCE ATTRIBUTES", "Rating", "DQ", "Weight", "E/C"],
//!     vec!["recruitment", "3", "1", "1", "C"],
//!     vec!["HABITAT STRESSOR OVERLAP PROPERTIES", "", "", "", ""],
//!     vec!["shipping", "Rating", "DQ", "Weight", "E/C"],
//!     vec!["intensity", "2", "1", "1", "E"],
//!     vec!["damage", "3", "1", "1", "C"],
//! ]);
//! let inputs = AssessmentInputs {
//!     inventory: Inventory::new()
//!         .with_habitat("seagrass", "seagrass.tif")
//!         .with_stressor("shipping", "shipping.tif", 0.0),
//!     criteria,
//!     ..AssessmentInputs::default()
//! };
//! let config = RunConfig {
//!     risk_equation: RiskEquation::Multiplicative,
//!     ..RunConfig::default()
//! };
//!
//! let assessment = Assessment::prepare(inputs, config).unwrap();
//! let outputs = assessment
//!     .run(store.clone(), Arc::new(GridGeoprocessor::new()))
//!     .unwrap();
//! assert_eq!(outputs.max_risk_score, 9.0);
//! let risk = store.float(&outputs.habitat_risk["seagrass"]).unwrap();
//! assert_eq!(risk.get(1, 1), Some(2.0));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `hra-core` | Grids, rasters, vectors, store and geoprocessor traits |
//! | [`geo`] | `hra-geo` | In-memory geoprocessor |
//! | [`criteria`] | `hra-criteria` | Inventory, criteria table parsing, score accumulation |
//! | [`task`] | `hra-task` | Raster operation trait, plans and plan validation |
//! | [`ops`] | `hra-ops` | Decay, risk arithmetic and every pipeline operation |
//! | [`engine`] | `hra-engine` | Run configuration, task graph and orchestration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`hra-core`).
///
/// Contains [`types::GridSpec`], [`types::Raster`], the
/// [`types::RasterStore`] and [`types::Geoprocessor`] seams, and the
/// shared error types.
pub use hra_core as types;

/// In-memory geoprocessing (`hra-geo`).
pub use hra_geo as geo;

/// Criteria tables and scores (`hra-criteria`).
///
/// [`criteria::parse_criteria`] reads a ratings table against an
/// [`criteria::Inventory`]; [`criteria::ScoreTable`] folds the result
/// into numerators and denominators.
pub use hra_criteria as criteria;

/// Raster operations and plans (`hra-task`).
///
/// The [`task::RasterOp`] trait is the extension point for custom
/// pipeline stages.
pub use hra_task as task;

/// Pipeline operations (`hra-ops`).
pub use hra_ops as ops;

/// Orchestration and scheduling (`hra-engine`).
///
/// [`engine::Assessment`] for whole runs, [`engine::TaskGraph`] for
/// running arbitrary operations on a worker pool.
pub use hra_engine as engine;

/// Common imports for typical HRA usage.
///
/// ```rust
/// use hra::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use hra_core::{
        BurnMode, DecayEquation, Feature, Geoprocessor, GridSpec, MemoryStore, Raster, RasterKey,
        RasterStore, RiskEquation, VectorLayer,
    };

    // Errors
    pub use hra_core::{GeoError, OpError, StoreError};
    pub use hra_criteria::CriteriaError;

    // Geoprocessing
    pub use hra_geo::GridGeoprocessor;

    // Criteria
    pub use hra_criteria::{Inventory, Table};

    // Operations
    pub use hra_task::{OpContext, Plan, RasterOp};

    // Engine
    pub use hra_engine::{
        Assessment, AssessmentInputs, RunConfig, RunError, RunOutputs, SchedulePolicy,
        TaskGraph, WorkerConfig,
    };
}
