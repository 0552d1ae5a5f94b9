//! Raster operation trait, execution context and plans.
//!
//! The [`RasterOp`] trait defines a stateless `&self` unit of raster
//! work with declared inputs and outputs. An [`OpContext`] enforces
//! those declarations at run time; [`validate_plan`] enforces ordering
//! across a whole [`Plan`] before anything runs.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod op;
pub mod plan;

pub use context::OpContext;
pub use op::RasterOp;
pub use plan::{
    validate_plan, OutputConflict, Plan, PlanError, PlanIndex, PlanStep, PlannedTask,
};
