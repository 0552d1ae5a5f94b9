//! Tabular inputs of a habitat risk assessment.
//!
//! - [`Inventory`]: habitat and stressor layers with their sources and
//!   stressor buffers.
//! - [`CriteriaParser`]: the criteria table grammar, an explicit state
//!   machine producing [`ParsedCriteria`].
//! - [`ScoreTable`]: parsed criteria folded into numerator/denominator
//!   [`ScoreRecord`]s per habitat and per habitat-stressor pair.
//!
//! Everything here runs before any raster is read; every error is a
//! [`CriteriaError`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod inventory;
pub mod parser;
pub mod score;
pub mod table;

pub use error::{CriteriaError, CriterionSite};
pub use inventory::{Inventory, StressorEntry};
pub use parser::{
    parse_criteria, CriteriaKind, CriteriaParser, Criterion, OverlapCriterion, ParsedCriteria,
    ParserState, Rating,
};
pub use score::{contribution, PairScores, ScoreRecord, ScoreTable, SpatialCriterion};
pub use table::{Table, TableRow};
