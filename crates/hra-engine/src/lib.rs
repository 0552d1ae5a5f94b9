//! Assessment engine for habitat risk assessment.
//!
//! [`Assessment`] turns validated criteria and layer sources into a
//! static task [`Plan`](hra_task::Plan) and executes it on a
//! [`TaskGraph`], a dependency-driven worker pool. [`RunConfig`] carries
//! every run parameter and loads from TOML.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod layout;
pub mod orchestrator;
pub mod scheduler;
pub mod stats;
pub(crate) mod worker;

pub use config::{ConfigError, RunConfig, SchedulePolicy, WorkerConfig, MAX_WORKERS};
pub use layout::KeyLayout;
pub use orchestrator::{Assessment, AssessmentInputs, RunError, RunOutputs};
pub use scheduler::{ScheduleError, TaskGraph, TaskId, TaskState};
pub use stats::{CriteriaStats, PairStats, StatsRow};
