//! Raster operations for habitat risk assessment.
//!
//! Provides the scalar risk arithmetic ([`decay`], [`pair_risk`],
//! [`reclassify`], ...) and one [`RasterOp`](hra_task::RasterOp) per
//! pipeline stage, in the order an assessment runs them:
//!
//! 1. [`RasterizeOp`], [`AlignOp`]: inputs onto one grid
//! 2. [`DistanceTransformOp`], [`EcosystemCountOp`], [`StressorOverlapOp`],
//!    [`MaxRiskScoreOp`]
//! 3. [`RecoveryNumeratorOp`], [`RecoveryOp`]
//! 4. [`PairNumeratorOp`], [`PairScoreOp`], [`PairRiskOp`]
//! 5. [`TotalScoreOp`], [`TotalRiskOp`], [`ReclassifyRiskOp`]
//! 6. [`EcosystemRiskOp`], [`ZonalMeanOp`]

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod criteria_score;
pub mod decay;
pub mod ecosystem;
pub mod geo_ops;
pub(crate) mod grid_helpers;
pub mod recovery;
pub mod risk;
pub mod risk_ops;

pub use criteria_score::{
    PairNumeratorOp, PairNumeratorOpBuilder, PairScoreOp, PairScoreOpBuilder, TotalScoreOp,
};
pub use decay::decay;
pub use ecosystem::{EcosystemCountOp, EcosystemRiskOp, StressorOverlapOp};
pub use geo_ops::{AlignOp, DistanceTransformOp, RasterizeOp, ZonalMeanOp, UNNAMED_ZONE};
pub use recovery::{RecoveryNumeratorOp, RecoveryOp};
pub use risk::{max_risk_score, pair_risk, reclassify, recovery_class, MAX_RISK_CLASS};
pub use risk_ops::{MaxRiskScoreOp, PairRiskOp, ReclassifyRiskOp, TotalRiskOp};
